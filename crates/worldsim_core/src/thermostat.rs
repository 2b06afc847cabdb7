//! PID controller bank monitoring simulation health variables, and a
//! suggested-action table translating out-of-band readings into operator
//! guidance (spec §4.9).
//!
//! Grounded on the teacher's `Metrics`-adjacent tuning knobs (no direct PID
//! analogue in the teacher; adapted from the other example repos' control-
//! loop idioms) kept in the teacher's plain-struct, no-trait-object style.

/// One PID controller over a single measured variable.
#[derive(Clone, Debug)]
pub struct Pid {
  pub setpoint: f32,
  pub kp: f32,
  pub ki: f32,
  pub kd: f32,
  integral: f32,
  previous_error: f32,
}

impl Pid {
  pub fn new(setpoint: f32, kp: f32, ki: f32, kd: f32) -> Self {
    Self {
      setpoint,
      kp,
      ki,
      kd,
      integral: 0.0,
      previous_error: 0.0,
    }
  }

  /// Advances the controller by one sample, returning the correction to
  /// apply to the controlled variable.
  pub fn step(&mut self, measured: f32, dt: f32) -> f32 {
    let error = self.setpoint - measured;
    self.integral += error * dt;
    let derivative = if dt > 0.0 {
      (error - self.previous_error) / dt
    } else {
      0.0
    };
    self.previous_error = error;
    self.kp * error + self.ki * self.integral + self.kd * derivative
  }

  pub fn reset(&mut self) {
    self.integral = 0.0;
    self.previous_error = 0.0;
  }
}

/// Health classification derived from how far a measured variable sits
/// from its controller's setpoint (spec §4.9).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Health {
  Nominal,
  Strained,
  Critical,
}

/// A bank of named PID controllers over the variables the engine monitors
/// (tick time, active chunk count, particle count).
pub struct Thermostat {
  controllers: Vec<(&'static str, Pid)>,
}

impl Thermostat {
  pub fn new() -> Self {
    Self {
      controllers: Vec::new(),
    }
  }

  pub fn register(&mut self, name: &'static str, pid: Pid) {
    self.controllers.push((name, pid));
  }

  pub fn step(&mut self, name: &str, measured: f32, dt: f32) -> Option<f32> {
    self
      .controllers
      .iter_mut()
      .find(|(n, _)| *n == name)
      .map(|(_, pid)| pid.step(measured, dt))
  }

  /// Classifies health from a correction magnitude relative to the
  /// controller's setpoint.
  pub fn classify(&self, name: &str, correction: f32) -> Health {
    let Some((_, pid)) = self.controllers.iter().find(|(n, _)| *n == name) else {
      return Health::Nominal;
    };
    let relative = if pid.setpoint.abs() > 1e-6 {
      (correction / pid.setpoint).abs()
    } else {
      correction.abs()
    };
    if relative < 0.25 {
      Health::Nominal
    } else if relative < 0.75 {
      Health::Strained
    } else {
      Health::Critical
    }
  }

  /// Suggested operator action for a health classification (spec §9
  /// "suggested-action string table").
  pub fn suggested_action(health: Health) -> &'static str {
    match health {
      Health::Nominal => "no action needed",
      Health::Strained => "consider raising tick budget or lowering LOD resolution",
      Health::Critical => "reduce active chunk radius or disable GPU offload",
    }
  }
}

impl Default for Thermostat {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pid_correction_moves_toward_setpoint() {
    let mut pid = Pid::new(10.0, 1.0, 0.0, 0.0);
    let correction = pid.step(5.0, 1.0);
    assert!(correction > 0.0);
  }

  #[test]
  fn reset_clears_integral_and_previous_error() {
    let mut pid = Pid::new(10.0, 1.0, 0.5, 0.0);
    pid.step(5.0, 1.0);
    pid.reset();
    let corr_a = pid.step(5.0, 1.0);
    pid.reset();
    let corr_b = pid.step(5.0, 1.0);
    assert!((corr_a - corr_b).abs() < 1e-6);
  }

  #[test]
  fn classify_reports_critical_for_large_deviation() {
    let mut thermostat = Thermostat::new();
    thermostat.register("tick_ms", Pid::new(16.0, 1.0, 0.0, 0.0));
    let health = thermostat.classify("tick_ms", 14.0);
    assert_eq!(health, Health::Critical);
  }

  #[test]
  fn suggested_action_differs_by_health() {
    assert_ne!(
      Thermostat::suggested_action(Health::Nominal),
      Thermostat::suggested_action(Health::Critical)
    );
  }
}
