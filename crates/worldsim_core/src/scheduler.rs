//! Multi-rate task scheduler: FAST/MEDIUM/SLOW registrations with
//! per-task EMA timing and a per-tick wall-clock budget.
//!
//! Grounded on the teacher's `TaskPool`/system-ordering setup (named,
//! priority-ordered systems run once per frame), generalized to three
//! rate classes run at different tick divisors and a budget that can skip
//! low-priority work rather than running every system every tick.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

const TIMING_WINDOW: usize = 100;

/// How often a task is due to run, expressed as "every N ticks" (spec
/// §4.7).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rate {
  Fast,
  Medium,
  Slow,
}

impl Rate {
  pub fn divisor(self) -> u64 {
    match self {
      Rate::Fast => 1,
      Rate::Medium => 5,
      Rate::Slow => 20,
    }
  }

  fn index(self) -> usize {
    match self {
      Rate::Fast => 0,
      Rate::Medium => 1,
      Rate::Slow => 2,
    }
  }
}

struct Timing {
  ema_ms: f32,
  samples: VecDeque<f32>,
}

impl Timing {
  fn new() -> Self {
    Self {
      ema_ms: 0.0,
      samples: VecDeque::with_capacity(TIMING_WINDOW),
    }
  }

  fn record(&mut self, elapsed_ms: f32) {
    self.ema_ms = if self.ema_ms == 0.0 {
      elapsed_ms
    } else {
      self.ema_ms * 0.9 + elapsed_ms * 0.1
    };
    if self.samples.len() == TIMING_WINDOW {
      self.samples.pop_front();
    }
    self.samples.push_back(elapsed_ms);
  }

  fn percentile(&self, p: f32) -> f32 {
    if self.samples.is_empty() {
      return 0.0;
    }
    let mut sorted: Vec<f32> = self.samples.iter().copied().collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let idx = ((sorted.len() as f32 - 1.0) * p).round() as usize;
    sorted[idx]
  }
}

struct Task {
  name: &'static str,
  rate: Rate,
  priority: i32,
  func: Box<dyn FnMut() + Send>,
  timing: Timing,
}

/// Report of one tick's execution, for metrics and logging.
pub struct TickReport {
  pub ran: Vec<&'static str>,
  pub skipped: Vec<&'static str>,
  pub total_ms: f32,
}

/// Registry of named, rate-classed, priority-ordered tasks run once per
/// tick within a wall-clock budget.
pub struct Scheduler {
  tasks: Vec<Task>,
  tick: u64,
  intervals: [u64; 3],
}

impl Default for Scheduler {
  fn default() -> Self {
    Self::new()
  }
}

impl Scheduler {
  pub fn new() -> Self {
    Self {
      tasks: Vec::new(),
      tick: 0,
      intervals: [Rate::Fast.divisor(), Rate::Medium.divisor(), Rate::Slow.divisor()],
    }
  }

  /// Overrides the tick interval for each rate class (spec §6
  /// `scheduler.{fast,medium,slow}Interval`), replacing `Rate::divisor`'s
  /// built-in defaults.
  pub fn set_intervals(&mut self, fast: u64, medium: u64, slow: u64) {
    self.intervals = [fast.max(1), medium.max(1), slow.max(1)];
  }

  fn interval(&self, rate: Rate) -> u64 {
    self.intervals[rate.index()]
  }

  pub fn register(
    &mut self,
    name: &'static str,
    rate: Rate,
    priority: i32,
    func: impl FnMut() + Send + 'static,
  ) {
    self.tasks.push(Task {
      name,
      rate,
      priority,
      func: Box::new(func),
      timing: Timing::new(),
    });
  }

  /// Runs every task due this tick, in ascending-priority order (lower
  /// runs first; ties broken by registration order, which keeps the run stable and
  /// reproducible), stopping early once `budget_ms` is exhausted. A task
  /// whose own `budget_ms` has already been consumed by earlier tasks is
  /// skipped and logged rather than blocking the tick indefinitely.
  /// A task that panics is caught so one broken system can't take down
  /// the whole engine; its failure is logged and the tick continues.
  pub fn run_tick(&mut self, budget_ms: f32) -> TickReport {
    self.tick += 1;
    let tick = self.tick;

    let mut due: Vec<usize> = self
      .tasks
      .iter()
      .enumerate()
      .filter(|(_, t)| tick % self.interval(t.rate) == 0)
      .map(|(i, _)| i)
      .collect();
    due.sort_by(|&a, &b| {
      self.tasks[a]
        .priority
        .cmp(&self.tasks[b].priority)
        .then(a.cmp(&b))
    });

    let mut remaining = budget_ms;
    let mut ran = Vec::new();
    let mut skipped = Vec::new();
    let mut total_ms = 0.0f32;

    for idx in due {
      let estimate = self.tasks[idx].timing.ema_ms;
      if estimate > 0.0 && estimate > remaining && !ran.is_empty() {
        log::warn!(
          "scheduler: skipping task '{}' (estimate {:.2}ms exceeds remaining budget {:.2}ms)",
          self.tasks[idx].name,
          estimate,
          remaining
        );
        skipped.push(self.tasks[idx].name);
        continue;
      }

      let start = Instant::now();
      let task = &mut self.tasks[idx];
      let result = catch_unwind(AssertUnwindSafe(|| (task.func)()));
      let elapsed_ms = start.elapsed().as_secs_f32() * 1000.0;

      if let Err(payload) = result {
        log::error!(
          "scheduler: task '{}' panicked: {}",
          task.name,
          panic_message(&payload)
        );
      }

      task.timing.record(elapsed_ms);
      remaining -= elapsed_ms;
      total_ms += elapsed_ms;
      ran.push(task.name);
    }

    TickReport {
      ran,
      skipped,
      total_ms,
    }
  }

  pub fn p50_ms(&self, name: &str) -> f32 {
    self
      .tasks
      .iter()
      .find(|t| t.name == name)
      .map(|t| t.timing.percentile(0.5))
      .unwrap_or(0.0)
  }

  pub fn p95_ms(&self, name: &str) -> f32 {
    self
      .tasks
      .iter()
      .find(|t| t.name == name)
      .map(|t| t.timing.percentile(0.95))
      .unwrap_or(0.0)
  }

  pub fn ema_ms(&self, name: &str) -> f32 {
    self
      .tasks
      .iter()
      .find(|t| t.name == name)
      .map(|t| t.timing.ema_ms)
      .unwrap_or(0.0)
  }

  /// Clears all recorded timing history and the tick counter, without
  /// unregistering tasks.
  pub fn reset(&mut self) {
    self.tick = 0;
    for task in &mut self.tasks {
      task.timing = Timing::new();
    }
  }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "<non-string panic payload>".to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;

  #[test]
  fn fast_task_runs_every_tick_medium_every_fifth() {
    let mut sched = Scheduler::new();
    let fast_count = Arc::new(AtomicU32::new(0));
    let medium_count = Arc::new(AtomicU32::new(0));
    let fc = fast_count.clone();
    let mc = medium_count.clone();
    sched.register("fast", Rate::Fast, 0, move || {
      fc.fetch_add(1, Ordering::SeqCst);
    });
    sched.register("medium", Rate::Medium, 0, move || {
      mc.fetch_add(1, Ordering::SeqCst);
    });
    for _ in 0..10 {
      sched.run_tick(1000.0);
    }
    assert_eq!(fast_count.load(Ordering::SeqCst), 10);
    assert_eq!(medium_count.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn set_intervals_overrides_the_default_divisors() {
    let mut sched = Scheduler::new();
    sched.set_intervals(1, 2, 2);
    let medium_count = Arc::new(AtomicU32::new(0));
    let mc = medium_count.clone();
    sched.register("medium", Rate::Medium, 0, move || {
      mc.fetch_add(1, Ordering::SeqCst);
    });
    for _ in 0..4 {
      sched.run_tick(1000.0);
    }
    assert_eq!(medium_count.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn lower_priority_task_runs_before_higher() {
    let mut sched = Scheduler::new();
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let o1 = order.clone();
    let o2 = order.clone();
    sched.register("high", Rate::Fast, 10, move || o1.lock().unwrap().push("high"));
    sched.register("low", Rate::Fast, 0, move || o2.lock().unwrap().push("low"));
    sched.run_tick(1000.0);
    assert_eq!(*order.lock().unwrap(), vec!["low", "high"]);
  }

  #[test]
  fn panicking_task_does_not_stop_the_tick() {
    let mut sched = Scheduler::new();
    let ran = Arc::new(AtomicU32::new(0));
    let r = ran.clone();
    sched.register("boom", Rate::Fast, 10, || panic!("kaboom"));
    sched.register("after", Rate::Fast, 0, move || {
      r.fetch_add(1, Ordering::SeqCst);
    });
    let report = sched.run_tick(1000.0);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert_eq!(report.ran.len(), 2);
  }

  #[test]
  fn reset_clears_timing_history() {
    let mut sched = Scheduler::new();
    sched.register("task", Rate::Fast, 0, || {});
    sched.run_tick(1000.0);
    assert!(sched.ema_ms("task") >= 0.0);
    sched.reset();
    assert_eq!(sched.ema_ms("task"), 0.0);
  }
}
