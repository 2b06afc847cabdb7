//! Simulation configuration: a `serde` + `toml` struct covering every
//! tunable in spec §6, plus a partial-overlay patch type for live
//! `set_config` commands.
//!
//! Grounded on the teacher's `WorldConfig`/`PixelWorldSettings` pattern of
//! a `Deserialize` settings struct with `#[serde(default)]` fields loaded
//! from a TOML asset.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
  pub diffusion: f32,
  pub decay: f32,
  pub max_value: f32,
}

impl Default for FieldConfig {
  fn default() -> Self {
    Self {
      diffusion: 0.1,
      decay: 0.02,
      max_value: 1.0,
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TerrainConfig {
  pub seed: u64,
  pub continentality: f32,
  pub elevation_octaves: u32,
  pub elevation_frequency: f64,
  pub moisture_octaves: u32,
  pub moisture_frequency: f64,
  pub river_frequency: f64,
}

impl Default for TerrainConfig {
  fn default() -> Self {
    Self {
      seed: 0,
      continentality: 0.5,
      elevation_octaves: 4,
      elevation_frequency: 0.01,
      moisture_octaves: 3,
      moisture_frequency: 0.015,
      river_frequency: 0.02,
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ChunkManagerConfig {
  pub max_cached_chunks: usize,
  pub hyper_population_threshold: usize,
  pub unload_radius: f32,
}

impl Default for ChunkManagerConfig {
  fn default() -> Self {
    Self {
      max_cached_chunks: 1024,
      hyper_population_threshold: 40,
      unload_radius: 6.0,
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ParticleConfig {
  pub sense_radius: i64,
  pub motion_substeps: u32,
  pub damping: f32,
  pub consumption_rate: f32,
  pub consumption_efficiency: f32,
  pub max_energy: f32,
  pub base_metabolism: f32,
  pub movement_cost: f32,
  pub reproduction_energy_threshold: f32,
  pub reproduction_cooldown_ticks: u64,
  pub reproduction_cost: f32,
  pub mutation_rate: f32,
  pub crowd_capacity: f32,
  pub day_length_ticks: u64,
}

impl Default for ParticleConfig {
  fn default() -> Self {
    Self {
      sense_radius: 1,
      motion_substeps: 2,
      damping: 0.85,
      consumption_rate: 0.5,
      consumption_efficiency: 0.8,
      max_energy: 1.0,
      base_metabolism: 0.005,
      movement_cost: 0.01,
      reproduction_energy_threshold: 0.8,
      reproduction_cooldown_ticks: 50,
      reproduction_cost: 0.45,
      mutation_rate: 0.01,
      crowd_capacity: 40.0,
      day_length_ticks: 1000,
    }
  }
}

/// Global default gradient weights (spec §6 `weights.*`), combined at
/// sensing time with a particle's per-archetype modifiers and the
/// current day/night phase (spec §4.4).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GradientWeights {
  pub food: f32,
  pub water: f32,
  pub trail: f32,
  pub danger: f32,
  pub cost: f32,
  pub crowding: f32,
  pub exploration: f32,
}

impl Default for GradientWeights {
  fn default() -> Self {
    Self {
      food: 1.0,
      water: 0.5,
      trail: 0.2,
      danger: 1.0,
      cost: 0.3,
      crowding: 0.4,
      exploration: 0.2,
    }
  }
}

impl GradientWeights {
  /// Scales danger and exploration by the day/night cycle: danger reads
  /// louder at night, exploration is favored during the day. `phase` is
  /// in `[0, 1)`, with 0 at dawn and 0.5 at the deepest part of night.
  pub fn apply_time_of_day(&self, phase: f32) -> Self {
    let night = 0.5 - 0.5 * (phase * std::f32::consts::TAU).cos();
    Self {
      danger: self.danger * (1.0 + night),
      exploration: self.exploration * (1.0 - night * 0.5),
      ..*self
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GpuConfig {
  pub disable: bool,
  pub min_cells_for_offload: usize,
  pub job_timeout_ms: u64,
}

impl Default for GpuConfig {
  fn default() -> Self {
    Self {
      disable: false,
      min_cells_for_offload: 4096,
      job_timeout_ms: 50,
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AdvectionConfig {
  pub need: f32,
  pub urgency: f32,
  pub epsilon: f32,
  pub decay_rate: f32,
  pub viscosity: f32,
  pub sensitivity: f32,
  pub max_flow: f32,
  pub dt: f32,
}

impl Default for AdvectionConfig {
  fn default() -> Self {
    Self {
      need: 0.2,
      urgency: 0.5,
      epsilon: 1e-3,
      decay_rate: 0.2,
      viscosity: 0.9,
      sensitivity: 0.5,
      max_flow: 2.0,
      dt: 1.0,
    }
  }
}

impl From<&AdvectionConfig> for crate::advection::AdvectionConfig {
  fn from(cfg: &AdvectionConfig) -> Self {
    Self {
      need: cfg.need,
      urgency: cfg.urgency,
      epsilon: cfg.epsilon,
      decay_rate: cfg.decay_rate,
      viscosity: cfg.viscosity,
      sensitivity: cfg.sensitivity,
      max_flow: cfg.max_flow,
      dt: cfg.dt,
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
  pub tick_budget_ms: f32,
  pub fast_interval_ticks: u64,
  pub medium_interval_ticks: u64,
  pub slow_interval_ticks: u64,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self {
      tick_budget_ms: 16.0,
      fast_interval_ticks: 1,
      medium_interval_ticks: 5,
      slow_interval_ticks: 20,
    }
  }
}

/// Top-level simulation configuration (spec §6). Deserialized from TOML,
/// with every field defaulted so a partial file still loads.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct SimulationConfig {
  pub tick_ms: u64,
  pub terrain: TerrainConfig,
  pub chunk_manager: ChunkManagerConfig,
  pub particle: ParticleConfig,
  pub weights: GradientWeights,
  pub field: FieldConfig,
  pub gpu: GpuConfig,
  pub scheduler: SchedulerConfig,
  pub advection: AdvectionConfig,
}

impl Default for SimulationConfig {
  fn default() -> Self {
    Self {
      tick_ms: 50,
      terrain: TerrainConfig::default(),
      chunk_manager: ChunkManagerConfig::default(),
      particle: ParticleConfig::default(),
      weights: GradientWeights::default(),
      field: FieldConfig::default(),
      gpu: GpuConfig::default(),
      scheduler: SchedulerConfig::default(),
      advection: AdvectionConfig::default(),
    }
  }
}

impl SimulationConfig {
  pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
    Ok(toml::from_str(text)?)
  }

  pub fn load_from_path(path: &std::path::Path) -> Result<Self, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    Self::load_from_str(&text)
  }

  /// Applies a partial patch in place, overwriting only the fields the
  /// patch sets (spec §7 `set_config` command).
  pub fn apply_patch(&mut self, patch: &SimulationConfigPatch) {
    if let Some(v) = patch.tick_ms {
      self.tick_ms = v;
    }
    if let Some(v) = patch.gpu_disable {
      self.gpu.disable = v;
    }
    if let Some(v) = patch.mutation_rate {
      self.particle.mutation_rate = v;
    }
    if let Some(v) = patch.tick_budget_ms {
      self.scheduler.tick_budget_ms = v;
    }
    if let Some(v) = patch.max_cached_chunks {
      self.chunk_manager.max_cached_chunks = v;
    }
  }
}

/// Partial overlay applied by the `set_config` command (spec §7). Every
/// field is optional; absent fields leave the live config untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfigPatch {
  pub tick_ms: Option<u64>,
  pub gpu_disable: Option<bool>,
  pub mutation_rate: Option<f32>,
  pub tick_budget_ms: Option<f32>,
  pub max_cached_chunks: Option<usize>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_config_round_trips_through_toml() {
    let cfg = SimulationConfig::default();
    let text = toml::to_string(&cfg).unwrap();
    let parsed = SimulationConfig::load_from_str(&text).unwrap();
    assert_eq!(cfg, parsed);
  }

  #[test]
  fn partial_toml_fills_remaining_defaults() {
    let cfg = SimulationConfig::load_from_str("tick_ms = 33\n").unwrap();
    assert_eq!(cfg.tick_ms, 33);
    assert_eq!(cfg.particle.mutation_rate, ParticleConfig::default().mutation_rate);
  }

  #[test]
  fn unknown_top_level_field_is_rejected() {
    let result = SimulationConfig::load_from_str("not_a_real_field = 1\n");
    assert!(result.is_err());
  }

  #[test]
  fn deep_night_amplifies_danger_and_dampens_exploration() {
    let base = GradientWeights::default();
    let midnight = base.apply_time_of_day(0.5);
    assert!(midnight.danger > base.danger);
    assert!(midnight.exploration < base.exploration);
  }

  #[test]
  fn dawn_leaves_weights_unmodified() {
    let base = GradientWeights::default();
    let dawn = base.apply_time_of_day(0.0);
    assert!((dawn.danger - base.danger).abs() < 1e-6);
    assert!((dawn.exploration - base.exploration).abs() < 1e-6);
  }

  #[test]
  fn patch_only_touches_set_fields() {
    let mut cfg = SimulationConfig::default();
    let original_tick_ms = cfg.tick_ms;
    let patch = SimulationConfigPatch {
      gpu_disable: Some(true),
      ..Default::default()
    };
    cfg.apply_patch(&patch);
    assert!(cfg.gpu.disable);
    assert_eq!(cfg.tick_ms, original_tick_ms);
  }
}
