//! Top-level orchestration: wires every subsystem into one fixed per-tick
//! pipeline and exposes the command/snapshot/persistence surface external
//! adapters use (spec §2 data flow, §5 ordering guarantees).
//!
//! Grounded on the teacher's top-level `BevyPixelWorldPlugin` (the single
//! place that registers every system and owns the resources they share),
//! adapted from Bevy's own scheduler to the bespoke `Scheduler` in this
//! crate — rendering and client wiring (explicitly out of scope) are
//! dropped, the plugin's system registration survives as the ordered
//! pipeline below.

use std::sync::{Arc, Mutex};

use crate::command::{validate, Command};
use crate::community::CommunityStore;
use crate::config::SimulationConfig;
use crate::coords::ChunkPos;
use crate::error::{CommandError, SaveError};
use crate::gpu_bridge::GpuBridge;
use crate::metrics::Metrics;
use crate::particle::ParticleStore;
use crate::particle_engine::{self, ParticleEngineConfig};
use crate::persistence;
use crate::reaction::{self, ReactionEngine};
use crate::scheduler::{Rate, Scheduler, TickReport};
use crate::snapshot::{build_snapshot, Snapshot};
use crate::structure::StructureStore;
use crate::thermostat::{Pid, Thermostat};

use crate::chunk_manager::{ChunkManager, TerrainParams};

/// A fixed labor budget spent by the reaction engine each time it runs
/// against one chunk (spec §6 names a labor budget per chunk; exposing it
/// as a tunable config field is left for a future revision — see
/// DESIGN.md).
const LABOR_BUDGET_PER_CHUNK: f32 = 10.0;

struct EngineState {
  config: SimulationConfig,
  chunks: ChunkManager,
  particles: ParticleStore,
  structures: StructureStore,
  communities: CommunityStore,
  reactions: ReactionEngine,
  gpu: Option<GpuBridge>,
  metrics: Metrics,
  tick: u64,
  seed: u64,
  last_births: u32,
  last_deaths: u32,
}

fn run_one_tick(state: &mut EngineState) {
  state.tick += 1;
  let tick = state.tick;

  let particle_cfg = ParticleEngineConfig {
    sense_radius: state.config.particle.sense_radius,
    motion_substeps: state.config.particle.motion_substeps,
    damping: state.config.particle.damping,
    consumption_rate: state.config.particle.consumption_rate,
    consumption_efficiency: state.config.particle.consumption_efficiency,
    max_energy: state.config.particle.max_energy,
    base_metabolism: state.config.particle.base_metabolism,
    movement_cost: state.config.particle.movement_cost,
    reproduction_energy_threshold: state.config.particle.reproduction_energy_threshold,
    reproduction_cooldown_ticks: state.config.particle.reproduction_cooldown_ticks,
    reproduction_cost: state.config.particle.reproduction_cost,
    mutation_rate: state.config.particle.mutation_rate,
    crowd_capacity: state.config.particle.crowd_capacity,
    day_length_ticks: state.config.particle.day_length_ticks,
    weights: state.config.weights,
  };
  let (births, deaths) = particle_engine::step(
    &mut state.particles,
    &mut state.chunks,
    &particle_cfg,
    tick,
  );
  state.last_births = births;
  state.last_deaths = deaths;

  let positions = state.particles.positions();
  state
    .chunks
    .update_from_particles(&positions, state.config.chunk_manager.hyper_population_threshold);

  let gpu_enabled = state.gpu.is_some() && !state.config.gpu.disable;
  if gpu_enabled {
    let gpu = state.gpu.as_mut().unwrap();
    gpu.set_manually_disabled(false);
    let metrics = &mut state.metrics;
    state.chunks.step_with_gpu(gpu, metrics);
  } else {
    if let Some(gpu) = state.gpu.as_mut() {
      gpu.set_manually_disabled(true);
    }
    state.chunks.step();
  }

  if tick % state.config.scheduler.medium_interval_ticks.max(1) == 0 {
    let reactions = &state.reactions;
    state
      .chunks
      .for_each_active_chunk_ascending(|chunk| {
        reactions.apply_to_chunk(chunk, LABOR_BUDGET_PER_CHUNK);
      });
  }

  if tick % state.config.scheduler.slow_interval_ticks.max(1) == 0 {
    state
      .chunks
      .cleanup(state.config.chunk_manager.unload_radius);
    state.communities.rebuild(&state.particles, 2.0, tick);
    state.structures.remove_abandoned(tick, 2000);
  }

  state.metrics.record_tick(
    state.chunks.active_chunk_count() as u64,
    state.particles.len_alive() as u64,
    births as u64,
    deaths as u64,
  );
}

/// The running simulation: one `Engine` per world (spec §2).
pub struct Engine {
  state: Arc<Mutex<EngineState>>,
  scheduler: Scheduler,
  thermostat: Thermostat,
  running: bool,
}

impl Engine {
  pub fn new(config: SimulationConfig) -> Self {
    let seed = config.terrain.seed;
    let terrain = TerrainParams {
      seed: config.terrain.seed,
      continentality: config.terrain.continentality,
      elevation_octaves: config.terrain.elevation_octaves,
      elevation_frequency: config.terrain.elevation_frequency,
      moisture_octaves: config.terrain.moisture_octaves,
      moisture_frequency: config.terrain.moisture_frequency,
      river_frequency: config.terrain.river_frequency,
    };

    let gpu = if config.gpu.disable {
      None
    } else {
      let os_id = format!("worldsim-{}-{}", std::process::id(), seed);
      GpuBridge::new(
        &os_id,
        config.gpu.min_cells_for_offload,
        std::time::Duration::from_millis(config.gpu.job_timeout_ms),
      )
      .map_err(|e| log::warn!("gpu_bridge: disabled at startup, shared memory unavailable: {e}"))
      .ok()
    };

    let max_cached_chunks = config.chunk_manager.max_cached_chunks;
    let advection = crate::advection::AdvectionConfig::from(&config.advection);
    let scheduler_intervals = (
      config.scheduler.fast_interval_ticks,
      config.scheduler.medium_interval_ticks,
      config.scheduler.slow_interval_ticks,
    );
    let state = EngineState {
      chunks: ChunkManager::new(max_cached_chunks, terrain).with_advection(advection),
      particles: ParticleStore::new(),
      structures: StructureStore::new(),
      communities: CommunityStore::new(),
      reactions: ReactionEngine::new(reaction::default_rules()),
      gpu,
      metrics: Metrics::default(),
      tick: 0,
      seed,
      last_births: 0,
      last_deaths: 0,
      config,
    };
    let state = Arc::new(Mutex::new(state));

    let mut scheduler = Scheduler::new();
    scheduler.set_intervals(scheduler_intervals.0, scheduler_intervals.1, scheduler_intervals.2);
    let tick_state = Arc::clone(&state);
    scheduler.register("tick", Rate::Fast, 0, move || {
      let mut guard = tick_state.lock().expect("engine state poisoned");
      run_one_tick(&mut guard);
    });

    let mut thermostat = Thermostat::new();
    thermostat.register("tick_ms", Pid::new(16.0, 0.5, 0.05, 0.0));

    Self {
      state,
      scheduler,
      thermostat,
      running: false,
    }
  }

  pub fn start(&mut self) {
    self.running = true;
  }

  pub fn pause(&mut self) {
    self.running = false;
  }

  pub fn resume(&mut self) {
    self.running = true;
  }

  pub fn is_running(&self) -> bool {
    self.running
  }

  /// Advances the simulation by one tick within the configured wall-clock
  /// budget (spec §4.7 scheduler budget), regardless of `running` — pause
  /// gating is the caller's (e.g. the binary's tick loop) responsibility
  /// so that `tick()` itself stays a pure advance-by-one primitive.
  pub fn tick(&mut self) -> TickReport {
    let budget = {
      let guard = self.state.lock().expect("engine state poisoned");
      guard.config.scheduler.tick_budget_ms
    };
    let report = self.scheduler.run_tick(budget);
    self.thermostat.step("tick_ms", report.total_ms, 1.0);
    report
  }

  pub fn tick_count(&self) -> u64 {
    self.state.lock().expect("engine state poisoned").tick
  }

  pub fn metrics(&self) -> Metrics {
    self.state.lock().expect("engine state poisoned").metrics.clone()
  }

  pub fn snapshot(&self, stride: usize) -> Snapshot {
    let guard = self.state.lock().expect("engine state poisoned");
    build_snapshot(guard.tick, guard.particles.iter_ascending_ids(), stride)
  }

  pub fn ensure_viewport(&self, viewport: crate::coords::WorldRect) -> usize {
    let mut guard = self.state.lock().expect("engine state poisoned");
    guard.chunks.update_from_viewport(viewport)
  }

  pub fn request_chunks(&self, center: ChunkPos, radius: u32) {
    let mut guard = self.state.lock().expect("engine state poisoned");
    let r = radius as i64;
    for cy in -r..=r {
      for cx in -r..=r {
        guard
          .chunks
          .ensure_chunk_active(ChunkPos::new(center.cx + cx, center.cy + cy));
      }
    }
  }

  pub fn save(&self) -> Result<Vec<u8>, SaveError> {
    let guard = self.state.lock().expect("engine state poisoned");
    persistence::save_to_bytes(&guard.particles, guard.seed, guard.tick)
  }

  pub fn load(&mut self, bytes: &[u8]) -> Result<(), SaveError> {
    let loaded = persistence::load_from_bytes(bytes)?;
    let mut guard = self.state.lock().expect("engine state poisoned");
    guard.particles = ParticleStore::new();
    for particle in loaded.particles {
      let id = guard.particles.spawn(particle.x, particle.y, particle.seed, particle.energy);
      let stored = guard.particles.get_mut(id).unwrap();
      stored.vx = particle.vx;
      stored.vy = particle.vy;
      stored.state = particle.state;
      stored.last_reproduction_tick = particle.last_reproduction_tick;
    }
    guard.seed = loaded.seed;
    guard.tick = loaded.tick;
    self.scheduler.reset();
    Ok(())
  }

  /// Validates and applies one external command (spec §7).
  pub fn apply_command(&mut self, command: Command) -> Result<(), CommandError> {
    validate(&command)?;
    match command {
      Command::Start => self.start(),
      Command::Pause => self.pause(),
      Command::Resume => self.resume(),
      Command::Reset { seed } => {
        let mut guard = self.state.lock().expect("engine state poisoned");
        guard.particles = ParticleStore::new();
        guard.structures = StructureStore::new();
        guard.communities = CommunityStore::new();
        guard.tick = 0;
        guard.seed = seed;
        guard.chunks.terrain.seed = seed;
        drop(guard);
        self.scheduler.reset();
      }
      Command::SetConfig(patch) => {
        let mut guard = self.state.lock().expect("engine state poisoned");
        guard.config.apply_patch(&patch);
      }
      Command::SpawnParticles { x, y, count, seed } => {
        let mut guard = self.state.lock().expect("engine state poisoned");
        let max_energy = guard.config.particle.max_energy;
        for i in 0..count {
          guard.particles.spawn(x, y, seed.wrapping_add(i as u64), max_energy);
        }
      }
      Command::SubscribeField { .. } => {
        // Transport-layer concern: recording a subscription has no effect
        // on simulation state, only on what an adapter chooses to stream.
      }
      Command::ViewportUpdate { viewport } => {
        self.ensure_viewport(viewport);
      }
      Command::RequestChunks { cx, cy, radius } => {
        self.request_chunks(ChunkPos::new(cx, cy), radius);
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::SimulationConfig;

  fn test_engine() -> Engine {
    let mut config = SimulationConfig::default();
    config.gpu.disable = true;
    config.chunk_manager.max_cached_chunks = 64;
    Engine::new(config)
  }

  #[test]
  fn tick_advances_tick_count() {
    let mut engine = test_engine();
    engine.tick();
    engine.tick();
    assert_eq!(engine.tick_count(), 2);
  }

  #[test]
  fn spawn_command_increases_particle_count() {
    let mut engine = test_engine();
    engine
      .apply_command(Command::SpawnParticles {
        x: 0.0,
        y: 0.0,
        count: 3,
        seed: 1,
      })
      .unwrap();
    engine.tick();
    let snap = engine.snapshot(1);
    assert!(snap.particles.len() <= 3);
  }

  #[test]
  fn reset_command_clears_particles_and_tick() {
    let mut engine = test_engine();
    engine
      .apply_command(Command::SpawnParticles {
        x: 0.0,
        y: 0.0,
        count: 2,
        seed: 1,
      })
      .unwrap();
    engine.tick();
    engine.apply_command(Command::Reset { seed: 99 }).unwrap();
    assert_eq!(engine.tick_count(), 0);
    assert_eq!(engine.snapshot(1).particles.len(), 0);
  }

  #[test]
  fn save_and_load_round_trip_through_engine() {
    let mut engine = test_engine();
    engine
      .apply_command(Command::SpawnParticles {
        x: 5.0,
        y: 5.0,
        count: 1,
        seed: 7,
      })
      .unwrap();
    engine.tick();
    let bytes = engine.save().unwrap();

    let mut other = test_engine();
    other.load(&bytes).unwrap();
    assert_eq!(other.tick_count(), engine.tick_count());
  }

  #[test]
  fn invalid_command_is_rejected_before_mutating_state() {
    let mut engine = test_engine();
    let result = engine.apply_command(Command::SpawnParticles {
      x: 0.0,
      y: 0.0,
      count: 0,
      seed: 1,
    });
    assert!(result.is_err());
    assert_eq!(engine.snapshot(1).particles.len(), 0);
  }
}
