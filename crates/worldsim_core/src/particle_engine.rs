//! Particle sensing, motion, consumption, deposition, reproduction, and
//! death — processed sequentially in ascending id order for determinism
//! (spec §5).
//!
//! Grounded on the teacher's per-cell CA update loop (`simulation::step`,
//! which visits cells in raster order and mutates a `Surface` in place),
//! adapted from a per-cell visit to a per-particle visit and from
//! raster order to ascending particle id.

use crate::behavior::{archetype_for, Archetype};
use crate::chunk::FieldKind;
use crate::chunk_manager::ChunkManager;
use crate::config::GradientWeights;
use crate::noise::lcg_hash;
use crate::particle::{Goal, Particle, ParticleState, ParticleStore};

/// Tunable knobs for one tick of particle processing (spec §6 config
/// table, particle-engine subset).
#[derive(Clone, Copy, Debug)]
pub struct ParticleEngineConfig {
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
  pub weights: GradientWeights,
}

impl Default for ParticleEngineConfig {
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
      mutation_rate: 0.0,
      crowd_capacity: 40.0,
      day_length_ticks: 1000,
      weights: GradientWeights::default(),
    }
  }
}

/// Phase of the day/night cycle at `tick`, in `[0, 1)` with 0 at dawn
/// (spec §4.4 sensing formula, day/night modifier).
fn day_night_phase(tick: u64, day_length_ticks: u64) -> f32 {
  if day_length_ticks == 0 {
    return 0.0;
  }
  (tick % day_length_ticks) as f32 / day_length_ticks as f32
}

/// Deterministic value in `[0, 1)` for one particle's decision at one tick,
/// salted so unrelated decisions within the same tick don't correlate.
fn decision_unit(id: u64, tick: u64, salt: u64) -> f32 {
  lcg_hash(id as i64, tick as i64, salt) as f32
}

/// One sensing + motion + consumption + deposition pass over every living
/// particle, then a reproduction pass, then a death sweep. Runs in
/// ascending id order throughout (spec §5 ordering guarantee).
pub fn step(
  store: &mut ParticleStore,
  chunks: &mut ChunkManager,
  cfg: &ParticleEngineConfig,
  tick: u64,
) -> (u32, u32) {
  let ids: Vec<u64> = store
    .iter_ascending_ids()
    .filter(|p| p.alive)
    .map(|p| p.id)
    .collect();

  let phase = day_night_phase(tick, cfg.day_length_ticks);
  let weights = cfg.weights.apply_time_of_day(phase);

  for id in &ids {
    let step_length = sense_and_move(store, chunks, cfg, &weights, *id);
    consume(store, chunks, cfg, *id);
    deposit(store, chunks, *id);
    apply_metabolism(store, cfg, *id, step_length);
  }

  let births = reproduce_pass(store, chunks, cfg, tick, &ids);
  let deaths = death_pass(store, &ids);

  (births, deaths)
}

/// Senses, turns, and advances one particle by one tick's worth of
/// substeps, returning the distance actually covered (spec §4.4 motion,
/// fed into `apply_metabolism`'s movement cost).
fn sense_and_move(
  store: &mut ParticleStore,
  chunks: &ChunkManager,
  cfg: &ParticleEngineConfig,
  weights: &GradientWeights,
  id: u64,
) -> f32 {
  let Some(particle) = store.get(id) else {
    return 0.0;
  };
  if !particle.alive {
    return 0.0;
  }
  let archetype = archetype_for(particle.archetype_bits());
  let own_trail = FieldKind::trail_from_bits(particle.archetype_bits());
  let (wx, wy) = particle.chunk_cell();

  let (target_dx, target_dy) = if let Some(goal) = &particle.goal {
    let dx = (goal.target_x - wx).signum();
    let dy = (goal.target_y - wy).signum();
    (dx, dy)
  } else {
    best_candidate_offset(chunks, archetype, weights, own_trail, cfg.crowd_capacity, wx, wy, cfg.sense_radius)
  };

  let speed = archetype.max_speed;
  let particle = store.get_mut(id).unwrap();
  particle.vx = (particle.vx * cfg.damping + target_dx as f32 * speed * (1.0 - cfg.damping))
    .clamp(-speed, speed);
  particle.vy = (particle.vy * cfg.damping + target_dy as f32 * speed * (1.0 - cfg.damping))
    .clamp(-speed, speed);

  let substeps = cfg.motion_substeps.max(1) as f32;
  let step_dx = particle.vx / substeps;
  let step_dy = particle.vy / substeps;
  particle.x += step_dx;
  particle.y += step_dy;
  particle.state = if target_dx != 0 || target_dy != 0 {
    ParticleState::Moving
  } else {
    ParticleState::Idle
  };

  (step_dx * step_dx + step_dy * step_dy).sqrt()
}

/// Scores a candidate cell against all seven sensing terms (spec §4.4):
/// food, water, and the particle's own trail pull it in; danger, cost,
/// and local crowding push it away; exploration rewards cells its own
/// trail hasn't marked yet. Each term is `archetype multiplier * global
/// weight * field value`.
fn score_candidate(
  chunks: &ChunkManager,
  archetype: &Archetype,
  weights: &GradientWeights,
  own_trail: FieldKind,
  crowd_capacity: f32,
  nx: i64,
  ny: i64,
) -> f32 {
  let food = chunks.get_value(nx, ny, FieldKind::Food);
  let water = chunks.get_value(nx, ny, FieldKind::Water);
  let danger = chunks.get_value(nx, ny, FieldKind::Danger);
  let cost = chunks.get_value(nx, ny, FieldKind::Cost);
  let trail_self = chunks.get_value(nx, ny, own_trail);
  let population = chunks.get_value(nx, ny, FieldKind::Population);

  let crowding = if crowd_capacity > 0.0 {
    (population / crowd_capacity).min(1.0)
  } else {
    0.0
  };
  let exploration = (1.0 - trail_self).max(0.0);

  archetype.food_weight * weights.food * food
    + archetype.water_weight * weights.water * water
    + archetype.trail_weight * weights.trail * trail_self
    + archetype.danger_weight * weights.danger * danger
    + archetype.cost_weight * weights.cost * cost
    + archetype.crowding_weight * weights.crowding * crowding
    + archetype.exploration_weight * weights.exploration * exploration
}

/// Scores every offset in `[-radius, radius]^2` and returns the
/// best-scoring direction, clamped to a single step.
fn best_candidate_offset(
  chunks: &ChunkManager,
  archetype: &Archetype,
  weights: &GradientWeights,
  own_trail: FieldKind,
  crowd_capacity: f32,
  wx: i64,
  wy: i64,
  radius: i64,
) -> (i64, i64) {
  let mut best_score = f32::NEG_INFINITY;
  let mut best = (0i64, 0i64);

  for dy in -radius..=radius {
    for dx in -radius..=radius {
      if dx == 0 && dy == 0 {
        continue;
      }
      let (nx, ny) = (wx + dx, wy + dy);
      let score = score_candidate(chunks, archetype, weights, own_trail, crowd_capacity, nx, ny);
      if score > best_score {
        best_score = score;
        best = (dx.signum(), dy.signum());
      }
    }
  }
  best
}

fn consume(
  store: &mut ParticleStore,
  chunks: &mut ChunkManager,
  cfg: &ParticleEngineConfig,
  id: u64,
) {
  let Some(particle) = store.get(id) else {
    return;
  };
  if !particle.alive {
    return;
  }
  let (wx, wy) = particle.chunk_cell();
  let available = chunks.get_value(wx, wy, FieldKind::Food);
  if available <= 0.0 {
    return;
  }
  let taken = (available * cfg.consumption_rate).min(available);
  chunks.set_value(wx, wy, FieldKind::Food, available - taken);

  let particle = store.get_mut(id).unwrap();
  let gained = taken * cfg.consumption_efficiency;
  particle.energy = (particle.energy + gained).min(cfg.max_energy);
  *particle.inventory.entry("food").or_insert(0.0) += taken;
  particle.state = ParticleState::Consuming;
}

fn deposit(store: &ParticleStore, chunks: &mut ChunkManager, id: u64) {
  let Some(particle) = store.get(id) else {
    return;
  };
  if !particle.alive {
    return;
  }
  let (wx, wy) = particle.chunk_cell();
  let trail = FieldKind::trail_from_bits(particle.archetype_bits());
  let current = chunks.get_value(wx, wy, trail);
  chunks.set_value(wx, wy, trail, current + 0.1);

  let pop = chunks.get_value(wx, wy, FieldKind::Population);
  chunks.set_value(wx, wy, FieldKind::Population, pop + 1.0);
}

/// Drains a particle's energy by its archetype's baseline metabolism plus
/// the configured `base_metabolism` and a `movement_cost` proportional to
/// the distance it just moved (spec §4.4).
fn apply_metabolism(store: &mut ParticleStore, cfg: &ParticleEngineConfig, id: u64, step_length: f32) {
  let Some(particle) = store.get_mut(id) else {
    return;
  };
  if !particle.alive {
    return;
  }
  let archetype = archetype_for(particle.archetype_bits());
  particle.energy -= cfg.base_metabolism + archetype.metabolism + cfg.movement_cost * step_length;
  if particle.energy <= 0.0 {
    particle.alive = false;
  }
}

/// Splits off a child for every particle whose energy clears the
/// reproduction threshold and whose cooldown has elapsed. Each of the
/// child's 64 seed bits flips independently with probability
/// `mutation_rate` (spec §4.4).
fn reproduce_pass(
  store: &mut ParticleStore,
  chunks: &ChunkManager,
  cfg: &ParticleEngineConfig,
  tick: u64,
  ids: &[u64],
) -> u32 {
  let mut births = 0;
  let mut spawns: Vec<(f32, f32, u64, f32)> = Vec::new();

  for &id in ids {
    let Some(particle) = store.get_mut(id) else {
      continue;
    };
    if !particle.alive {
      continue;
    }
    if particle.energy < cfg.reproduction_energy_threshold {
      continue;
    }
    if tick.saturating_sub(particle.last_reproduction_tick) < cfg.reproduction_cooldown_ticks {
      continue;
    }

    let mut child_seed = particle.seed;
    for bit in 0..64u32 {
      let roll = decision_unit(particle.id, tick, 0xFACE_0000 ^ bit as u64);
      if roll < cfg.mutation_rate {
        child_seed ^= 1u64 << bit;
      }
    }

    particle.energy -= cfg.reproduction_cost;
    particle.last_reproduction_tick = tick;
    spawns.push((particle.x, particle.y, child_seed, cfg.reproduction_cost));
    births += 1;
  }

  for (x, y, seed, energy) in spawns {
    store.spawn(x, y, seed, energy);
  }
  let _ = chunks;
  births
}

fn death_pass(store: &mut ParticleStore, ids: &[u64]) -> u32 {
  let mut deaths = 0;
  for &id in ids {
    if let Some(p) = store.get(id) {
      if !p.alive {
        deaths += 1;
      }
    }
  }
  store.sweep_dead();
  deaths
}

/// Assigns an explicit pursuit goal (spec §5.1 "goal record").
pub fn set_goal(particle: &mut Particle, kind: &'static str, target_x: i64, target_y: i64, score: f32) {
  particle.goal = Some(Goal {
    kind,
    target_x,
    target_y,
    score,
  });
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::chunk_manager::TerrainParams;

  #[test]
  fn starving_particle_dies() {
    let mut chunks = ChunkManager::new(16, TerrainParams::default());
    let mut store = ParticleStore::new();
    let id = store.spawn(0.0, 0.0, 0, 0.0001);
    let cfg = ParticleEngineConfig::default();
    step(&mut store, &mut chunks, &cfg, 1);
    assert!(store.get(id).is_none());
  }

  #[test]
  fn consumption_transfers_food_into_energy() {
    let mut chunks = ChunkManager::new(16, TerrainParams::default());
    chunks.set_value(0, 0, FieldKind::Food, 0.3);
    let mut store = ParticleStore::new();
    let id = store.spawn(0.0, 0.0, 0, 0.5);
    let cfg = ParticleEngineConfig {
      consumption_rate: 0.5,
      max_energy: 1.0,
      ..Default::default()
    };
    step(&mut store, &mut chunks, &cfg, 1);
    let remaining_food = chunks.get_value(0, 0, FieldKind::Food);
    assert!((remaining_food - 0.15).abs() < 1e-5);
  }

  #[test]
  fn reproduction_splits_energy_and_sets_cooldown() {
    let mut chunks = ChunkManager::new(16, TerrainParams::default());
    let mut store = ParticleStore::new();
    let id = store.spawn(0.0, 0.0, 0, 0.9);
    let cfg = ParticleEngineConfig {
      reproduction_energy_threshold: 0.8,
      reproduction_cooldown_ticks: 50,
      reproduction_cost: 0.45,
      mutation_rate: 0.0,
      consumption_rate: 0.0,
      ..Default::default()
    };
    let (births, _deaths) = step(&mut store, &mut chunks, &cfg, 1);
    assert_eq!(births, 1);
    let parent = store.get(id).unwrap();
    assert!(parent.energy < 0.9 - cfg.reproduction_cost);
    assert_eq!(parent.last_reproduction_tick, 1);

    let child = store
      .iter_ascending_ids()
      .find(|p| p.id != id)
      .expect("child spawned");
    assert!((child.energy - cfg.reproduction_cost).abs() < 1e-6);
  }

  #[test]
  fn zero_mutation_rate_preserves_child_seed() {
    let mut chunks = ChunkManager::new(16, TerrainParams::default());
    let mut store = ParticleStore::new();
    store.spawn(0.0, 0.0, 42, 0.9);
    let cfg = ParticleEngineConfig {
      reproduction_energy_threshold: 0.8,
      reproduction_cooldown_ticks: 0,
      mutation_rate: 0.0,
      consumption_rate: 0.0,
      ..Default::default()
    };
    step(&mut store, &mut chunks, &cfg, 1);
    let child = store
      .iter_ascending_ids()
      .find(|p| p.id != 0)
      .expect("child spawned");
    assert_eq!(child.seed, 42);
  }

  #[test]
  fn full_mutation_rate_flips_every_bit() {
    let mut chunks = ChunkManager::new(16, TerrainParams::default());
    let mut store = ParticleStore::new();
    store.spawn(0.0, 0.0, 42, 0.9);
    let cfg = ParticleEngineConfig {
      reproduction_energy_threshold: 0.8,
      reproduction_cooldown_ticks: 0,
      mutation_rate: 1.0,
      consumption_rate: 0.0,
      ..Default::default()
    };
    step(&mut store, &mut chunks, &cfg, 1);
    let child = store
      .iter_ascending_ids()
      .find(|p| p.id != 0)
      .expect("child spawned");
    assert_eq!(child.seed, !42u64);
  }
}
