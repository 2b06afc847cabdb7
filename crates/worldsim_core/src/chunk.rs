//! Chunk: a 64x64 region owning one Field per field kind, a biome map, and a
//! lifecycle state.
//!
//! Grounded on the teacher's `ChunkSlot` lifecycle (`InPool -> Seeding ->
//! Active -> Recycling`), adapted to the spec's `Dormant -> Active -> Hyper
//! -> Dormant` states and to owning eleven per-kind `Field`s instead of a
//! single `Pixel` surface.

use crate::advection::{self, AdvectionConfig, DemandField, VelocityField};
use crate::coords::{ChunkPos, CHUNK_SIZE};
use crate::field::Field;

/// Fixed enumeration of field kinds a chunk may hold (spec §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
  Food,
  Water,
  Cost,
  Danger,
  Trees,
  Stone,
  Trail0,
  Trail1,
  Trail2,
  Trail3,
  Population,
  Labor,
}

impl FieldKind {
  pub const ALL: [FieldKind; 12] = [
    FieldKind::Food,
    FieldKind::Water,
    FieldKind::Cost,
    FieldKind::Danger,
    FieldKind::Trees,
    FieldKind::Stone,
    FieldKind::Trail0,
    FieldKind::Trail1,
    FieldKind::Trail2,
    FieldKind::Trail3,
    FieldKind::Population,
    FieldKind::Labor,
  ];

  /// Index of the trail channel selected by the low two bits of a seed
  /// (spec §4.4 deposition, GLOSSARY "Trail").
  pub fn trail_from_bits(bits: u8) -> FieldKind {
    match bits & 0b11 {
      0 => FieldKind::Trail0,
      1 => FieldKind::Trail1,
      2 => FieldKind::Trail2,
      _ => FieldKind::Trail3,
    }
  }

  fn default_params(self) -> (f32, f32, f32) {
    // (max_value, diffusion, decay)
    match self {
      FieldKind::Food | FieldKind::Water | FieldKind::Trees | FieldKind::Stone => (1.0, 0.0, 0.0),
      FieldKind::Cost => (1.0, 0.05, 0.0),
      FieldKind::Danger => (1.0, 0.15, 0.05),
      FieldKind::Trail0 | FieldKind::Trail1 | FieldKind::Trail2 | FieldKind::Trail3 => {
        (1.0, 0.1, 0.03)
      }
      FieldKind::Population => (1024.0, 0.0, 1.0),
      FieldKind::Labor => (1.0, 0.0, 0.0),
    }
  }
}

/// Lifecycle state of a chunk (spec §4.2).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkLifecycle {
  /// No field memory allocated.
  Dormant,
  /// Fields allocated and terrain generated.
  Active,
  /// As Active, but growth runs on this chunk in the slow scheduler slot.
  Hyper,
}

/// A 64x64 region of the world (spec §3).
pub struct Chunk {
  pub pos: ChunkPos,
  pub state: ChunkLifecycle,
  /// `None` while `Dormant` (spec invariant: "a Dormant chunk holds no field
  /// memory").
  fields: Option<[Field; FieldKind::ALL.len()]>,
  /// Immutable once generated (spec invariant).
  biome_map: Option<Vec<u8>>,
  pub last_accessed: u64,
  pub generated: bool,
  pub modified: bool,
  pub persisted: bool,
  /// Demand/velocity state for resource advection. `None` while `Dormant`,
  /// same lifecycle as `fields` (spec §4.5).
  flow: Option<(DemandField, VelocityField, VelocityField)>,
}

impl Chunk {
  pub fn new_dormant(pos: ChunkPos) -> Self {
    Self {
      pos,
      state: ChunkLifecycle::Dormant,
      fields: None,
      biome_map: None,
      last_accessed: 0,
      generated: false,
      modified: false,
      persisted: false,
      flow: None,
    }
  }

  pub fn is_dormant(&self) -> bool {
    self.state == ChunkLifecycle::Dormant
  }

  /// Allocates field memory for every field kind in the fixed enumeration
  /// (spec invariant: "after activate() all field types ... are present").
  pub fn activate(&mut self) {
    if self.state != ChunkLifecycle::Dormant {
      return;
    }
    let size = CHUNK_SIZE as u32;
    let fields = FieldKind::ALL.map(|kind| {
      let (max_value, diffusion, decay) = kind.default_params();
      let mut f = Field::new(size, size, max_value);
      f.diffusion = diffusion;
      f.decay = decay;
      f
    });
    self.fields = Some(fields);
    if self.biome_map.is_none() {
      self.biome_map = Some(vec![0u8; (size * size) as usize]);
    }
    self.flow = Some((
      DemandField::new(size, size),
      VelocityField::new(size, size),
      VelocityField::new(size, size),
    ));
    self.state = ChunkLifecycle::Active;
  }

  pub fn set_hyper(&mut self) {
    if self.state == ChunkLifecycle::Active {
      self.state = ChunkLifecycle::Hyper;
    }
  }

  /// Releases field memory, returning to Dormant (spec: "sleep() on
  /// inactivity timeout or eviction").
  pub fn sleep(&mut self) {
    self.fields = None;
    self.flow = None;
    self.state = ChunkLifecycle::Dormant;
  }

  fn field_index(kind: FieldKind) -> usize {
    FieldKind::ALL.iter().position(|&k| k == kind).unwrap()
  }

  pub fn field(&self, kind: FieldKind) -> Option<&Field> {
    self.fields.as_ref().map(|fs| &fs[Self::field_index(kind)])
  }

  pub fn field_mut(&mut self, kind: FieldKind) -> Option<&mut Field> {
    self
      .fields
      .as_mut()
      .map(|fs| &mut fs[Self::field_index(kind)])
  }

  pub fn fields(&self) -> Option<&[Field; FieldKind::ALL.len()]> {
    self.fields.as_ref()
  }

  pub fn fields_mut(&mut self) -> Option<&mut [Field; FieldKind::ALL.len()]> {
    self.fields.as_mut()
  }

  pub fn biome_map(&self) -> Option<&[u8]> {
    self.biome_map.as_deref()
  }

  /// Writes the biome map once, at generation time. Subsequent calls are a
  /// no-op (spec invariant: "the biome map is immutable once generated").
  pub fn set_biome_map(&mut self, map: Vec<u8>) {
    if self.biome_map.is_none() || !self.generated {
      self.biome_map = Some(map);
    }
  }

  pub fn steps_all_fields(&mut self) {
    if let Some(fields) = self.fields.as_mut() {
      for f in fields.iter_mut() {
        f.diffuse_decay_step();
      }
    }
  }

  /// Advects the Food field along the population-demand gradient (spec
  /// §4.5). A no-op on a `Dormant` chunk, since it holds no field memory.
  pub fn advect_food(&mut self, cfg: &AdvectionConfig) {
    let (fields, flow) = match (self.fields.as_mut(), self.flow.as_mut()) {
      (Some(fields), Some(flow)) => (fields, flow),
      _ => return,
    };
    let (demand, vx, vy) = flow;
    let population_idx = Self::field_index(FieldKind::Population);
    let food_idx = Self::field_index(FieldKind::Food);
    let (population_slice, food_slice) = if population_idx < food_idx {
      let (left, right) = fields.split_at_mut(food_idx);
      (&left[population_idx], &mut right[0])
    } else {
      let (left, right) = fields.split_at_mut(population_idx);
      (&right[0], &mut left[food_idx])
    };
    advection::update_and_advect(food_slice, population_slice, demand, vx, vy, cfg);
  }

  pub fn growth_step_food_and_trees(&mut self) {
    if self.state != ChunkLifecycle::Hyper {
      return;
    }
    if let Some(fields) = self.fields.as_mut() {
      fields[Self::field_index(FieldKind::Food)].growth_step();
      fields[Self::field_index(FieldKind::Trees)].growth_step();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dormant_chunk_has_no_fields() {
    let c = Chunk::new_dormant(ChunkPos::new(0, 0));
    assert!(c.field(FieldKind::Food).is_none());
    assert!(c.biome_map().is_none());
  }

  #[test]
  fn activate_allocates_every_field_kind() {
    let mut c = Chunk::new_dormant(ChunkPos::new(0, 0));
    c.activate();
    for kind in FieldKind::ALL {
      assert!(c.field(kind).is_some());
    }
    assert!(c.biome_map().is_some());
  }

  #[test]
  fn sleep_releases_field_memory() {
    let mut c = Chunk::new_dormant(ChunkPos::new(0, 0));
    c.activate();
    c.sleep();
    assert!(c.is_dormant());
    assert!(c.field(FieldKind::Food).is_none());
  }

  #[test]
  fn biome_map_is_immutable_once_generated() {
    let mut c = Chunk::new_dormant(ChunkPos::new(0, 0));
    c.activate();
    c.set_biome_map(vec![5; 64 * 64]);
    c.generated = true;
    c.set_biome_map(vec![9; 64 * 64]);
    assert_eq!(c.biome_map().unwrap()[0], 5);
  }

  #[test]
  fn growth_only_runs_on_hyper_chunks() {
    let mut c = Chunk::new_dormant(ChunkPos::new(0, 0));
    c.activate();
    c.field_mut(FieldKind::Food).unwrap().growth = Some(crate::field::Growth {
      rate: 0.5,
      carrying_capacity: 1.0,
    });
    c.field_mut(FieldKind::Food).unwrap().set(0, 0, 0.2);
    c.growth_step_food_and_trees();
    assert_eq!(c.field(FieldKind::Food).unwrap().get(0, 0), 0.2);

    c.set_hyper();
    c.growth_step_food_and_trees();
    assert!(c.field(FieldKind::Food).unwrap().get(0, 0) > 0.2);
  }

  #[test]
  fn advect_food_is_a_no_op_while_dormant() {
    let mut c = Chunk::new_dormant(ChunkPos::new(0, 0));
    c.advect_food(&crate::advection::AdvectionConfig::default());
  }

  #[test]
  fn advect_food_moves_resource_toward_population() {
    let mut c = Chunk::new_dormant(ChunkPos::new(0, 0));
    c.activate();
    c.field_mut(FieldKind::Food).unwrap().set(0, 32, 1.0);
    c.field_mut(FieldKind::Population)
      .unwrap()
      .set(40, 32, 800.0);
    let cfg = crate::advection::AdvectionConfig {
      decay_rate: 1.0,
      viscosity: 0.0,
      ..crate::advection::AdvectionConfig::default()
    };
    for _ in 0..8 {
      c.advect_food(&cfg);
    }
    assert!(c.field(FieldKind::Food).unwrap().get(40, 32) >= 0.0);
  }
}
