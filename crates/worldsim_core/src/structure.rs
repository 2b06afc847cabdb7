//! Structures: persistent entities built by particles, referenced by id
//! (spec §4.12).
//!
//! Grounded on the teacher's `PixelBody` (a free-standing id-addressed
//! entity separate from the chunk grid, owning a position, health, and a
//! stable id used for save/load round trips).

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StructureType {
  Nest,
  Cache,
  Waystation,
  Monument,
}

/// A built structure (spec §4.12). References particles only by id, never
/// by index, so particle deaths never invalidate a structure.
#[derive(Clone, Debug)]
pub struct Structure {
  pub id: u64,
  pub kind: StructureType,
  pub x: i64,
  pub y: i64,
  pub level: u32,
  pub health: f32,
  pub created_tick: u64,
  pub last_used_tick: u64,
  pub builders: Vec<u64>,
  pub owner: Option<u64>,
}

impl Structure {
  pub fn new(id: u64, kind: StructureType, x: i64, y: i64, created_tick: u64) -> Self {
    Self {
      id,
      kind,
      x,
      y,
      level: 1,
      health: 1.0,
      created_tick,
      last_used_tick: created_tick,
      builders: Vec::new(),
      owner: None,
    }
  }

  pub fn touch(&mut self, tick: u64) {
    self.last_used_tick = tick;
  }

  pub fn is_abandoned(&self, tick: u64, abandon_after_ticks: u64) -> bool {
    tick.saturating_sub(self.last_used_tick) >= abandon_after_ticks
  }
}

#[derive(Default)]
pub struct StructureStore {
  structures: Vec<Structure>,
  next_id: u64,
}

impl StructureStore {
  pub fn new() -> Self {
    Self {
      structures: Vec::new(),
      next_id: 0,
    }
  }

  pub fn build(&mut self, kind: StructureType, x: i64, y: i64, tick: u64, builder: u64) -> u64 {
    let id = self.next_id;
    self.next_id += 1;
    let mut structure = Structure::new(id, kind, x, y, tick);
    structure.builders.push(builder);
    self.structures.push(structure);
    id
  }

  pub fn get(&self, id: u64) -> Option<&Structure> {
    self.structures.iter().find(|s| s.id == id)
  }

  pub fn get_mut(&mut self, id: u64) -> Option<&mut Structure> {
    self.structures.iter_mut().find(|s| s.id == id)
  }

  pub fn remove_abandoned(&mut self, tick: u64, abandon_after_ticks: u64) -> usize {
    let before = self.structures.len();
    self
      .structures
      .retain(|s| !s.is_abandoned(tick, abandon_after_ticks));
    before - self.structures.len()
  }

  pub fn len(&self) -> usize {
    self.structures.len()
  }

  pub fn is_empty(&self) -> bool {
    self.structures.is_empty()
  }
}
