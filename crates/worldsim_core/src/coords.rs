//! World/chunk/local coordinate types and conversions.

use std::fmt;

/// Edge length of a chunk, in cells. Fixed per spec §3.
pub const CHUNK_SIZE: i64 = 64;

/// Integer chunk coordinate. Ranges over the full signed-integer domain
/// (spec §6: "Chunk coordinate space").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
  pub cx: i64,
  pub cy: i64,
}

impl ChunkPos {
  pub fn new(cx: i64, cy: i64) -> Self {
    Self { cx, cy }
  }

  /// World-space origin of this chunk: `(cx * S, cy * S)`.
  pub fn origin(&self) -> (i64, i64) {
    (self.cx * CHUNK_SIZE, self.cy * CHUNK_SIZE)
  }

  /// The eight Moore neighbors of this chunk position.
  pub fn moore_neighbors(&self) -> [ChunkPos; 8] {
    [
      ChunkPos::new(self.cx - 1, self.cy - 1),
      ChunkPos::new(self.cx, self.cy - 1),
      ChunkPos::new(self.cx + 1, self.cy - 1),
      ChunkPos::new(self.cx - 1, self.cy),
      ChunkPos::new(self.cx + 1, self.cy),
      ChunkPos::new(self.cx - 1, self.cy + 1),
      ChunkPos::new(self.cx, self.cy + 1),
      ChunkPos::new(self.cx + 1, self.cy + 1),
    ]
  }

  /// Stable string key used by `ChunkManager` (spec §4.2: keyed by
  /// `"cx,cy"`, supporting negative coordinates).
  pub fn key(&self) -> String {
    format!("{},{}", self.cx, self.cy)
  }

  /// Converts a world cell coordinate to its containing chunk position.
  pub fn containing(world_x: i64, world_y: i64) -> Self {
    Self::new(
      world_x.div_euclid(CHUNK_SIZE),
      world_y.div_euclid(CHUNK_SIZE),
    )
  }
}

impl fmt::Display for ChunkPos {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.key())
  }
}

/// A cell position local to a chunk, in `[0, CHUNK_SIZE)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalPos {
  pub x: u32,
  pub y: u32,
}

impl LocalPos {
  pub fn new(x: u32, y: u32) -> Self {
    Self { x, y }
  }

  /// Row-major index within a chunk (spec §6: `index = y * 64 + x`).
  pub fn index(&self) -> usize {
    self.y as usize * CHUNK_SIZE as usize + self.x as usize
  }
}

/// Splits a world cell coordinate into its chunk position and local offset.
pub fn world_to_chunk_local(world_x: i64, world_y: i64) -> (ChunkPos, LocalPos) {
  let chunk = ChunkPos::containing(world_x, world_y);
  let (ox, oy) = chunk.origin();
  (
    chunk,
    LocalPos::new((world_x - ox) as u32, (world_y - oy) as u32),
  )
}

/// Axis-aligned world-space rectangle, in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldRect {
  pub x: i64,
  pub y: i64,
  pub width: u32,
  pub height: u32,
}

impl WorldRect {
  pub fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
    Self { x, y, width, height }
  }

  pub fn centered(cx: i64, cy: i64, width: u32, height: u32) -> Self {
    Self {
      x: cx - width as i64 / 2,
      y: cy - height as i64 / 2,
      width,
      height,
    }
  }

  /// Chunk-coordinate rectangle covering this world rect, expanded by a
  /// one-chunk border (spec §4.2: `updateFromViewport`).
  pub fn to_chunk_range_with_border(&self, border: i64) -> Vec<ChunkPos> {
    let min_cx = (self.x).div_euclid(CHUNK_SIZE) - border;
    let max_cx = (self.x + self.width as i64 - 1).div_euclid(CHUNK_SIZE) + border;
    let min_cy = (self.y).div_euclid(CHUNK_SIZE) - border;
    let max_cy = (self.y + self.height as i64 - 1).div_euclid(CHUNK_SIZE) + border;

    let mut out = Vec::new();
    for cy in min_cy..=max_cy {
      for cx in min_cx..=max_cx {
        out.push(ChunkPos::new(cx, cy));
      }
    }
    out
  }
}
