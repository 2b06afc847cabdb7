//! Level-of-detail regions: coarse update-rate tiers layered over the
//! chunk grid, keyed by distance from the nearest viewport (spec §4.10).
//!
//! Grounded on the teacher's chunk-distance-based pool eviction heuristic
//! (`world/pool.rs`'s distance-from-camera scoring), repurposed from an
//! eviction score into an update-period selector.

use crate::coords::ChunkPos;

/// LOD tier, from nearest/most-detailed to farthest/least-detailed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lod {
  High,
  Medium,
  Low,
  Dormant,
}

impl Lod {
  /// Ticks between updates at this tier (spec §4.10: 1/3/10/50).
  pub fn update_period(self) -> u64 {
    match self {
      Lod::High => 1,
      Lod::Medium => 3,
      Lod::Low => 10,
      Lod::Dormant => 50,
    }
  }

  /// Selects a tier from Chebyshev chunk distance to the nearest viewport
  /// center.
  pub fn from_distance(distance: i64) -> Self {
    match distance {
      0..=1 => Lod::High,
      2..=4 => Lod::Medium,
      5..=10 => Lod::Low,
      _ => Lod::Dormant,
    }
  }

  pub fn is_due(self, tick: u64) -> bool {
    tick % self.update_period() == 0
  }
}

/// Assigns an LOD tier to every chunk based on Chebyshev distance to the
/// nearest of a set of viewport-center chunk positions.
pub fn assign_lod(chunk: ChunkPos, viewport_centers: &[ChunkPos]) -> Lod {
  let distance = viewport_centers
    .iter()
    .map(|c| (c.cx - chunk.cx).abs().max((c.cy - chunk.cy).abs()))
    .min()
    .unwrap_or(i64::MAX);
  Lod::from_distance(distance)
}
