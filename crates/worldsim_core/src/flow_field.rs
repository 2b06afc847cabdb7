//! Multi-source BFS distance field with bilinear sampling, rebuilt at a
//! rate-limited cadence (spec §4.11).
//!
//! Grounded on the teacher's connected-region flood fill used for dirty-
//! rect propagation (`simulation::dirty`), adapted from a boolean
//! reachability fill to a weighted BFS distance field with gradients.

use std::collections::VecDeque;

use crate::advection::sample_bilinear;
use crate::field::Field;

/// A BFS distance-from-nearest-source field over a dense grid, with
/// central-difference gradients and bilinear sampling (spec §4.11
/// "FlowField").
pub struct FlowField {
  distance: Field,
  width: u32,
  height: u32,
  ticks_since_rebuild: u64,
  pub rebuild_period: u64,
}

impl FlowField {
  pub fn new(width: u32, height: u32, rebuild_period: u64) -> Self {
    Self {
      distance: Field::new(width, height, f32::MAX),
      width,
      height,
      ticks_since_rebuild: u64::MAX,
      rebuild_period,
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  /// True once `rebuild_period` ticks have elapsed since the last rebuild
  /// (spec: "rate-limited rebuild").
  pub fn due_for_rebuild(&self) -> bool {
    self.ticks_since_rebuild >= self.rebuild_period
  }

  pub fn advance_tick(&mut self) {
    self.ticks_since_rebuild += 1;
  }

  /// Multi-source breadth-first fill of Chebyshev distance-to-nearest-
  /// source, in source order (deterministic regardless of traversal since
  /// BFS visits cells in non-decreasing distance order).
  pub fn rebuild(&mut self, sources: &[(u32, u32)]) {
    self.distance.fill(f32::MAX / 2.0);
    let mut visited = vec![false; (self.width * self.height) as usize];
    let mut queue: VecDeque<(u32, u32, u32)> = VecDeque::new();

    for &(sx, sy) in sources {
      if sx >= self.width || sy >= self.height {
        continue;
      }
      let idx = (sy * self.width + sx) as usize;
      if !visited[idx] {
        visited[idx] = true;
        self.distance.set(sx as i64, sy as i64, 0.0);
        queue.push_back((sx, sy, 0));
      }
    }

    while let Some((x, y, dist)) = queue.pop_front() {
      for dy in -1i32..=1 {
        for dx in -1i32..=1 {
          if dx == 0 && dy == 0 {
            continue;
          }
          let nx = x as i32 + dx;
          let ny = y as i32 + dy;
          if nx < 0 || ny < 0 || nx >= self.width as i32 || ny >= self.height as i32 {
            continue;
          }
          let (nx, ny) = (nx as u32, ny as u32);
          let idx = (ny * self.width + nx) as usize;
          if !visited[idx] {
            visited[idx] = true;
            let next_dist = dist + 1;
            self.distance.set(nx as i64, ny as i64, next_dist as f32);
            queue.push_back((nx, ny, next_dist));
          }
        }
      }
    }

    self.ticks_since_rebuild = 0;
  }

  pub fn distance_at(&self, x: i64, y: i64) -> f32 {
    self.distance.get(x, y)
  }

  /// Bilinearly interpolated distance at a fractional position (spec:
  /// `getAtInterpolated`).
  pub fn get_at_interpolated(&self, x: f32, y: f32) -> f32 {
    sample_bilinear(&self.distance, x, y)
  }

  /// Central-difference gradient, pointing toward increasing distance
  /// (away from the nearest source).
  pub fn gradient_at(&self, x: i64, y: i64) -> (f32, f32) {
    let gx = (self.distance.get(x + 1, y) - self.distance.get(x - 1, y)) * 0.5;
    let gy = (self.distance.get(x, y + 1) - self.distance.get(x, y - 1)) * 0.5;
    (gx, gy)
  }
}
