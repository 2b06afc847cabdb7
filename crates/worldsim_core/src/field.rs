//! Dense double-buffered scalar field with diffusion/decay/growth.
//!
//! Mirrors the teacher's `Surface<T>` dense-grid storage, generalized from a
//! `Pixel` payload to a scalar `f32` payload, and its rayon-parallel CA
//! stepping generalized to per-row parallel diffusion.

use rayon::prelude::*;

/// Optional logistic growth parameters (spec §4.1).
#[derive(Clone, Copy, Debug)]
pub struct Growth {
  /// Growth rate `r`.
  pub rate: f32,
  /// Carrying capacity `K`.
  pub carrying_capacity: f32,
}

/// A dense W×H grid of `f32` values with double-buffered diffusion/decay and
/// optional in-place logistic growth.
#[derive(Clone, Debug)]
pub struct Field {
  width: u32,
  height: u32,
  current: Vec<f32>,
  next: Vec<f32>,
  /// Diffusion coefficient δ ∈ [0, 1].
  pub diffusion: f32,
  /// Decay coefficient λ ∈ [0, 1].
  pub decay: f32,
  pub max_value: f32,
  pub growth: Option<Growth>,
}

impl Field {
  pub fn new(width: u32, height: u32, max_value: f32) -> Self {
    let len = (width as usize) * (height as usize);
    Self {
      width,
      height,
      current: vec![0.0; len],
      next: vec![0.0; len],
      diffusion: 0.0,
      decay: 0.0,
      max_value,
      growth: None,
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  #[inline]
  fn index(&self, x: i64, y: i64) -> Option<usize> {
    if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
      None
    } else {
      Some(y as usize * self.width as usize + x as usize)
    }
  }

  /// Reads a cell, clamped to 0 on out-of-bounds.
  #[inline]
  pub fn get(&self, x: i64, y: i64) -> f32 {
    self.index(x, y).map(|i| self.current[i]).unwrap_or(0.0)
  }

  /// Writes a cell, clamped to `[0, max_value]`. Out-of-bounds is a silent
  /// no-op.
  pub fn set(&mut self, x: i64, y: i64, v: f32) {
    if let Some(i) = self.index(x, y) {
      self.current[i] = v.clamp(0.0, self.max_value);
    }
  }

  /// Adds a delta to a cell, clamped to `[0, max_value]`. Out-of-bounds is a
  /// silent no-op.
  pub fn add(&mut self, x: i64, y: i64, delta: f32) {
    if let Some(i) = self.index(x, y) {
      self.current[i] = (self.current[i] + delta).clamp(0.0, self.max_value);
    }
  }

  pub fn fill(&mut self, v: f32) {
    let v = v.clamp(0.0, self.max_value);
    self.current.iter_mut().for_each(|c| *c = v);
  }

  pub fn get_sum(&self) -> f64 {
    self.current.iter().map(|&v| v as f64).sum()
  }

  pub fn get_average(&self) -> f64 {
    if self.current.is_empty() {
      0.0
    } else {
      self.get_sum() / self.current.len() as f64
    }
  }

  pub fn get_max(&self) -> f32 {
    self.current.iter().copied().fold(0.0, f32::max)
  }

  /// Returns a copy of the current buffer (spec §4.1: `snapshot()`).
  pub fn snapshot(&self) -> Vec<f32> {
    self.current.clone()
  }

  /// Overwrites the current buffer with externally-computed values (used
  /// by `GpuBridge` to write back an offloaded diffusion/decay result).
  /// Panics if `data.len()` doesn't match the field's cell count.
  pub fn load_snapshot(&mut self, data: Vec<f32>) {
    assert_eq!(data.len(), self.current.len());
    self.current = data;
  }

  /// One fused diffusion+decay step: averages up to eight in-bounds Moore
  /// neighbors, blends toward that average by `diffusion`, applies decay, and
  /// swaps buffers. Per-row parallel since each output cell is a pure
  /// function of the (stable) current buffer — order-independent, hence
  /// deterministic regardless of how rows are scheduled across threads.
  pub fn diffuse_decay_step(&mut self) {
    let width = self.width as i64;
    let height = self.height as i64;
    let diffusion = self.diffusion;
    let decay = self.decay;
    let current = &self.current;

    self
      .next
      .par_chunks_mut(self.width as usize)
      .enumerate()
      .for_each(|(y, row)| {
        let y = y as i64;
        for x in 0..width {
          let here = current[(y * width + x) as usize];
          let mut sum = 0.0f32;
          let mut count = 0u32;
          for dy in -1..=1i64 {
            for dx in -1..=1i64 {
              if dx == 0 && dy == 0 {
                continue;
              }
              let (nx, ny) = (x + dx, y + dy);
              if nx >= 0 && ny >= 0 && nx < width && ny < height {
                sum += current[(ny * width + nx) as usize];
                count += 1;
              }
            }
          }
          let avg = if count > 0 { sum / count as f32 } else { 0.0 };
          let diffused = here + diffusion * (avg - here);
          let decayed = diffused * (1.0 - decay);
          row[x as usize] = decayed.clamp(0.0, self.max_value);
        }
      });

    std::mem::swap(&mut self.current, &mut self.next);
  }

  /// In-place logistic growth: `v <- clamp(v + r*v*(1 - v/K), 0, maxValue)`.
  /// No neighbor coupling, so it runs directly on `current`.
  pub fn growth_step(&mut self) {
    let Some(Growth { rate, carrying_capacity }) = self.growth else {
      return;
    };
    let max_value = self.max_value;
    self.current.par_iter_mut().for_each(|v| {
      let grown = *v + rate * *v * (1.0 - *v / carrying_capacity);
      *v = grown.clamp(0.0, max_value);
    });
  }

  /// Seeds the field from a base value plus noise amplitude, using a linear
  /// congruential sequence (spec §4.1 noise initializer), then relaxes with
  /// three diffusion sweeps.
  pub fn noise_init(&mut self, base: f32, amplitude: f32, seed: u64) {
    let mut state = seed;
    const LCG_A: u64 = 1103515245;
    const LCG_C: u64 = 12345;
    const LCG_M: u64 = 1 << 31;

    for v in self.current.iter_mut() {
      state = (LCG_A.wrapping_mul(state).wrapping_add(LCG_C)) % LCG_M;
      let u = state as f64 / LCG_M as f64;
      let value = base + (u as f32 - 0.5) * 2.0 * amplitude;
      *v = value.clamp(0.0, self.max_value);
    }

    let saved_diffusion = self.diffusion;
    let saved_decay = self.decay;
    self.diffusion = 0.5;
    self.decay = 0.0;
    for _ in 0..3 {
      self.diffuse_decay_step();
    }
    self.diffusion = saved_diffusion;
    self.decay = saved_decay;
  }
}
