//! Pure biome classification from climate parameters.
//!
//! Generalizes the teacher's single solid/void noise-threshold terrain
//! classification (`seeding::noise::MaterialSeeder`) into the spec's
//! multi-band, nearest-center biome table.

/// Closed enumeration of biome classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Biome {
  Ocean,
  Beach,
  Lake,
  Wetland,
  Desert,
  Grassland,
  Forest,
  Swamp,
  Mountain,
  Tundra,
  Snow,
}

impl Biome {
  /// Stores as a single byte in a chunk's biome map (spec §3: "biome map
  /// (S² bytes)").
  pub fn to_u8(self) -> u8 {
    match self {
      Biome::Ocean => 0,
      Biome::Beach => 1,
      Biome::Lake => 2,
      Biome::Wetland => 3,
      Biome::Desert => 4,
      Biome::Grassland => 5,
      Biome::Forest => 6,
      Biome::Swamp => 7,
      Biome::Mountain => 8,
      Biome::Tundra => 9,
      Biome::Snow => 10,
    }
  }

  pub fn from_u8(v: u8) -> Self {
    match v {
      0 => Biome::Ocean,
      1 => Biome::Beach,
      2 => Biome::Lake,
      3 => Biome::Wetland,
      4 => Biome::Desert,
      5 => Biome::Grassland,
      6 => Biome::Forest,
      7 => Biome::Swamp,
      8 => Biome::Mountain,
      9 => Biome::Tundra,
      _ => Biome::Snow,
    }
  }

  /// Base tree density in `[0, 1]`, used by terrain seeding for tree
  /// placement (spec §4.2).
  pub fn tree_density(self) -> f32 {
    match self {
      Biome::Forest => 0.55,
      Biome::Grassland => 0.12,
      Biome::Swamp => 0.2,
      Biome::Tundra => 0.05,
      _ => 0.0,
    }
  }

  /// Food-seeding multiplier (spec §4.2: "forest/grassland x1.2;
  /// desert/mountain x0.3; water biomes -> 0; wetland/swamp x0.8").
  pub fn food_multiplier(self) -> f32 {
    match self {
      Biome::Forest | Biome::Grassland => 1.2,
      Biome::Desert | Biome::Mountain => 0.3,
      Biome::Ocean | Biome::Lake => 0.0,
      Biome::Wetland | Biome::Swamp => 0.8,
      Biome::Beach => 0.5,
      Biome::Tundra | Biome::Snow => 0.4,
    }
  }

  fn walkable_center(self) -> (f32, f32, f32) {
    // (temperature, moisture, elevation) centers for the walkable table.
    match self {
      Biome::Desert => (0.85, 0.15, 0.45),
      Biome::Grassland => (0.55, 0.45, 0.4),
      Biome::Forest => (0.5, 0.65, 0.45),
      Biome::Swamp => (0.55, 0.85, 0.35),
      Biome::Mountain => (0.4, 0.4, 0.85),
      Biome::Tundra => (0.15, 0.35, 0.5),
      Biome::Snow => (0.05, 0.2, 0.6),
      Biome::Ocean | Biome::Beach | Biome::Lake | Biome::Wetland => (0.5, 0.5, 0.5),
    }
  }

  fn walkable_bounds(self) -> ((f32, f32), (f32, f32), (f32, f32)) {
    match self {
      Biome::Desert => ((0.65, 1.0), (0.0, 0.3), (0.3, 0.6)),
      Biome::Grassland => ((0.35, 0.75), (0.3, 0.6), (0.25, 0.55)),
      Biome::Forest => ((0.3, 0.7), (0.5, 0.85), (0.3, 0.6)),
      Biome::Swamp => ((0.4, 0.7), (0.7, 1.0), (0.18, 0.5)),
      Biome::Mountain => ((0.0, 0.6), (0.0, 0.7), (0.7, 1.0)),
      Biome::Tundra => ((0.0, 0.3), (0.2, 0.5), (0.35, 0.65)),
      Biome::Snow => ((0.0, 0.15), (0.0, 0.4), (0.45, 1.0)),
      Biome::Ocean | Biome::Beach | Biome::Lake | Biome::Wetland => {
        ((0.0, 1.0), (0.0, 1.0), (0.0, 1.0))
      }
    }
  }

  const WALKABLE: [Biome; 7] = [
    Biome::Desert,
    Biome::Grassland,
    Biome::Forest,
    Biome::Swamp,
    Biome::Mountain,
    Biome::Tundra,
    Biome::Snow,
  ];
}

/// Pure, stateless biome resolver (spec §4.3).
pub struct BiomeResolver;

impl BiomeResolver {
  /// Resolves climate parameters `(temperature, moisture, elevation,
  /// continentality) in [0,1]^4` to a biome id. Total over the full input
  /// domain (spec §8 property 7).
  pub fn resolve(temperature: f32, moisture: f32, elevation: f32, continentality: f32) -> Biome {
    let sea_level = 0.28 + (1.0 - continentality) * 0.12;
    let elev_bias = elevation + continentality * 0.25 - (1.0 - continentality) * 0.05;

    if elev_bias < sea_level {
      return Biome::Ocean;
    }
    if elev_bias < sea_level + 0.04 + (1.0 - continentality) * 0.03 {
      return Biome::Beach;
    }

    let lake_level = (0.32 - 0.08 * continentality).max(0.18);
    let moisture_bias = (moisture + (1.0 - elevation) * 0.2 + continentality * 0.1).min(1.0);

    if elevation < lake_level && moisture_bias > 0.55 {
      return Biome::Lake;
    }
    if elevation < lake_level + 0.08 && moisture_bias > 0.55 {
      return Biome::Wetland;
    }

    let mut best: Option<(Biome, f32)> = None;
    for &biome in Biome::WALKABLE.iter() {
      let ((tmin, tmax), (mmin, mmax), (emin, emax)) = biome.walkable_bounds();
      if temperature >= tmin
        && temperature <= tmax
        && moisture >= mmin
        && moisture <= mmax
        && elevation >= emin
        && elevation <= emax
      {
        let (ct, cm, ce) = biome.walkable_center();
        let dist = (temperature - ct).abs() + (moisture - cm).abs() + (elevation - ce).abs();
        if best.map(|(_, d)| dist < d).unwrap_or(true) {
          best = Some((biome, dist));
        }
      }
    }

    if let Some((biome, _)) = best {
      return biome;
    }

    // Fallback: nearest center by squared L2 distance (spec §4.3 step 4).
    let mut best: Option<(Biome, f32)> = None;
    for &biome in Biome::WALKABLE.iter() {
      let (ct, cm, ce) = biome.walkable_center();
      let dist = (temperature - ct).powi(2) + (moisture - cm).powi(2) + (elevation - ce).powi(2);
      if best.map(|(_, d)| dist < d).unwrap_or(true) {
        best = Some((biome, dist));
      }
    }
    best.map(|(b, _)| b).unwrap_or(Biome::Grassland)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn resolver_is_total_over_domain() {
    let mut rng_state = 12345u64;
    for _ in 0..2000 {
      rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
      let t = ((rng_state >> 33) as f32 / u32::MAX as f32).clamp(0.0, 1.0);
      rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
      let m = ((rng_state >> 33) as f32 / u32::MAX as f32).clamp(0.0, 1.0);
      rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
      let e = ((rng_state >> 33) as f32 / u32::MAX as f32).clamp(0.0, 1.0);
      rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
      let c = ((rng_state >> 33) as f32 / u32::MAX as f32).clamp(0.0, 1.0);
      // Resolving must not panic and always returns a defined variant.
      let _ = BiomeResolver::resolve(t, m, e, c);
    }
  }

  #[test]
  fn low_elevation_is_ocean() {
    assert_eq!(BiomeResolver::resolve(0.5, 0.5, 0.0, 0.5), Biome::Ocean);
  }

  #[test]
  fn high_elevation_mountains_are_not_ocean() {
    let b = BiomeResolver::resolve(0.3, 0.3, 0.95, 0.5);
    assert_ne!(b, Biome::Ocean);
  }

  #[test]
  fn resolver_is_deterministic() {
    let a = BiomeResolver::resolve(0.4, 0.6, 0.5, 0.3);
    let b = BiomeResolver::resolve(0.4, 0.6, 0.5, 0.3);
    assert_eq!(a, b);
  }
}
