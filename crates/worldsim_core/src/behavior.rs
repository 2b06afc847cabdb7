//! Behavioral archetypes: per-field sensing weights selected by a
//! particle's seed.
//!
//! Grounded on the teacher's `MaterialInteraction` lookup table (a fixed
//! array indexed by material id, consulted every CA step), adapted to
//! index by the low three bits of a particle's seed instead of a cell's
//! material id.

/// One behavioral archetype: how strongly a particle is drawn toward or
/// away from each of the seven sensing terms (spec §4.4), plus its
/// baseline metabolism. `danger_weight`, `cost_weight`, and
/// `crowding_weight` are negative (the formula subtracts them);
/// `exploration_weight` is positive (the formula adds it).
#[derive(Clone, Copy, Debug)]
pub struct Archetype {
  pub name: &'static str,
  pub food_weight: f32,
  pub water_weight: f32,
  pub danger_weight: f32,
  pub trail_weight: f32,
  pub cost_weight: f32,
  pub crowding_weight: f32,
  pub exploration_weight: f32,
  pub metabolism: f32,
  pub max_speed: f32,
}

/// Eight archetypes indexed by `seed & 0b111` (spec §5.1).
pub const ARCHETYPES: [Archetype; 8] = [
  Archetype {
    name: "forager",
    food_weight: 1.0,
    water_weight: 0.4,
    danger_weight: -1.0,
    trail_weight: 0.1,
    cost_weight: -0.3,
    crowding_weight: -0.4,
    exploration_weight: 0.2,
    metabolism: 0.01,
    max_speed: 1.0,
  },
  Archetype {
    name: "grazer",
    food_weight: 0.8,
    water_weight: 0.7,
    danger_weight: -0.8,
    trail_weight: 0.05,
    cost_weight: -0.2,
    crowding_weight: -0.5,
    exploration_weight: 0.1,
    metabolism: 0.008,
    max_speed: 0.8,
  },
  Archetype {
    name: "scout",
    food_weight: 0.3,
    water_weight: 0.2,
    danger_weight: -0.5,
    trail_weight: -0.3,
    cost_weight: -0.2,
    crowding_weight: -0.2,
    exploration_weight: 0.6,
    metabolism: 0.012,
    max_speed: 1.4,
  },
  Archetype {
    name: "settler",
    food_weight: 0.6,
    water_weight: 0.6,
    danger_weight: -1.2,
    trail_weight: 0.6,
    cost_weight: -0.4,
    crowding_weight: -0.1,
    exploration_weight: 0.05,
    metabolism: 0.006,
    max_speed: 0.6,
  },
  Archetype {
    name: "predator",
    food_weight: 0.2,
    water_weight: 0.3,
    danger_weight: -0.2,
    trail_weight: 0.4,
    cost_weight: -0.3,
    crowding_weight: -0.3,
    exploration_weight: 0.3,
    metabolism: 0.015,
    max_speed: 1.3,
  },
  Archetype {
    name: "wanderer",
    food_weight: 0.5,
    water_weight: 0.5,
    danger_weight: -0.6,
    trail_weight: -0.1,
    cost_weight: -0.25,
    crowding_weight: -0.3,
    exploration_weight: 0.35,
    metabolism: 0.009,
    max_speed: 1.0,
  },
  Archetype {
    name: "hoarder",
    food_weight: 0.9,
    water_weight: 0.3,
    danger_weight: -0.7,
    trail_weight: 0.2,
    cost_weight: -0.5,
    crowding_weight: -0.35,
    exploration_weight: 0.05,
    metabolism: 0.007,
    max_speed: 0.7,
  },
  Archetype {
    name: "nomad",
    food_weight: 0.4,
    water_weight: 0.4,
    danger_weight: -0.4,
    trail_weight: -0.5,
    cost_weight: -0.2,
    crowding_weight: -0.15,
    exploration_weight: 0.5,
    metabolism: 0.011,
    max_speed: 1.2,
  },
];

/// Looks up the archetype for a particle's low three seed bits.
pub fn archetype_for(bits: u8) -> &'static Archetype {
  &ARCHETYPES[(bits & 0b111) as usize]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn archetype_lookup_is_total_over_three_bits() {
    for bits in 0u8..8 {
      let a = archetype_for(bits);
      assert!(!a.name.is_empty());
    }
  }

  #[test]
  fn high_bits_do_not_affect_archetype_selection() {
    let a = archetype_for(0b1111_1000 | 3);
    let b = archetype_for(3);
    assert_eq!(a.name, b.name);
  }

  #[test]
  fn aversion_terms_carry_a_negative_sign() {
    for archetype in ARCHETYPES {
      assert!(archetype.danger_weight < 0.0, "{}", archetype.name);
      assert!(archetype.cost_weight < 0.0, "{}", archetype.name);
      assert!(archetype.crowding_weight < 0.0, "{}", archetype.name);
      assert!(archetype.exploration_weight > 0.0, "{}", archetype.name);
    }
  }
}
