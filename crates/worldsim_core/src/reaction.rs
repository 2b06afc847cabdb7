//! Data-driven reaction rule table: flat rows, no subtype hierarchy (spec
//! §9 guidance).
//!
//! Grounded on the teacher's `MaterialInteraction` table-driven cell
//! reactions (`materials::interactions`, a flat array of input/output/rate
//! rows scanned per cell), adapted to consult a shared labor budget and to
//! run over every field kind in a chunk rather than a single material
//! grid.

use crate::chunk::{Chunk, FieldKind};
use crate::coords::CHUNK_SIZE;

/// One reaction row: consumes `input_rate` of `input` above
/// `input_threshold`, produces `output_rate` of `output`, and spends
/// `labor_cost` from the shared per-tick labor budget.
#[derive(Clone, Copy, Debug)]
pub struct ReactionRule {
  pub name: &'static str,
  pub priority: i32,
  pub input: FieldKind,
  pub input_threshold: f32,
  pub input_rate: f32,
  pub output: FieldKind,
  pub output_rate: f32,
  pub labor_cost: f32,
}

/// Default rule set (spec §4.6 examples: foraging depletes food and feeds
/// labor; construction spends stone and labor to raise population
/// capacity).
pub fn default_rules() -> Vec<ReactionRule> {
  vec![
    ReactionRule {
      name: "forage",
      priority: 10,
      input: FieldKind::Food,
      input_threshold: 0.1,
      input_rate: 0.5,
      output: FieldKind::Labor,
      output_rate: 0.49,
      labor_cost: 0.0,
    },
    ReactionRule {
      name: "build",
      priority: 5,
      input: FieldKind::Stone,
      input_threshold: 0.2,
      input_rate: 0.1,
      output: FieldKind::Population,
      output_rate: 0.05,
      labor_cost: 0.2,
    },
  ]
}

/// Flat rule-table scanner. Holds no per-chunk state; a fresh instance (or
/// a shared `&ReactionEngine`) can be reused across chunks.
pub struct ReactionEngine {
  rules: Vec<ReactionRule>,
}

impl ReactionEngine {
  pub fn new(rules: Vec<ReactionRule>) -> Self {
    let mut rules = rules;
    // Highest priority first; ties keep their table order (stable sort).
    rules.sort_by(|a, b| b.priority.cmp(&a.priority));
    Self { rules }
  }

  /// Applies every rule, in priority order, to every cell of `chunk`, in
  /// ascending `(y, x)` order, spending from `labor_budget` until it is
  /// exhausted. Returns the remaining budget.
  pub fn apply_to_chunk(&self, chunk: &mut Chunk, labor_budget: f32) -> f32 {
    let mut budget = labor_budget;
    let size = CHUNK_SIZE;

    for rule in &self.rules {
      for y in 0..size {
        for x in 0..size {
          if budget < rule.labor_cost {
            continue;
          }
          let Some(fields) = chunk.fields() else {
            return budget;
          };
          let input_index = field_index(rule.input);
          let available = fields[input_index].get(x, y);
          if available < rule.input_threshold {
            continue;
          }
          let taken = rule.input_rate.min(available);
          if taken <= 0.0 {
            continue;
          }

          if let Some(fields) = chunk.fields_mut() {
            fields[input_index].add(x, y, -taken);
            let output_index = field_index(rule.output);
            fields[output_index].add(x, y, rule.output_rate * (taken / rule.input_rate));
          }
          budget -= rule.labor_cost;
        }
      }
    }
    budget
  }
}

fn field_index(kind: FieldKind) -> usize {
  FieldKind::ALL.iter().position(|&k| k == kind).unwrap()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::coords::ChunkPos;

  #[test]
  fn rules_sorted_by_descending_priority() {
    let engine = ReactionEngine::new(default_rules());
    assert!(engine.rules[0].priority >= engine.rules[1].priority);
  }

  #[test]
  fn forage_rule_depletes_food_and_produces_labor() {
    let mut chunk = Chunk::new_dormant(ChunkPos::new(0, 0));
    chunk.activate();
    chunk.field_mut(FieldKind::Food).unwrap().set(0, 0, 0.3);

    let engine = ReactionEngine::new(vec![ReactionRule {
      name: "forage",
      priority: 10,
      input: FieldKind::Food,
      input_threshold: 0.1,
      input_rate: 0.1,
      output: FieldKind::Labor,
      output_rate: 0.49,
      labor_cost: 0.0,
    }]);

    // One full cell pass at input_rate=0.1 against a starting 0.3 drains it
    // across the first two applications (0.3 -> 0.2 -> 0.1), the third
    // application for the same cell is skipped by the loop structure since
    // each (rule, cell) pair runs exactly once per `apply_to_chunk` call.
    let remaining = engine.apply_to_chunk(&mut chunk, 100.0);
    assert_eq!(remaining, 100.0);
    let food = chunk.field(FieldKind::Food).unwrap().get(0, 0);
    assert!((food - 0.2).abs() < 1e-5);
    let labor = chunk.field(FieldKind::Labor).unwrap().get(0, 0);
    assert!(labor > 0.0);
  }

  #[test]
  fn labor_budget_halts_further_reactions() {
    let mut chunk = Chunk::new_dormant(ChunkPos::new(0, 0));
    chunk.activate();
    for i in 0..5 {
      chunk.field_mut(FieldKind::Stone).unwrap().set(i, 0, 1.0);
    }
    let engine = ReactionEngine::new(vec![ReactionRule {
      name: "build",
      priority: 1,
      input: FieldKind::Stone,
      input_threshold: 0.1,
      input_rate: 0.5,
      output: FieldKind::Population,
      output_rate: 1.0,
      labor_cost: 1.0,
    }]);
    let remaining = engine.apply_to_chunk(&mut chunk, 2.5);
    assert!(remaining < 1.0);
    assert!(remaining >= 0.0);
  }
}
