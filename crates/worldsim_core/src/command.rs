//! Inbound command enum: a closed, transport-agnostic set of operations
//! external callers can issue against a running `Engine` (spec §7).
//!
//! Grounded on the teacher's `WorldCommand`-style event enum consumed by a
//! single dispatch system (kept as a plain enum matched in one place
//! rather than a trait-object command pattern, per spec §9 guidance
//! against unnecessary subtype hierarchies).

use crate::config::SimulationConfigPatch;
use crate::coords::WorldRect;
use crate::error::CommandError;

/// One external command (spec §7). Validated before being handed to
/// `Engine::apply_command`.
#[derive(Clone, Debug)]
pub enum Command {
  Start,
  Pause,
  Resume,
  Reset { seed: u64 },
  SetConfig(SimulationConfigPatch),
  SpawnParticles { x: f32, y: f32, count: u32, seed: u64 },
  SubscribeField { field_name: String },
  ViewportUpdate { viewport: WorldRect },
  RequestChunks { cx: i64, cy: i64, radius: u32 },
}

/// Known field names a `SubscribeField` command may request (spec §7).
const KNOWN_FIELD_NAMES: &[&str] = &[
  "food",
  "water",
  "cost",
  "danger",
  "trees",
  "stone",
  "trail0",
  "trail1",
  "trail2",
  "trail3",
  "population",
  "labor",
];

/// Validates a command's field values before it is applied, reporting the
/// offending field name (spec §9 `CommandError { field }`).
pub fn validate(command: &Command) -> Result<(), CommandError> {
  match command {
    Command::SpawnParticles { count, .. } if *count == 0 => Err(CommandError {
      field: "count",
      message: "must spawn at least one particle".to_string(),
    }),
    Command::SubscribeField { field_name } if !KNOWN_FIELD_NAMES.contains(&field_name.as_str()) => {
      Err(CommandError {
        field: "field_name",
        message: format!("unknown field '{field_name}'"),
      })
    }
    Command::ViewportUpdate { viewport } if viewport.width == 0 || viewport.height == 0 => {
      Err(CommandError {
        field: "viewport",
        message: "viewport must have nonzero width and height".to_string(),
      })
    }
    Command::RequestChunks { radius, .. } if *radius > 64 => Err(CommandError {
      field: "radius",
      message: "radius exceeds the maximum supported chunk request radius (64)".to_string(),
    }),
    _ => Ok(()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn spawn_with_zero_count_is_rejected() {
    let cmd = Command::SpawnParticles {
      x: 0.0,
      y: 0.0,
      count: 0,
      seed: 1,
    };
    let err = validate(&cmd).unwrap_err();
    assert_eq!(err.field, "count");
  }

  #[test]
  fn subscribe_unknown_field_is_rejected() {
    let cmd = Command::SubscribeField {
      field_name: "not_a_field".to_string(),
    };
    let err = validate(&cmd).unwrap_err();
    assert_eq!(err.field, "field_name");
  }

  #[test]
  fn subscribe_known_field_is_accepted() {
    let cmd = Command::SubscribeField {
      field_name: "food".to_string(),
    };
    assert!(validate(&cmd).is_ok());
  }

  #[test]
  fn oversized_chunk_request_radius_is_rejected() {
    let cmd = Command::RequestChunks {
      cx: 0,
      cy: 0,
      radius: 1000,
    };
    assert!(validate(&cmd).is_err());
  }

  #[test]
  fn start_pause_resume_need_no_validation() {
    assert!(validate(&Command::Start).is_ok());
    assert!(validate(&Command::Pause).is_ok());
    assert!(validate(&Command::Resume).is_ok());
  }
}
