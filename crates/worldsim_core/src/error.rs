//! Boundary error types: manual `Display` + `std::error::Error` impls,
//! matching the teacher's own error style rather than pulling in
//! `thiserror`/`anyhow`.

use std::fmt;

/// Failure loading or parsing a `SimulationConfig` or patch.
#[derive(Debug)]
pub enum ConfigError {
  Io(std::io::Error),
  Parse(toml::de::Error),
  UnknownField { field: String },
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::Io(e) => write!(f, "failed to read config file: {e}"),
      ConfigError::Parse(e) => write!(f, "failed to parse config: {e}"),
      ConfigError::UnknownField { field } => write!(f, "unknown config field: {field}"),
    }
  }
}

impl std::error::Error for ConfigError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ConfigError::Io(e) => Some(e),
      ConfigError::Parse(e) => Some(e),
      ConfigError::UnknownField { .. } => None,
    }
  }
}

impl From<std::io::Error> for ConfigError {
  fn from(e: std::io::Error) -> Self {
    ConfigError::Io(e)
  }
}

impl From<toml::de::Error> for ConfigError {
  fn from(e: toml::de::Error) -> Self {
    ConfigError::Parse(e)
  }
}

/// Failure saving or loading a persisted world (spec §6).
#[derive(Debug)]
pub enum SaveError {
  Io(std::io::Error),
  Serialize(String),
  ChecksumMismatch { expected: u32, actual: u32 },
  VersionMismatch { expected: u32, actual: u32 },
}

impl fmt::Display for SaveError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SaveError::Io(e) => write!(f, "save I/O error: {e}"),
      SaveError::Serialize(msg) => write!(f, "save serialization error: {msg}"),
      SaveError::ChecksumMismatch { expected, actual } => write!(
        f,
        "save checksum mismatch: expected {expected:#010x}, got {actual:#010x}"
      ),
      SaveError::VersionMismatch { expected, actual } => write!(
        f,
        "save format version mismatch: expected {expected}, got {actual}"
      ),
    }
  }
}

impl std::error::Error for SaveError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      SaveError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<std::io::Error> for SaveError {
  fn from(e: std::io::Error) -> Self {
    SaveError::Io(e)
  }
}

/// Failure applying an external `Command` (spec §7), naming the offending
/// field so a transport adapter can report it back to the caller.
#[derive(Debug)]
pub struct CommandError {
  pub field: &'static str,
  pub message: String,
}

impl fmt::Display for CommandError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "invalid command field '{}': {}", self.field, self.message)
  }
}

impl std::error::Error for CommandError {}

/// Failure in the optional GPU offload path. Never surfaced to callers of
/// `Engine::tick` directly — the bridge falls back to the CPU kernel and
/// logs through this type instead.
#[derive(Debug)]
pub enum GpuError {
  Timeout,
  WorkerDisconnected,
  Shared(String),
}

impl fmt::Display for GpuError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GpuError::Timeout => write!(f, "GPU job timed out"),
      GpuError::WorkerDisconnected => write!(f, "GPU worker channel disconnected"),
      GpuError::Shared(msg) => write!(f, "shared memory error: {msg}"),
    }
  }
}

impl std::error::Error for GpuError {}
