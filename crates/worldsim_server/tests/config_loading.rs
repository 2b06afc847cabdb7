//! Exercises the same config-loading path `main` uses, against a real file
//! on disk, without spawning the binary itself.

use std::io::Write;

use worldsim_core::config::SimulationConfig;

#[test]
fn a_full_toml_file_round_trips_through_load_from_path() {
  let cfg = SimulationConfig::default();
  let text = toml::to_string(&cfg).unwrap();

  let mut file = tempfile::NamedTempFile::new().unwrap();
  file.write_all(text.as_bytes()).unwrap();

  let loaded = SimulationConfig::load_from_path(file.path()).unwrap();
  assert_eq!(loaded, cfg);
}

#[test]
fn a_partial_toml_file_falls_back_to_defaults_for_missing_sections() {
  let mut file = tempfile::NamedTempFile::new().unwrap();
  file.write_all(b"tick_ms = 10\n").unwrap();

  let loaded = SimulationConfig::load_from_path(file.path()).unwrap();
  assert_eq!(loaded.tick_ms, 10);
  assert_eq!(loaded.advection, SimulationConfig::default().advection);
}

#[test]
fn a_missing_file_returns_an_error_main_can_fall_back_from() {
  let result = SimulationConfig::load_from_path(std::path::Path::new("/nonexistent/worldsim.toml"));
  assert!(result.is_err());
}
