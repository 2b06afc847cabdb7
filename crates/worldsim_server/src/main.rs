//! Headless tick-loop binary hosting `worldsim_core::Engine`.
//!
//! Grounded on the teacher's app-bootstrap binary: parse CLI flags, load a
//! TOML config with hardcoded defaults as fallback, init logging, then run
//! a fixed-period loop sleeping off whatever time the tick didn't use.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use worldsim_core::config::SimulationConfig;
use worldsim_core::Engine;

/// Headless tick loop for the worldsim engine.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
  /// Path to a TOML config file. Missing fields fall back to defaults;
  /// a missing file falls back to `SimulationConfig::default()`.
  #[arg(long)]
  config: Option<PathBuf>,

  /// Number of ticks to run before exiting. Omit to run forever.
  #[arg(long)]
  ticks: Option<u64>,
}

fn main() {
  env_logger::init();
  let cli = Cli::parse();

  let config = match &cli.config {
    Some(path) => match SimulationConfig::load_from_path(path) {
      Ok(cfg) => cfg,
      Err(e) => {
        log::warn!("failed to load config from {path:?}: {e}, falling back to defaults");
        SimulationConfig::default()
      }
    },
    None => SimulationConfig::default(),
  };

  let tick_period = Duration::from_millis(config.tick_ms);
  let mut engine = Engine::new(config);
  engine.start();

  let mut ticks_run: u64 = 0;
  loop {
    if let Some(limit) = cli.ticks {
      if ticks_run >= limit {
        break;
      }
    }

    let start = Instant::now();
    if engine.is_running() {
      let report = engine.tick();
      log::debug!(
        "tick {} ran={} skipped={} total_ms={:.2}",
        engine.tick_count(),
        report.ran.len(),
        report.skipped.len(),
        report.total_ms
      );
    }
    ticks_run += 1;

    let elapsed = start.elapsed();
    if elapsed < tick_period {
      thread::sleep(tick_period - elapsed);
    }
  }
}
