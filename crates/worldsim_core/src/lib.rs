//! Tick engine for an agent-based, chunked world simulator: dense scalar
//! fields, paged chunks, a flat particle population, and the scheduling,
//! persistence, and transport surfaces wired around them.
//!
//! Module layout mirrors the teacher's `bevy_pixel_world` crate: each
//! subsystem is its own top-level module, re-exported flat from here so
//! callers write `worldsim_core::Engine` rather than reaching through
//! submodule paths.

pub mod advection;
pub mod behavior;
pub mod biome;
pub mod chunk;
pub mod chunk_manager;
pub mod command;
pub mod community;
pub mod config;
pub mod coords;
pub mod engine;
pub mod error;
pub mod field;
pub mod flow_field;
pub mod gpu_bridge;
pub mod lod;
pub mod metrics;
pub mod noise;
pub mod particle;
pub mod particle_engine;
pub mod persistence;
pub mod reaction;
pub mod scheduler;
pub mod snapshot;
pub mod structure;
pub mod thermostat;

pub use chunk::{Chunk, ChunkLifecycle, FieldKind};
pub use chunk_manager::{ChunkManager, TerrainParams};
pub use command::Command;
pub use config::SimulationConfig;
pub use coords::{ChunkPos, WorldRect};
pub use engine::Engine;
pub use error::{CommandError, ConfigError, GpuError, SaveError};
pub use field::Field;
pub use metrics::Metrics;
pub use particle::{Particle, ParticleState, ParticleStore};
pub use snapshot::Snapshot;
