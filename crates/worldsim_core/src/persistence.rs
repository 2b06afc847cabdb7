//! Minimal save record: just enough state to deterministically resume a
//! run (seed, tick, and live particles) plus an integrity checksum (spec
//! §6). Terrain and field contents are not persisted — they regenerate
//! deterministically from the seed on reload.
//!
//! Grounded on the teacher's binary `Header`/`PageTableEntry` format
//! (`persistence::format`) — fixed-width little-endian fields, manual
//! `write_to`/`read_from`, and a checksum guarding each record — adapted
//! from a page-table-indexed multi-chunk save file to a single flat
//! particle-array record, and from CRC-8 to a dependency-free FNV-1a
//! rolling hash over the whole body.

use std::io::{self, Read, Write};

use crate::error::SaveError;
use crate::particle::{Particle, ParticleState, ParticleStore};

pub const MAGIC: u32 = 0x5753_494D; // "WSIM"
pub const VERSION: u32 = 1;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// FNV-1a 32-bit rolling hash, used as the save record's integrity
/// checksum in place of the teacher's CRC-8 (spec §9: dependency-free
/// checksum).
pub fn fnv1a(bytes: &[u8]) -> u32 {
  let mut hash = FNV_OFFSET_BASIS;
  for &b in bytes {
    hash ^= b as u32;
    hash = hash.wrapping_mul(FNV_PRIME);
  }
  hash
}

fn state_to_u8(state: ParticleState) -> u8 {
  match state {
    ParticleState::Seeking => 0,
    ParticleState::Moving => 1,
    ParticleState::Consuming => 2,
    ParticleState::Fleeing => 3,
    ParticleState::Reproducing => 4,
    ParticleState::Idle => 5,
  }
}

fn state_from_u8(v: u8) -> ParticleState {
  match v {
    0 => ParticleState::Seeking,
    1 => ParticleState::Moving,
    2 => ParticleState::Consuming,
    3 => ParticleState::Fleeing,
    4 => ParticleState::Reproducing,
    _ => ParticleState::Idle,
  }
}

fn write_particle<W: Write>(p: &Particle, w: &mut W) -> io::Result<()> {
  w.write_all(&p.id.to_le_bytes())?;
  w.write_all(&p.x.to_le_bytes())?;
  w.write_all(&p.y.to_le_bytes())?;
  w.write_all(&p.vx.to_le_bytes())?;
  w.write_all(&p.vy.to_le_bytes())?;
  w.write_all(&p.energy.to_le_bytes())?;
  w.write_all(&p.seed.to_le_bytes())?;
  w.write_all(&[p.alive as u8])?;
  w.write_all(&[state_to_u8(p.state)])?;
  w.write_all(&p.last_reproduction_tick.to_le_bytes())?;
  Ok(())
}

fn read_particle<R: Read>(r: &mut R) -> io::Result<Particle> {
  let mut id_buf = [0u8; 8];
  r.read_exact(&mut id_buf)?;
  let id = u64::from_le_bytes(id_buf);

  let mut f32_buf = [0u8; 4];
  r.read_exact(&mut f32_buf)?;
  let x = f32::from_le_bytes(f32_buf);
  r.read_exact(&mut f32_buf)?;
  let y = f32::from_le_bytes(f32_buf);
  r.read_exact(&mut f32_buf)?;
  let vx = f32::from_le_bytes(f32_buf);
  r.read_exact(&mut f32_buf)?;
  let vy = f32::from_le_bytes(f32_buf);
  r.read_exact(&mut f32_buf)?;
  let energy = f32::from_le_bytes(f32_buf);

  let mut u64_buf = [0u8; 8];
  r.read_exact(&mut u64_buf)?;
  let seed = u64::from_le_bytes(u64_buf);

  let mut byte = [0u8; 1];
  r.read_exact(&mut byte)?;
  let alive = byte[0] != 0;
  r.read_exact(&mut byte)?;
  let state = state_from_u8(byte[0]);

  r.read_exact(&mut u64_buf)?;
  let last_reproduction_tick = u64::from_le_bytes(u64_buf);

  let mut particle = Particle::new(id, x, y, seed, energy);
  particle.vx = vx;
  particle.vy = vy;
  particle.alive = alive;
  particle.state = state;
  particle.last_reproduction_tick = last_reproduction_tick;
  Ok(particle)
}

/// Serializes `store` and `seed`/`tick` into the minimal save record
/// format, appending an FNV-1a checksum over the header and body.
pub fn save_to_bytes(store: &ParticleStore, seed: u64, tick: u64) -> Result<Vec<u8>, SaveError> {
  let mut body = Vec::new();
  body
    .write_all(&MAGIC.to_le_bytes())
    .map_err(SaveError::Io)?;
  body
    .write_all(&VERSION.to_le_bytes())
    .map_err(SaveError::Io)?;
  body.write_all(&seed.to_le_bytes()).map_err(SaveError::Io)?;
  body.write_all(&tick.to_le_bytes()).map_err(SaveError::Io)?;

  let alive: Vec<&Particle> = store.iter_ascending_ids().filter(|p| p.alive).collect();
  body
    .write_all(&(alive.len() as u32).to_le_bytes())
    .map_err(SaveError::Io)?;
  for p in alive {
    write_particle(p, &mut body).map_err(SaveError::Io)?;
  }

  let checksum = fnv1a(&body);
  body.write_all(&checksum.to_le_bytes()).map_err(SaveError::Io)?;
  Ok(body)
}

/// Loaded save record: the fields needed to deterministically resume a
/// run. Terrain is not included — the caller regenerates it from `seed`.
pub struct LoadedSave {
  pub seed: u64,
  pub tick: u64,
  pub particles: Vec<Particle>,
}

/// Deserializes a save record, rejecting it outright on checksum mismatch
/// rather than attempting partial recovery (spec §6 invariant).
pub fn load_from_bytes(bytes: &[u8]) -> Result<LoadedSave, SaveError> {
  if bytes.len() < 4 {
    return Err(SaveError::Serialize("record too short".to_string()));
  }
  let (body, checksum_bytes) = bytes.split_at(bytes.len() - 4);
  let expected = u32::from_le_bytes(checksum_bytes.try_into().unwrap());
  let actual = fnv1a(body);
  if expected != actual {
    return Err(SaveError::ChecksumMismatch { expected, actual });
  }

  let mut cursor = io::Cursor::new(body);
  let mut u32_buf = [0u8; 4];
  cursor.read_exact(&mut u32_buf).map_err(SaveError::Io)?;
  let magic = u32::from_le_bytes(u32_buf);
  if magic != MAGIC {
    return Err(SaveError::Serialize(format!(
      "bad magic: {magic:#010x}"
    )));
  }
  cursor.read_exact(&mut u32_buf).map_err(SaveError::Io)?;
  let version = u32::from_le_bytes(u32_buf);
  if version != VERSION {
    return Err(SaveError::VersionMismatch {
      expected: VERSION,
      actual: version,
    });
  }

  let mut u64_buf = [0u8; 8];
  cursor.read_exact(&mut u64_buf).map_err(SaveError::Io)?;
  let seed = u64::from_le_bytes(u64_buf);
  cursor.read_exact(&mut u64_buf).map_err(SaveError::Io)?;
  let tick = u64::from_le_bytes(u64_buf);

  cursor.read_exact(&mut u32_buf).map_err(SaveError::Io)?;
  let count = u32::from_le_bytes(u32_buf);

  let mut particles = Vec::with_capacity(count as usize);
  for _ in 0..count {
    particles.push(read_particle(&mut cursor).map_err(SaveError::Io)?);
  }

  Ok(LoadedSave {
    seed,
    tick,
    particles,
  })
}
