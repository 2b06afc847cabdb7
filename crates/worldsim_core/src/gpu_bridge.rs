//! Optional GPU offload worker: a dedicated thread reachable over a
//! shared-memory signaling-word protocol, with permanent fault-disable and
//! a CPU fallback that is bit-for-bit the same kernel the worker runs.
//!
//! Grounded on two teacher pieces: the atomic-counter signaling protocol of
//! `noise_ipc::NoiseIpc` (`crates/noise_ipc/src/native.rs` — a one-byte
//! counter flips to signal a new payload is ready, readers compare against
//! their last-seen value) and the dedicated-thread, `async-channel`
//! command/result dispatcher of `persistence::io_worker::native`
//! (`NativeIoDispatcher`). This bridge submits diffusion/decay kernels
//! instead of save-file I/O, and a real GPU backend is out of scope here —
//! the worker thread runs the identical CPU kernel the fallback path uses,
//! so offloaded and fallback runs always agree exactly.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use async_channel::{Receiver, Sender};
use shared_memory::{Shmem, ShmemConf};

use crate::error::GpuError;
use crate::metrics::GpuOutcome;

/// A diffusion/decay job: a dense grid plus its coefficients, large enough
/// to be worth offloading (spec §4.8 `minCellsForOffload`).
#[derive(Clone)]
pub struct DiffusionJob {
  pub width: u32,
  pub height: u32,
  pub diffusion: f32,
  pub decay: f32,
  pub max_value: f32,
  pub data: Vec<f32>,
}

/// The fused diffusion+decay kernel, identical whether it runs on the
/// worker thread (emulating GPU offload) or inline as a fallback — the
/// reason offloaded and fallback results never diverge.
pub fn run_kernel(job: &DiffusionJob) -> Vec<f32> {
  let width = job.width as i64;
  let height = job.height as i64;
  let mut out = vec![0.0f32; job.data.len()];

  for y in 0..height {
    for x in 0..width {
      let here = job.data[(y * width + x) as usize];
      let mut sum = 0.0f32;
      let mut count = 0u32;
      for dy in -1..=1i64 {
        for dx in -1..=1i64 {
          if dx == 0 && dy == 0 {
            continue;
          }
          let (nx, ny) = (x + dx, y + dy);
          if nx >= 0 && ny >= 0 && nx < width && ny < height {
            sum += job.data[(ny * width + nx) as usize];
            count += 1;
          }
        }
      }
      let avg = if count > 0 { sum / count as f32 } else { 0.0 };
      let diffused = here + job.diffusion * (avg - here);
      let decayed = diffused * (1.0 - job.decay);
      out[(y * width + x) as usize] = decayed.clamp(0.0, job.max_value);
    }
  }
  out
}

enum WorkerCommand {
  Run(DiffusionJob),
}

enum WorkerResult {
  Done(Vec<f32>),
}

/// Shared-memory region used purely as a liveness signal between the
/// engine thread and the worker thread: a one-byte counter the worker
/// flips after it touches the segment, mirroring `NoiseIpc`'s
/// counter-increment protocol. The actual payload travels over the
/// `async-channel` pair; the segment exists so a stalled or faulted worker
/// can be detected even if the channel itself is healthy.
struct SignalSegment {
  _shmem: Shmem,
  counter: *const AtomicU8,
}

unsafe impl Send for SignalSegment {}
unsafe impl Sync for SignalSegment {}

impl SignalSegment {
  fn create(os_id: &str) -> Result<Self, GpuError> {
    let shmem = ShmemConf::new()
      .size(1)
      .os_id(os_id)
      .create()
      .map_err(|e| GpuError::Shared(e.to_string()))?;
    let counter = shmem.as_ptr() as *const AtomicU8;
    Ok(Self {
      _shmem: shmem,
      counter,
    })
  }

  fn bump(&self) {
    unsafe { (*self.counter).fetch_add(1, Ordering::Release) };
  }

  fn read(&self) -> u8 {
    unsafe { (*self.counter).load(Ordering::Acquire) }
  }
}

/// Optional GPU offload bridge (spec §4.8). Once a job times out or the
/// worker channel disconnects, the bridge disables itself permanently for
/// the remainder of the process and every subsequent job runs inline.
pub struct GpuBridge {
  cmd_tx: Sender<WorkerCommand>,
  result_rx: Receiver<WorkerResult>,
  signal: Arc<SignalSegment>,
  _worker_handle: JoinHandle<()>,
  pub min_cells_for_offload: usize,
  job_timeout: Duration,
  permanently_disabled: bool,
  manually_disabled: bool,
}

impl GpuBridge {
  pub fn new(
    os_id: &str,
    min_cells_for_offload: usize,
    job_timeout: Duration,
  ) -> Result<Self, GpuError> {
    let signal = Arc::new(SignalSegment::create(os_id)?);
    let (cmd_tx, cmd_rx) = async_channel::unbounded::<WorkerCommand>();
    let (result_tx, result_rx) = async_channel::unbounded::<WorkerResult>();
    let worker_signal = signal.clone();

    let worker_handle = thread::spawn(move || {
      worker_loop(cmd_rx, result_tx, worker_signal);
    });

    Ok(Self {
      cmd_tx,
      result_rx,
      signal,
      _worker_handle: worker_handle,
      min_cells_for_offload,
      job_timeout,
      permanently_disabled: false,
      manually_disabled: false,
    })
  }

  pub fn set_manually_disabled(&mut self, disabled: bool) {
    self.manually_disabled = disabled;
  }

  pub fn is_disabled(&self) -> bool {
    self.permanently_disabled || self.manually_disabled
  }

  /// Runs `job` on the worker thread if it is large enough and the bridge
  /// hasn't been disabled, otherwise runs it inline. Returns the resulting
  /// grid and which path produced it (spec §9 metrics table).
  pub fn process(&mut self, job: DiffusionJob) -> (Vec<f32>, GpuOutcome) {
    let cells = (job.width as usize) * (job.height as usize);
    if self.is_disabled() || cells < self.min_cells_for_offload {
      return (run_kernel(&job), GpuOutcome::Fallback);
    }

    if self.cmd_tx.send_blocking(WorkerCommand::Run(job.clone())).is_err() {
      self.permanently_disabled = true;
      return (run_kernel(&job), GpuOutcome::Fallback);
    }

    let seen_before = self.signal.read();
    let deadline = Instant::now() + self.job_timeout;
    loop {
      if let Ok(WorkerResult::Done(data)) = self.result_rx.try_recv() {
        return (data, GpuOutcome::Offloaded);
      }
      if Instant::now() >= deadline {
        log::warn!("gpu_bridge: job timed out after {:?}, disabling permanently", self.job_timeout);
        self.permanently_disabled = true;
        return (run_kernel(&job), GpuOutcome::TimedOut);
      }
      if self.signal.read() == seen_before {
        thread::yield_now();
      }
    }
  }
}

fn worker_loop(
  cmd_rx: Receiver<WorkerCommand>,
  result_tx: Sender<WorkerResult>,
  signal: Arc<SignalSegment>,
) {
  while let Ok(cmd) = cmd_rx.recv_blocking() {
    match cmd {
      WorkerCommand::Run(job) => {
        let result = run_kernel(&job);
        signal.bump();
        if result_tx.send_blocking(WorkerResult::Done(result)).is_err() {
          break;
        }
      }
    }
  }
}
