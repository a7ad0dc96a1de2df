//! Solver workers
//!
//! Each worker is an OS thread driving one [`HashSolver`]. Workers receive
//! block snapshots through a `watch` channel, search their share of the nonce
//! space in fixed-size batches, and report through two bounded channels:
//! - a single-slot solution channel (first solution wins, later ones dropped)
//! - a per-worker batch channel feeding hash rate statistics

pub mod cpu;
pub mod cuda;

pub use cpu::CpuSolver;
pub use cuda::CudaSolver;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use super::puzzle::PowJob;
use super::solution::PowSolution;
use super::state::{BlockSnapshot, SharedPowState};
use crate::error::{Error, Result};

/// How long an idle worker sleeps between stop/new-block checks
const IDLE_TICK: Duration = Duration::from_millis(10);

/// Batch notifications buffered per worker before new ones are dropped
const BATCH_CHANNEL_CAPACITY: usize = 64;

/// A device that can test a contiguous run of nonces.
pub trait HashSolver: Send + 'static {
    /// Short label used in logs
    fn name(&self) -> String;

    /// Nonces tested by one call to [`HashSolver::solve_batch`]
    fn batch_size(&self) -> u64;

    /// Test `[start, start + batch_size)` (wrapping) against `job`.
    ///
    /// Returns the first solving nonce and its seal.
    fn solve_batch(&mut self, job: &PowJob, start: u64) -> Result<Option<(u64, [u8; 32])>>;
}

/// Start nonce of batch `k` for worker `worker_id` out of `num_workers`.
///
/// Worker `i` owns batch indices `i, i + N, i + 2N, ...`, so two workers never
/// test the same batch.
pub fn batch_start(nonce_base: u64, worker_id: u64, num_workers: u64, k: u64, batch_size: u64) -> u64 {
    let index = k.wrapping_mul(num_workers).wrapping_add(worker_id);
    nonce_base.wrapping_add(index.wrapping_mul(batch_size))
}

/// Lifecycle of a worker thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Waiting for a new block or stop
    Idle,
    Searching,
    /// Publishing a batch result
    Reporting,
    Stopped,
}

/// One finished batch
#[derive(Debug, Clone, Copy)]
pub struct BatchReport {
    pub worker_id: usize,
    pub block_number: u64,
    pub nonces: u64,
    pub elapsed: Duration,
}

struct WorkerContext {
    id: usize,
    num_workers: usize,
    owner_key: [u8; 32],
    blocks: watch::Receiver<Arc<BlockSnapshot>>,
    stop: Arc<AtomicBool>,
    solutions: mpsc::Sender<PowSolution>,
    batches: mpsc::Sender<BatchReport>,
}

/// Handle to a running worker thread.
pub struct WorkerHandle {
    pub id: usize,
    /// Number of workers sharing the nonce space
    pub stride: usize,
    pub name: String,
    thread: Option<JoinHandle<()>>,
    batches: mpsc::Receiver<BatchReport>,
}

impl WorkerHandle {
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Pull every batch report queued so far without waiting.
    pub fn drain_batches(&mut self) -> Vec<BatchReport> {
        let mut reports = Vec::new();
        while let Ok(report) = self.batches.try_recv() {
            reports.push(report);
        }
        reports
    }
}

/// The set of worker threads working on one registration.
pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
    stop: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Spawn one thread per solver.
    pub fn spawn(
        solvers: Vec<Box<dyn HashSolver>>,
        owner_key: [u8; 32],
        state: &SharedPowState,
        solutions: mpsc::Sender<PowSolution>,
    ) -> Result<Self> {
        if solvers.is_empty() {
            return Err(Error::InvalidParameter(
                "at least one solver is required".to_string(),
            ));
        }

        let stop = Arc::new(AtomicBool::new(false));
        let num_workers = solvers.len();
        let mut pool = Self {
            workers: Vec::with_capacity(num_workers),
            stop: stop.clone(),
        };

        for (id, solver) in solvers.into_iter().enumerate() {
            let (batch_tx, batch_rx) = mpsc::channel(BATCH_CHANNEL_CAPACITY);
            let name = format!("{}-{}", solver.name(), id);
            let context = WorkerContext {
                id,
                num_workers,
                owner_key,
                blocks: state.subscribe(),
                stop: stop.clone(),
                solutions: solutions.clone(),
                batches: batch_tx,
            };

            // Dropping `pool` on error raises the stop flag for already-spawned threads.
            let thread = std::thread::Builder::new()
                .name(format!("pow-{}", name))
                .spawn(move || run_worker(solver, context))?;

            pool.workers.push(WorkerHandle {
                id,
                stride: num_workers,
                name,
                thread: Some(thread),
                batches: batch_rx,
            });
        }

        info!(workers = num_workers, "Spawned solver workers");
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Ask every worker to halt at its next batch boundary.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// True once every worker thread has returned.
    pub fn all_finished(&self) -> bool {
        self.workers.iter().all(WorkerHandle::is_finished)
    }

    /// Drain every worker's batch channel.
    pub fn drain_batches(&mut self) -> Vec<BatchReport> {
        self.workers
            .iter_mut()
            .flat_map(WorkerHandle::drain_batches)
            .collect()
    }

    /// Stop and wait for every thread on the blocking pool.
    pub async fn join(mut self) -> Vec<BatchReport> {
        self.stop();
        let mut threads = Vec::with_capacity(self.workers.len());
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                threads.push((worker.name.clone(), thread));
            }
        }

        let joined = tokio::task::spawn_blocking(move || {
            for (name, thread) in threads {
                if thread.join().is_err() {
                    warn!(worker = %name, "Worker thread panicked");
                }
            }
        })
        .await;
        if let Err(e) = joined {
            warn!(error = %e, "Failed to join worker threads");
        }

        let remaining = self.drain_batches();
        debug!(workers = self.workers.len(), "Solver workers joined");
        remaining
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(mut solver: Box<dyn HashSolver>, mut ctx: WorkerContext) {
    let name = solver.name();
    let batch_size = solver.batch_size().max(1);
    let mut state = WorkerState::Idle;
    let mut job: Option<PowJob> = None;
    let mut nonce_base = 0u64;
    let mut k = 0u64;

    debug!(worker = ctx.id, solver = %name, "Worker started");

    loop {
        if ctx.stop.load(Ordering::SeqCst) {
            break;
        }

        match ctx.blocks.has_changed() {
            Ok(true) => {
                let snapshot = *ctx.blocks.borrow_and_update().clone();
                job = Some(PowJob::new(
                    snapshot.block_number,
                    &snapshot.block_bytes,
                    &ctx.owner_key,
                    snapshot.difficulty,
                ));
                nonce_base = snapshot.nonce_base;
                k = 0;
                state = WorkerState::Searching;
                debug!(
                    worker = ctx.id,
                    block = snapshot.block_number,
                    difficulty = snapshot.difficulty,
                    "Worker picked up block"
                );
            }
            Ok(false) => {}
            // Orchestrator is gone.
            Err(_) => break,
        }

        let current = match (state, job.as_ref()) {
            (WorkerState::Searching, Some(job)) => job,
            _ => {
                std::thread::sleep(IDLE_TICK);
                continue;
            }
        };

        let start = batch_start(nonce_base, ctx.id as u64, ctx.num_workers as u64, k, batch_size);
        let started = Instant::now();
        let found = match solver.solve_batch(current, start) {
            Ok(found) => found,
            Err(e) => {
                warn!(worker = ctx.id, solver = %name, error = %e, "Worker failed");
                break;
            }
        };
        k = k.wrapping_add(1);

        state = WorkerState::Reporting;
        trace!(worker = ctx.id, start, ?state, "Batch done");
        let _ = ctx.batches.try_send(BatchReport {
            worker_id: ctx.id,
            block_number: current.block_number,
            nonces: batch_size,
            elapsed: started.elapsed(),
        });

        match found {
            Some((nonce, seal)) => {
                if ctx.stop.load(Ordering::SeqCst) {
                    break;
                }
                let solution = PowSolution {
                    nonce,
                    block_number: current.block_number,
                    difficulty: current.difficulty,
                    seal,
                };
                debug!(worker = ctx.id, nonce, block = solution.block_number, "Found solution");
                let _ = ctx.solutions.try_send(solution);
                state = WorkerState::Idle;
            }
            None => state = WorkerState::Searching,
        }
    }

    state = WorkerState::Stopped;
    debug!(worker = ctx.id, solver = %name, ?state, "Worker exited");
}
