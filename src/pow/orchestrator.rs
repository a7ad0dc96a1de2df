//! Registration orchestrator
//!
//! Drives one search from the first block fetch to a terminal outcome:
//!
//! 1. Build the solver set, so device problems surface before any chain query
//! 2. Fetch the current block, publish it and spawn one worker per solver
//! 3. Poll: wait briefly for a solution, follow the chain head, fold batch
//!    reports into statistics, check registration and cancellation
//! 4. Stop, join and drain every worker before returning

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::chain::{PowChain, RegistrationTarget, RetryPolicy};
use super::logger::StatisticsLogger;
use super::monitor::BlockMonitor;
use super::solution::{PowSolution, SolveOutcome};
use super::state::SharedPowState;
use super::stats::{RegistrationStatistics, StatisticsTracker};
use super::worker::{CpuSolver, CudaSolver, HashSolver, WorkerPool};
use crate::core::constants::{
    DEFAULT_CUDA_DEVICE, DEFAULT_POLL_INTERVAL_MS, DEFAULT_THREADS_PER_BLOCK,
    DEFAULT_UPDATE_INTERVAL,
};
use crate::error::{Error, Result};

/// Cooperative cancellation shared between the caller and a running search.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Which hardware runs the search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverBackend {
    /// `num_workers` CPU threads
    Cpu { num_workers: usize },
    /// One worker per listed CUDA device
    Cuda {
        dev_ids: Vec<usize>,
        threads_per_block: u32,
    },
}

impl SolverBackend {
    pub fn cuda_default() -> Self {
        SolverBackend::Cuda {
            dev_ids: vec![DEFAULT_CUDA_DEVICE],
            threads_per_block: DEFAULT_THREADS_PER_BLOCK,
        }
    }
}

/// Tunables for a single search.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub backend: SolverBackend,
    /// Nonces per CPU batch; CUDA launches `threads_per_block` times as many
    pub update_interval: u64,
    pub output_in_place: bool,
    pub verbose: bool,
    pub poll_interval: Duration,
    pub retry: RetryPolicy,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: SolverBackend::Cpu {
                num_workers: default_num_workers(),
            },
            update_interval: DEFAULT_UPDATE_INTERVAL,
            output_in_place: true,
            verbose: false,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            retry: RetryPolicy::default(),
        }
    }
}

impl SolverConfig {
    pub fn with_backend(mut self, backend: SolverBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_update_interval(mut self, update_interval: u64) -> Self {
        self.update_interval = update_interval;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_output(mut self, output_in_place: bool, verbose: bool) -> Self {
        self.output_in_place = output_in_place;
        self.verbose = verbose;
        self
    }

    /// Construct every solver up front so device problems surface before any
    /// thread starts.
    pub fn build_solvers(&self) -> Result<Vec<Box<dyn HashSolver>>> {
        if self.update_interval == 0 {
            return Err(Error::InvalidParameter(
                "update_interval must be > 0".to_string(),
            ));
        }
        match &self.backend {
            SolverBackend::Cpu { num_workers } => Ok((0..(*num_workers).max(1))
                .map(|_| Box::new(CpuSolver::new(self.update_interval)) as Box<dyn HashSolver>)
                .collect()),
            SolverBackend::Cuda {
                dev_ids,
                threads_per_block,
            } => {
                if dev_ids.is_empty() {
                    return Err(Error::InvalidParameter(
                        "at least one CUDA device id is required".to_string(),
                    ));
                }
                dev_ids
                    .iter()
                    .map(|dev_id| {
                        CudaSolver::new(*dev_id, *threads_per_block, self.update_interval)
                            .map(|solver| Box::new(solver) as Box<dyn HashSolver>)
                    })
                    .collect()
            }
        }
    }
}

/// Available parallelism, or 1 if it cannot be determined.
pub fn default_num_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Search for a registration solution.
///
/// `owner_key` is the hotkey for subnet targets and the coldkey for the
/// faucet.
pub async fn solve<C: PowChain + ?Sized>(
    chain: &C,
    target: RegistrationTarget,
    owner_key: [u8; 32],
    config: &SolverConfig,
    cancel: &CancelToken,
) -> Result<SolveOutcome> {
    solve_with_statistics(chain, target, owner_key, config, cancel)
        .await
        .map(|(outcome, _)| outcome)
}

/// [`solve`], also returning the final statistics.
pub async fn solve_with_statistics<C: PowChain + ?Sized>(
    chain: &C,
    target: RegistrationTarget,
    owner_key: [u8; 32],
    config: &SolverConfig,
    cancel: &CancelToken,
) -> Result<(SolveOutcome, RegistrationStatistics)> {
    let solvers = config.build_solvers()?;
    solve_with_solvers(chain, target, owner_key, solvers, config, cancel).await
}

/// [`solve_with_statistics`] on caller-supplied solvers.
///
/// The backend in `config` is ignored; every other setting applies.
pub async fn solve_with_solvers<C: PowChain + ?Sized>(
    chain: &C,
    target: RegistrationTarget,
    owner_key: [u8; 32],
    solvers: Vec<Box<dyn HashSolver>>,
    config: &SolverConfig,
    cancel: &CancelToken,
) -> Result<(SolveOutcome, RegistrationStatistics)> {
    let monitor = BlockMonitor::new(chain, target, config.retry);
    let first = monitor.fetch_block().await?;
    info!(
        %target,
        block = first.block_number,
        difficulty = first.difficulty,
        "Starting registration search"
    );

    let state = SharedPowState::new(first);
    let (solution_tx, mut solution_rx) = mpsc::channel::<PowSolution>(1);
    let mut pool = WorkerPool::spawn(solvers, owner_key, &state, solution_tx)?;
    let num_workers = pool.len();

    let mut tracker = StatisticsTracker::new(&first);
    let mut logger = StatisticsLogger::new(config.output_in_place, config.verbose);
    let mut check_registration = target.netuid().is_some();

    let outcome: Result<SolveOutcome> = loop {
        match timeout(config.poll_interval, solution_rx.recv()).await {
            Ok(Some(solution)) => {
                let known = state.block_number();
                if solution.is_stale(known) {
                    warn!(
                        solution_block = solution.block_number,
                        current_block = known,
                        "Discarding stale solution"
                    );
                } else {
                    break Ok(SolveOutcome::Solved(solution));
                }
            }
            Ok(None) => break Err(Error::WorkersExited(num_workers)),
            Err(_) => {}
        }

        match monitor.poll(state.block_number()).await {
            Ok(Some(snapshot)) => {
                if state.write(snapshot) {
                    tracker.set_block(&snapshot);
                    check_registration = target.netuid().is_some();
                }
            }
            Ok(None) => {}
            Err(e) => break Err(e),
        }

        let reports = pool.drain_batches();
        logger.update(tracker.record(&reports, Instant::now()));

        if check_registration {
            check_registration = false;
            if let Some(netuid) = target.netuid() {
                match config
                    .retry
                    .run("is_hotkey_registered", || {
                        chain.is_hotkey_registered(netuid, &owner_key)
                    })
                    .await
                {
                    Ok(true) => break Ok(SolveOutcome::AlreadyRegistered),
                    Ok(false) => {}
                    Err(e) => break Err(e),
                }
            }
        }

        if cancel.is_cancelled() {
            break Ok(SolveOutcome::Cancelled);
        }

        if pool.all_finished() {
            match solution_rx.try_recv() {
                Ok(solution) if !solution.is_stale(state.block_number()) => {
                    break Ok(SolveOutcome::Solved(solution));
                }
                _ => break Err(Error::WorkersExited(num_workers)),
            }
        }
    };

    logger.finish();
    let remaining = pool.join().await;
    while solution_rx.try_recv().is_ok() {}
    let stats = tracker.record(&remaining, Instant::now()).clone();
    logger.print_summary(&stats);

    match &outcome {
        Ok(SolveOutcome::Solved(solution)) => info!(
            nonce = solution.nonce,
            block = solution.block_number,
            seal = %solution.seal_hex(),
            "Found registration solution"
        ),
        Ok(SolveOutcome::AlreadyRegistered) => info!(%target, "Hotkey already registered"),
        Ok(SolveOutcome::Cancelled) => info!(%target, "Registration search cancelled"),
        Err(e) => warn!(%target, error = %e, "Registration search failed"),
    }
    debug!(
        rounds = stats.rounds_total,
        seconds = stats.time_spent_total,
        "Search finished"
    );

    outcome.map(|outcome| (outcome, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_build_cpu_solvers() {
        let config = SolverConfig::default()
            .with_backend(SolverBackend::Cpu { num_workers: 3 })
            .with_update_interval(100);
        let solvers = config.build_solvers().unwrap();
        assert_eq!(solvers.len(), 3);
        assert_eq!(solvers[0].batch_size(), 100);
    }

    #[test]
    fn test_zero_workers_means_one() {
        let config = SolverConfig::default().with_backend(SolverBackend::Cpu { num_workers: 0 });
        assert_eq!(config.build_solvers().unwrap().len(), 1);
    }

    #[test]
    fn test_zero_update_interval_rejected() {
        let config = SolverConfig::default().with_update_interval(0);
        assert!(config.build_solvers().is_err());
    }

    #[test]
    fn test_cuda_without_devices_rejected() {
        let config = SolverConfig::default().with_backend(SolverBackend::Cuda {
            dev_ids: vec![],
            threads_per_block: 256,
        });
        assert!(config.build_solvers().is_err());
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn test_cuda_backend_fails_fast_without_feature() {
        let config = SolverConfig::default().with_backend(SolverBackend::cuda_default());
        let err = match config.build_solvers() {
            Ok(_) => panic!("expected device error"),
            Err(e) => e,
        };
        assert!(matches!(err, Error::DeviceUnavailable(_)));
    }
}
