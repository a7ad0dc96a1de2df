//! Proof-of-work registration engine
//!
//! Searches for a nonce whose seal satisfies the chain's registration
//! difficulty, using a pool of CPU threads or CUDA devices, while following
//! the chain head so that every worker always searches the freshest block.
//!
//! # Example
//!
//! ```no_run
//! use bittensor_pow::chain::BittensorClient;
//! use bittensor_pow::pow::{solve, CancelToken, RegistrationTarget, SolveOutcome, SolverConfig};
//!
//! # async fn run(hotkey: [u8; 32]) -> bittensor_pow::Result<()> {
//! let client = BittensorClient::with_default().await?;
//! let outcome = solve(
//!     &client,
//!     RegistrationTarget::Subnet(1),
//!     hotkey,
//!     &SolverConfig::default(),
//!     &CancelToken::new(),
//! )
//! .await?;
//! if let SolveOutcome::Solved(solution) = outcome {
//!     println!("nonce {} at block {}", solution.nonce, solution.block_number);
//! }
//! # Ok(())
//! # }
//! ```

pub mod attempts;
pub mod chain;
pub mod logger;
pub mod monitor;
pub mod orchestrator;
pub mod puzzle;
pub mod solution;
pub mod state;
pub mod stats;
pub mod worker;

pub use attempts::{AttemptStep, AttemptTracker};
pub use chain::{PowChain, RegistrationTarget, RetryPolicy};
pub use logger::{format_hash_rate, summary_table, StatisticsLogger};
pub use monitor::BlockMonitor;
pub use orchestrator::{
    default_num_workers, solve, solve_with_solvers, solve_with_statistics, CancelToken,
    SolverBackend, SolverConfig,
};
pub use puzzle::{digest, limit, seal_hash, seal_meets_difficulty, PowJob};
pub use solution::{PowSolution, SolveOutcome};
pub use state::{BlockSnapshot, SharedPowState};
pub use stats::{HashRateEwma, RegistrationStatistics, StatisticsTracker};
pub use worker::{batch_start, BatchReport, CpuSolver, CudaSolver, HashSolver, WorkerPool};
