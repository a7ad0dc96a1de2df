pub mod chain;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod extrinsics;
pub mod logging;
pub mod pow;
pub mod utils;

pub use chain::{BittensorClient, Error as ChainError};
pub use config::{Config, CudaConfig, PowRegisterConfig, SubtensorConfig};
pub use error::{Error, Result};

pub use logging::{
    init_default_logging, init_logging, is_initialized, CompactFormatter, JsonFormatter,
    LogFormat, LoggingConfig, TextFormatter,
};

pub use pow::{
    solve, solve_with_statistics, CancelToken, PowChain, PowSolution, RegistrationStatistics,
    RegistrationTarget, SolveOutcome, SolverBackend, SolverConfig,
};

pub use extrinsics::{
    register_with_pow, run_faucet, FaucetReport, FaucetStop, RegistrationOutcome,
    RegistrationPolicy, SolutionSubmitter,
};

pub use utils::{decoders, ss58};
