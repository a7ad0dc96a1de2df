//! Core constants for PoW registration
//! These match the values used by the subtensor runtime and the Python CLI

/// Module hosting registration storage and calls
pub const SUBTENSOR_MODULE: &str = "SubtensorModule";

/// Fixed difficulty of the testnet faucet puzzle
pub const FAUCET_DIFFICULTY: u128 = 1_000_000;

/// A solution for block `b` is stale once the chain is past `b + STALE_BLOCK_TOLERANCE`
pub const STALE_BLOCK_TOLERANCE: u64 = 3;

/// Nonces hashed by a CPU worker between block/stop checks
pub const DEFAULT_UPDATE_INTERVAL: u64 = 50_000;

/// CUDA threads per block
pub const DEFAULT_THREADS_PER_BLOCK: u32 = 256;

/// Default CUDA device
pub const DEFAULT_CUDA_DEVICE: usize = 0;

/// How long the orchestrator waits on the solution channel per loop tick
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 150;

/// Attempts per chain query before the engine gives up
pub const DEFAULT_CHAIN_RETRY_ATTEMPTS: usize = 3;

/// Constant delay between chain query attempts
pub const DEFAULT_CHAIN_RETRY_INTERVAL_MS: u64 = 1_000;

/// Hash-rate EWMA decay per sample
pub const HASH_RATE_EWMA_ALPHA: f64 = 0.80;

/// Hash-rate samples kept for the EWMA
pub const HASH_RATE_EWMA_SAMPLES: usize = 10;

/// Submission attempts per registration / faucet run
pub const DEFAULT_MAX_ALLOWED_ATTEMPTS: u32 = 3;

/// Successful faucet drips per run
pub const DEFAULT_MAX_SUCCESSES: u32 = 3;

/// SS58 format for Bittensor addresses
pub const SS58_FORMAT: u16 = 42;

/// Network names
pub const NETWORK_FINNEY: &str = "finney";
pub const NETWORK_TEST: &str = "test";
pub const NETWORK_ARCHIVE: &str = "archive";
pub const NETWORK_LOCAL: &str = "local";

/// Default network
pub const DEFAULT_NETWORK: &str = NETWORK_FINNEY;

/// Network endpoints
pub const FINNEY_ENDPOINT: &str = "wss://entrypoint-finney.opentensor.ai:443";
pub const FINNEY_TEST_ENDPOINT: &str = "wss://test.finney.opentensor.ai:443";
pub const ARCHIVE_ENDPOINT: &str = "wss://archive.chain.opentensor.ai:443";
pub const LOCAL_ENDPOINT: &str = "ws://127.0.0.1:9944";

/// Default endpoint
pub const DEFAULT_ENDPOINT: &str = FINNEY_ENDPOINT;

