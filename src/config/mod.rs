//! Configuration for the registration engine and its CLI
//!
//! Values come from, in increasing precedence: built-in defaults, a JSON file
//! (`~/.bittensor/pow_config.json` unless overridden), environment variables,
//! and finally command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::constants;
use crate::error::{Error, Result};
use crate::extrinsics::RegistrationPolicy;
use crate::logging::LoggingConfig;
use crate::pow::{default_num_workers, RetryPolicy, SolverBackend, SolverConfig};

pub const DEFAULT_CONFIG_FILE: &str = "pow_config.json";

/// Endpoint for a well-known network name, or `None` if the name is not one.
pub fn network_endpoint(network: &str) -> Option<&'static str> {
    match network {
        constants::NETWORK_FINNEY => Some(constants::FINNEY_ENDPOINT),
        constants::NETWORK_TEST | "testnet" => Some(constants::FINNEY_TEST_ENDPOINT),
        constants::NETWORK_ARCHIVE => Some(constants::ARCHIVE_ENDPOINT),
        constants::NETWORK_LOCAL => Some(constants::LOCAL_ENDPOINT),
        _ => None,
    }
}

/// Endpoint for a network name; unknown names fall back to the default.
pub fn get_network_endpoint(network: &str) -> &'static str {
    network_endpoint(network).unwrap_or(constants::DEFAULT_ENDPOINT)
}

/// `~/.bittensor/pow_config.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".bittensor").join(DEFAULT_CONFIG_FILE))
}

/// Chain connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtensorConfig {
    pub network: String,
    pub chain_endpoint: String,
}

impl Default for SubtensorConfig {
    fn default() -> Self {
        Self {
            network: constants::DEFAULT_NETWORK.to_string(),
            chain_endpoint: constants::DEFAULT_ENDPOINT.to_string(),
        }
    }
}

/// GPU solver options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CudaConfig {
    pub use_cuda: bool,
    pub dev_id: Vec<usize>,
    /// Threads per block
    pub tpb: u32,
}

impl Default for CudaConfig {
    fn default() -> Self {
        Self {
            use_cuda: false,
            dev_id: vec![constants::DEFAULT_CUDA_DEVICE],
            tpb: constants::DEFAULT_THREADS_PER_BLOCK,
        }
    }
}

/// Solver and submit-loop options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowRegisterConfig {
    /// CPU worker threads; `None` uses every available core
    pub num_processes: Option<usize>,
    pub update_interval: u64,
    pub output_in_place: bool,
    pub verbose: bool,
    pub cuda: CudaConfig,
    pub max_allowed_attempts: u32,
    pub max_successes: u32,
    pub poll_interval_ms: u64,
    pub chain_retry_attempts: usize,
    pub chain_retry_interval_ms: u64,
}

impl Default for PowRegisterConfig {
    fn default() -> Self {
        Self {
            num_processes: None,
            update_interval: constants::DEFAULT_UPDATE_INTERVAL,
            output_in_place: true,
            verbose: false,
            cuda: CudaConfig::default(),
            max_allowed_attempts: constants::DEFAULT_MAX_ALLOWED_ATTEMPTS,
            max_successes: constants::DEFAULT_MAX_SUCCESSES,
            poll_interval_ms: constants::DEFAULT_POLL_INTERVAL_MS,
            chain_retry_attempts: constants::DEFAULT_CHAIN_RETRY_ATTEMPTS,
            chain_retry_interval_ms: constants::DEFAULT_CHAIN_RETRY_INTERVAL_MS,
        }
    }
}

impl PowRegisterConfig {
    pub fn backend(&self) -> SolverBackend {
        if self.cuda.use_cuda {
            SolverBackend::Cuda {
                dev_ids: self.cuda.dev_id.clone(),
                threads_per_block: self.cuda.tpb,
            }
        } else {
            SolverBackend::Cpu {
                num_workers: self.num_processes.unwrap_or_else(default_num_workers),
            }
        }
    }

    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig::default()
            .with_backend(self.backend())
            .with_update_interval(self.update_interval)
            .with_output(self.output_in_place, self.verbose)
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_retry(RetryPolicy::new(
                self.chain_retry_attempts,
                Duration::from_millis(self.chain_retry_interval_ms),
            ))
    }

    pub fn policy(&self) -> RegistrationPolicy {
        RegistrationPolicy {
            max_allowed_attempts: self.max_allowed_attempts,
            max_successes: self.max_successes,
            ..RegistrationPolicy::default()
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub subtensor: SubtensorConfig,
    pub pow_register: PowRegisterConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_network(network: &str) -> Self {
        Self::default().with_network(network)
    }

    /// Read a JSON config file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| {
            Error::config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else the default path if it exists, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load(path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Defaults overridden by the environment.
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Environment overrides:
    ///
    /// - `BITTENSOR_NETWORK`, `BITTENSOR_RPC`
    /// - `BT_POW_NUM_PROCESSES`, `BT_POW_UPDATE_INTERVAL`
    /// - `BT_POW_USE_CUDA`, `BT_POW_DEV_ID` (comma separated), `BT_POW_TPB`
    /// - the logging variables read by [`LoggingConfig::apply_env`]
    pub fn apply_env(mut self) -> Self {
        if let Ok(network) = std::env::var("BITTENSOR_NETWORK") {
            self = self.with_network(&network);
        }
        if let Ok(endpoint) = std::env::var("BITTENSOR_RPC") {
            self.subtensor.chain_endpoint = endpoint;
        }

        let pow = &mut self.pow_register;
        if let Some(n) = env_parse("BT_POW_NUM_PROCESSES") {
            pow.num_processes = Some(n);
        }
        if let Some(n) = env_parse("BT_POW_UPDATE_INTERVAL") {
            pow.update_interval = n;
        }
        if let Ok(flag) = std::env::var("BT_POW_USE_CUDA") {
            pow.cuda.use_cuda = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(ids) = std::env::var("BT_POW_DEV_ID") {
            let parsed: std::result::Result<Vec<usize>, _> =
                ids.split(',').map(|id| id.trim().parse()).collect();
            if let Ok(ids) = parsed {
                pow.cuda.dev_id = ids;
            }
        }
        if let Some(tpb) = env_parse("BT_POW_TPB") {
            pow.cuda.tpb = tpb;
        }

        self.logging = self.logging.apply_env();
        self
    }

    pub fn with_network(mut self, network: &str) -> Self {
        self.subtensor.network = network.to_string();
        self.subtensor.chain_endpoint = get_network_endpoint(network).to_string();
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.subtensor.chain_endpoint = endpoint.to_string();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.logging.debug = debug;
        self
    }

    pub fn with_num_processes(mut self, num_processes: usize) -> Self {
        self.pow_register.num_processes = Some(num_processes);
        self
    }

    pub fn with_cuda(mut self, dev_ids: Vec<usize>, tpb: u32) -> Self {
        self.pow_register.cuda = CudaConfig {
            use_cuda: true,
            dev_id: dev_ids,
            tpb,
        };
        self
    }

    pub fn validate(&self) -> Result<()> {
        let pow = &self.pow_register;
        if self.subtensor.chain_endpoint.is_empty() {
            return Err(Error::config("chain_endpoint must not be empty"));
        }
        if pow.update_interval == 0 {
            return Err(Error::config("update_interval must be > 0"));
        }
        if pow.num_processes == Some(0) {
            return Err(Error::config("num_processes must be > 0"));
        }
        if pow.cuda.use_cuda {
            if pow.cuda.dev_id.is_empty() {
                return Err(Error::config("at least one CUDA device id is required"));
            }
            if pow.cuda.tpb == 0 {
                return Err(Error::config("tpb must be > 0"));
            }
        }
        if pow.max_allowed_attempts == 0 {
            return Err(Error::config("max_allowed_attempts must be > 0"));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::new();
        assert_eq!(config.subtensor.network, "finney");
        assert_eq!(config.subtensor.chain_endpoint, constants::FINNEY_ENDPOINT);
        assert!(!config.pow_register.cuda.use_cuda);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_network_config() {
        let config = Config::for_network("test");
        assert_eq!(config.subtensor.network, "test");
        assert!(config.subtensor.chain_endpoint.contains("test"));
        assert_eq!(get_network_endpoint("nonsense"), constants::DEFAULT_ENDPOINT);
        assert_eq!(network_endpoint("nonsense"), None);
    }

    #[test]
    fn test_builder_pattern() {
        let config = Config::new()
            .with_network("local")
            .with_num_processes(2)
            .with_debug(true);

        assert_eq!(config.subtensor.chain_endpoint, constants::LOCAL_ENDPOINT);
        assert_eq!(
            config.pow_register.backend(),
            SolverBackend::Cpu { num_workers: 2 }
        );
        assert!(config.logging.debug);
    }

    #[test]
    fn test_cuda_backend_selection() {
        let config = Config::new().with_cuda(vec![0, 1], 512);
        assert_eq!(
            config.pow_register.backend(),
            SolverBackend::Cuda {
                dev_ids: vec![0, 1],
                threads_per_block: 512
            }
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::new();
        config.pow_register.update_interval = 0;
        assert!(config.validate().is_err());

        let config = Config::new().with_num_processes(0);
        assert!(config.validate().is_err());

        let config = Config::new().with_cuda(vec![], 256);
        assert!(config.validate().is_err());

        let config = Config::new().with_cuda(vec![0], 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_solver_config_and_policy() {
        let mut config = Config::new().with_num_processes(3);
        config.pow_register.chain_retry_attempts = 5;
        config.pow_register.max_successes = 7;

        let solver = config.pow_register.solver_config();
        assert_eq!(solver.backend, SolverBackend::Cpu { num_workers: 3 });
        assert_eq!(solver.retry.attempts, 5);
        assert_eq!(solver.poll_interval, Duration::from_millis(150));

        let policy = config.pow_register.policy();
        assert_eq!(policy.max_successes, 7);
        assert_eq!(policy.max_allowed_attempts, 3);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"pow_register": {"update_interval": 1000}}"#).unwrap();
        assert_eq!(config.pow_register.update_interval, 1000);
        assert_eq!(config.subtensor, SubtensorConfig::default());
    }
}
