//! The chain queries the engine depends on, and bounded retry around them

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;
use tracing::warn;

use crate::core::constants::{
    DEFAULT_CHAIN_RETRY_ATTEMPTS, DEFAULT_CHAIN_RETRY_INTERVAL_MS, FAUCET_DIFFICULTY,
};
use crate::error::{Error, Result};

/// Chain reads needed to run a registration search.
///
/// Implemented for [`crate::chain::BittensorClient`]; tests supply in-memory
/// chains.
#[async_trait]
pub trait PowChain: Send + Sync {
    /// Latest block number
    async fn get_current_block(&self) -> Result<u64>;

    /// Current registration difficulty of a subnet
    async fn get_difficulty(&self, netuid: u16) -> Result<u128>;

    /// Hash of the given block, `None` if the node does not know it
    async fn get_block_hash(&self, block_number: u64) -> Result<Option<[u8; 32]>>;

    /// Whether `hotkey` holds a UID on `netuid`
    async fn is_hotkey_registered(&self, netuid: u16, hotkey: &[u8; 32]) -> Result<bool>;

    /// Whether `netuid` has been created
    async fn subnet_exists(&self, netuid: u16) -> Result<bool>;
}

/// What a search is solving for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationTarget {
    /// Subnet registration; difficulty comes from the chain and the owner key
    /// is the hotkey
    Subnet(u16),
    /// Testnet faucet; fixed difficulty and the owner key is the coldkey
    Faucet,
}

impl RegistrationTarget {
    pub fn netuid(&self) -> Option<u16> {
        match self {
            RegistrationTarget::Subnet(netuid) => Some(*netuid),
            RegistrationTarget::Faucet => None,
        }
    }

    pub async fn difficulty<C: PowChain + ?Sized>(&self, chain: &C) -> Result<u128> {
        match self {
            RegistrationTarget::Subnet(netuid) => chain.get_difficulty(*netuid).await,
            RegistrationTarget::Faucet => Ok(FAUCET_DIFFICULTY),
        }
    }
}

impl std::fmt::Display for RegistrationTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrationTarget::Subnet(netuid) => write!(f, "subnet {}", netuid),
            RegistrationTarget::Faucet => write!(f, "faucet"),
        }
    }
}

/// Fixed-interval retry with a bounded number of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: usize,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_CHAIN_RETRY_ATTEMPTS,
            interval: Duration::from_millis(DEFAULT_CHAIN_RETRY_INTERVAL_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: usize, interval: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            interval,
        }
    }

    /// Run `operation` until it succeeds or the attempts run out.
    ///
    /// Only transient errors are retried. Any other error is returned as is
    /// on the first failure.
    pub async fn run<T, F, Fut>(&self, name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let strategy = FixedInterval::new(self.interval).take(attempts - 1);
        let mut attempt = 0usize;

        let result = RetryIf::start(
            strategy,
            || {
                attempt += 1;
                let current = attempt;
                let fut = operation();
                async move {
                    fut.await.map_err(|e| {
                        warn!(
                            operation = name,
                            attempt = current,
                            max_attempts = attempts,
                            error = %e,
                            "Chain query failed"
                        );
                        e
                    })
                }
            },
            Error::is_transient,
        )
        .await;

        match result {
            Err(e) if e.is_transient() => Err(Error::RetriesExhausted {
                operation: name.to_string(),
                attempts,
                last_error: e.to_string(),
            }),
            other => other,
        }
    }
}
