//! PoW registration and faucet drivers
//!
//! Both drivers run the search engine repeatedly, hand each fresh solution to a
//! [`SolutionSubmitter`], and use an [`AttemptTracker`] to decide when to stop.

use std::time::Duration;

use async_trait::async_trait;
use parity_scale_codec::Encode;
use sp_core::crypto::AccountId32;
use subxt::dynamic::Value;
use tracing::{info, warn};

use crate::chain::{BittensorClient, BittensorSigner, ExtrinsicWait};
use crate::core::constants::{
    DEFAULT_MAX_ALLOWED_ATTEMPTS, DEFAULT_MAX_SUCCESSES, SUBTENSOR_MODULE,
};
use crate::error::{Error, Result};
use crate::pow::{
    solve, AttemptStep, AttemptTracker, CancelToken, PowChain, PowSolution, RegistrationTarget,
    SolveOutcome, SolverConfig,
};

const REGISTER_FUNCTION: &str = "register";
const FAUCET_FUNCTION: &str = "faucet";

/// Sends a solution to the chain.
#[async_trait]
pub trait SolutionSubmitter: Send + Sync {
    /// Submit `solution`, returning the extrinsic hash.
    async fn submit(&self, solution: &PowSolution) -> Result<String>;
}

/// `SubtensorModule.register`, signed by the hotkey.
pub struct RegisterSubmitter<'a> {
    client: &'a BittensorClient,
    signer: &'a BittensorSigner,
    netuid: u16,
    hotkey: [u8; 32],
    coldkey: [u8; 32],
    wait_for: ExtrinsicWait,
}

impl<'a> RegisterSubmitter<'a> {
    pub fn new(
        client: &'a BittensorClient,
        signer: &'a BittensorSigner,
        netuid: u16,
        hotkey: [u8; 32],
        coldkey: [u8; 32],
    ) -> Self {
        Self {
            client,
            signer,
            netuid,
            hotkey,
            coldkey,
            wait_for: ExtrinsicWait::default(),
        }
    }

    pub fn with_wait(mut self, wait_for: ExtrinsicWait) -> Self {
        self.wait_for = wait_for;
        self
    }
}

/// Arguments of `SubtensorModule.register`
pub fn register_args(
    netuid: u16,
    solution: &PowSolution,
    hotkey: &[u8; 32],
    coldkey: &[u8; 32],
) -> Vec<Value> {
    vec![
        Value::u128(netuid as u128),
        Value::u128(solution.block_number as u128),
        Value::u128(solution.nonce as u128),
        Value::from_bytes(solution.work()),
        Value::from_bytes(AccountId32::from(*hotkey).encode()),
        Value::from_bytes(AccountId32::from(*coldkey).encode()),
    ]
}

/// Arguments of `SubtensorModule.faucet`
pub fn faucet_args(solution: &PowSolution) -> Vec<Value> {
    vec![
        Value::u128(solution.block_number as u128),
        Value::u128(solution.nonce as u128),
        Value::from_bytes(solution.work()),
    ]
}

#[async_trait]
impl SolutionSubmitter for RegisterSubmitter<'_> {
    async fn submit(&self, solution: &PowSolution) -> Result<String> {
        let args = register_args(self.netuid, solution, &self.hotkey, &self.coldkey);
        Ok(self
            .client
            .submit_extrinsic(
                SUBTENSOR_MODULE,
                REGISTER_FUNCTION,
                args,
                self.signer,
                self.wait_for,
            )
            .await?)
    }
}

/// `SubtensorModule.faucet`, signed by the coldkey.
pub struct FaucetSubmitter<'a> {
    client: &'a BittensorClient,
    signer: &'a BittensorSigner,
    wait_for: ExtrinsicWait,
}

impl<'a> FaucetSubmitter<'a> {
    pub fn new(client: &'a BittensorClient, signer: &'a BittensorSigner) -> Self {
        Self {
            client,
            signer,
            wait_for: ExtrinsicWait::Finalized,
        }
    }

    pub fn with_wait(mut self, wait_for: ExtrinsicWait) -> Self {
        self.wait_for = wait_for;
        self
    }
}

#[async_trait]
impl SolutionSubmitter for FaucetSubmitter<'_> {
    async fn submit(&self, solution: &PowSolution) -> Result<String> {
        Ok(self
            .client
            .submit_extrinsic(
                SUBTENSOR_MODULE,
                FAUCET_FUNCTION,
                faucet_args(solution),
                self.signer,
                self.wait_for,
            )
            .await?)
    }
}

/// Bounds for the submit loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationPolicy {
    /// Consecutive failed submissions before giving up
    pub max_allowed_attempts: u32,
    /// Faucet only: successful drips before stopping
    pub max_successes: u32,
    /// Pause after a failed submission
    pub failure_pause: Duration,
}

impl Default for RegistrationPolicy {
    fn default() -> Self {
        Self {
            max_allowed_attempts: DEFAULT_MAX_ALLOWED_ATTEMPTS,
            max_successes: DEFAULT_MAX_SUCCESSES,
            failure_pause: Duration::from_secs(1),
        }
    }
}

/// How a registration run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered {
        solution: PowSolution,
        tx_hash: String,
    },
    /// The hotkey already held a UID, before or during the run
    AlreadyRegistered,
    Cancelled,
    AttemptsExhausted {
        attempts: u32,
        last_error: String,
    },
}

impl RegistrationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            RegistrationOutcome::Registered { .. } | RegistrationOutcome::AlreadyRegistered
        )
    }
}

/// Why the faucet loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaucetStop {
    MaxSuccesses,
    AttemptsExhausted,
    Cancelled,
}

/// Summary of a faucet run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaucetReport {
    pub successes: u32,
    pub stopped: FaucetStop,
    pub tx_hashes: Vec<String>,
    pub last_error: Option<String>,
}

impl FaucetReport {
    pub fn is_success(&self) -> bool {
        self.stopped != FaucetStop::AttemptsExhausted
    }
}

/// Whether a hotkey holds a UID on a subnet.
pub async fn is_registered<C: PowChain + ?Sized>(
    chain: &C,
    netuid: u16,
    hotkey: &[u8; 32],
) -> Result<bool> {
    chain.is_hotkey_registered(netuid, hotkey).await
}

/// Whether a failed submission means the hotkey is registered after all.
pub fn is_already_registered_error(err: &Error) -> bool {
    let msg = err.to_string().to_lowercase();
    msg.contains("alreadyregistered") || msg.contains("already registered")
}

/// Solve until a solution is still fresh against the chain head.
async fn solve_fresh<C: PowChain + ?Sized>(
    chain: &C,
    target: RegistrationTarget,
    owner_key: [u8; 32],
    config: &SolverConfig,
    cancel: &CancelToken,
) -> Result<SolveOutcome> {
    loop {
        let outcome = solve(chain, target, owner_key, config, cancel).await?;
        let solution = match outcome {
            SolveOutcome::Solved(solution) => solution,
            other => return Ok(other),
        };
        let current = config
            .retry
            .run("get_current_block", || chain.get_current_block())
            .await?;
        if !solution.is_stale(current) {
            return Ok(SolveOutcome::Solved(solution));
        }
        warn!(
            solution_block = solution.block_number,
            current_block = current,
            "Solution went stale before submission, solving again"
        );
    }
}

/// Register `hotkey` on `netuid` by proof of work.
pub async fn register_with_pow<C, S>(
    chain: &C,
    submitter: &S,
    netuid: u16,
    hotkey: [u8; 32],
    config: &SolverConfig,
    policy: &RegistrationPolicy,
    cancel: &CancelToken,
) -> Result<RegistrationOutcome>
where
    C: PowChain + ?Sized,
    S: SolutionSubmitter + ?Sized,
{
    let exists = config
        .retry
        .run("subnet_exists", || chain.subnet_exists(netuid))
        .await?;
    if !exists {
        return Err(Error::SubnetNotFound(netuid));
    }

    let registered = config
        .retry
        .run("is_hotkey_registered", || is_registered(chain, netuid, &hotkey))
        .await?;
    if registered {
        info!(netuid, "Hotkey already registered");
        return Ok(RegistrationOutcome::AlreadyRegistered);
    }

    let target = RegistrationTarget::Subnet(netuid);
    let mut tracker = AttemptTracker::single(policy.max_allowed_attempts);

    loop {
        info!(
            netuid,
            attempt = tracker.attempt(),
            max_attempts = tracker.max_attempts(),
            "Registration attempt"
        );

        let solution = match solve_fresh(chain, target, hotkey, config, cancel).await? {
            SolveOutcome::Solved(solution) => solution,
            SolveOutcome::AlreadyRegistered => return Ok(RegistrationOutcome::AlreadyRegistered),
            SolveOutcome::Cancelled => return Ok(RegistrationOutcome::Cancelled),
        };

        let error = match submitter.submit(&solution).await {
            Ok(tx_hash) => {
                tracker.record_success();
                info!(netuid, %tx_hash, "Registered");
                return Ok(RegistrationOutcome::Registered { solution, tx_hash });
            }
            Err(e) if is_already_registered_error(&e) => {
                info!(netuid, "Chain reports hotkey already registered");
                return Ok(RegistrationOutcome::AlreadyRegistered);
            }
            Err(e) => e,
        };

        warn!(netuid, error = %error, "Registration submission failed");
        match tracker.record_failure() {
            AttemptStep::Exhausted => {
                return Ok(RegistrationOutcome::AttemptsExhausted {
                    attempts: tracker.failures(),
                    last_error: error.to_string(),
                })
            }
            AttemptStep::Continue | AttemptStep::Success => {
                tokio::time::sleep(policy.failure_pause).await;
            }
        }
    }
}

/// Drip testnet funds to `coldkey` until the success or failure bound is hit.
pub async fn run_faucet<C, S>(
    chain: &C,
    submitter: &S,
    coldkey: [u8; 32],
    config: &SolverConfig,
    policy: &RegistrationPolicy,
    cancel: &CancelToken,
) -> Result<FaucetReport>
where
    C: PowChain + ?Sized,
    S: SolutionSubmitter + ?Sized,
{
    let mut tracker = AttemptTracker::new(policy.max_allowed_attempts, policy.max_successes);
    let mut tx_hashes = Vec::new();
    let mut last_error = None;

    let stopped = loop {
        if cancel.is_cancelled() {
            break FaucetStop::Cancelled;
        }

        let solution =
            match solve_fresh(chain, RegistrationTarget::Faucet, coldkey, config, cancel).await? {
                SolveOutcome::Solved(solution) => solution,
                SolveOutcome::AlreadyRegistered | SolveOutcome::Cancelled => {
                    break FaucetStop::Cancelled
                }
            };

        match submitter.submit(&solution).await {
            Ok(tx_hash) => {
                info!(
                    successes = tracker.successes() + 1,
                    %tx_hash,
                    "Faucet drip succeeded"
                );
                tx_hashes.push(tx_hash);
                if tracker.record_success() == AttemptStep::Success {
                    break FaucetStop::MaxSuccesses;
                }
            }
            Err(e) => {
                warn!(error = %e, attempt = tracker.attempt(), "Faucet submission failed");
                last_error = Some(e.to_string());
                if tracker.record_failure() == AttemptStep::Exhausted {
                    break FaucetStop::AttemptsExhausted;
                }
                tokio::time::sleep(policy.failure_pause).await;
            }
        }
    };

    Ok(FaucetReport {
        successes: tracker.successes(),
        stopped,
        tx_hashes,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solution() -> PowSolution {
        PowSolution {
            nonce: 9,
            block_number: 100,
            difficulty: 10,
            seal: [3u8; 32],
        }
    }

    #[test]
    fn test_register_args_layout() {
        let args = register_args(7, &solution(), &[1u8; 32], &[2u8; 32]);
        assert_eq!(args.len(), 6);
        assert_eq!(args[0], Value::u128(7));
        assert_eq!(args[1], Value::u128(100));
        assert_eq!(args[2], Value::u128(9));
        assert_eq!(args[3], Value::from_bytes([3u8; 32]));
    }

    #[test]
    fn test_faucet_args_layout() {
        let args = faucet_args(&solution());
        assert_eq!(args.len(), 3);
        assert_eq!(args[0], Value::u128(100));
    }

    #[test]
    fn test_already_registered_detection() {
        assert!(is_already_registered_error(&Error::extrinsic(
            "Module error: SubtensorModule::AlreadyRegistered"
        )));
        assert!(is_already_registered_error(&Error::extrinsic(
            "hotkey is already registered"
        )));
        assert!(!is_already_registered_error(&Error::extrinsic(
            "InvalidDifficulty"
        )));
    }

    #[test]
    fn test_outcome_success() {
        assert!(RegistrationOutcome::AlreadyRegistered.is_success());
        assert!(!RegistrationOutcome::Cancelled.is_success());
        let report = FaucetReport {
            successes: 1,
            stopped: FaucetStop::Cancelled,
            tx_hashes: vec![],
            last_error: None,
        };
        assert!(report.is_success());
    }
}
