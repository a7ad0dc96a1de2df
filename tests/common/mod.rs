//! In-memory chain and submitter shared by the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bittensor_pow::pow::puzzle::{hash_block_with_key, seal_hash};
use bittensor_pow::pow::{PowChain, PowSolution, RetryPolicy, SolverBackend, SolverConfig};
use bittensor_pow::{Error, Result, SolutionSubmitter};

/// Difficulty high enough that no search ever finishes.
pub const UNSOLVABLE: u128 = u128::MAX;

pub struct MockChain {
    pub block: AtomicU64,
    pub difficulty: Mutex<u128>,
    pub registered: AtomicBool,
    pub subnet_exists: AtomicBool,
    /// Upcoming `get_current_block` calls that fail
    pub block_failures: AtomicUsize,
    pub block_queries: AtomicUsize,
    /// Heads reported by upcoming `get_current_block` calls, one per call
    pub block_script: Mutex<VecDeque<u64>>,
}

impl MockChain {
    pub fn new(block: u64, difficulty: u128) -> Self {
        Self {
            block: AtomicU64::new(block),
            difficulty: Mutex::new(difficulty),
            registered: AtomicBool::new(false),
            subnet_exists: AtomicBool::new(true),
            block_failures: AtomicUsize::new(0),
            block_queries: AtomicUsize::new(0),
            block_script: Mutex::new(VecDeque::new()),
        }
    }

    pub fn advance(&self) -> u64 {
        self.block.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn set_registered(&self, registered: bool) {
        self.registered.store(registered, Ordering::SeqCst);
    }

    pub fn fail_next_block_queries(&self, n: usize) {
        self.block_failures.store(n, Ordering::SeqCst);
    }

    /// Report `heads` from the next `get_current_block` calls, in order; the
    /// last one stays current afterwards.
    pub fn script_heads(&self, heads: Vec<u64>) {
        *self.block_script.lock().unwrap() = heads.into();
    }

    /// Deterministic hash for every block number
    pub fn hash_of(block_number: u64) -> [u8; 32] {
        let mut hash = [0xabu8; 32];
        hash[..8].copy_from_slice(&block_number.to_be_bytes());
        hash
    }
}

#[async_trait]
impl PowChain for MockChain {
    async fn get_current_block(&self) -> Result<u64> {
        self.block_queries.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .block_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::connection("node unreachable"));
        }
        if let Some(head) = self.block_script.lock().unwrap().pop_front() {
            self.block.store(head, Ordering::SeqCst);
        }
        Ok(self.block.load(Ordering::SeqCst))
    }

    async fn get_difficulty(&self, netuid: u16) -> Result<u128> {
        if !self.subnet_exists.load(Ordering::SeqCst) {
            return Err(Error::SubnetNotFound(netuid));
        }
        Ok(*self.difficulty.lock().unwrap())
    }

    async fn get_block_hash(&self, block_number: u64) -> Result<Option<[u8; 32]>> {
        Ok(Some(Self::hash_of(block_number)))
    }

    async fn is_hotkey_registered(&self, _netuid: u16, _hotkey: &[u8; 32]) -> Result<bool> {
        Ok(self.registered.load(Ordering::SeqCst))
    }

    async fn subnet_exists(&self, _netuid: u16) -> Result<bool> {
        Ok(self.subnet_exists.load(Ordering::SeqCst))
    }
}

/// Replays scripted submission results; once the script runs out every
/// submission succeeds.
#[derive(Default)]
pub struct ScriptedSubmitter {
    script: Mutex<VecDeque<Result<String>>>,
    pub submitted: Mutex<Vec<PowSolution>>,
}

impl ScriptedSubmitter {
    pub fn new(script: Vec<Result<String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn always_failing(n: usize, message: &str) -> Self {
        Self::new((0..n).map(|_| Err(Error::extrinsic(message))).collect())
    }

    pub fn submissions(&self) -> Vec<PowSolution> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl SolutionSubmitter for ScriptedSubmitter {
    async fn submit(&self, solution: &PowSolution) -> Result<String> {
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(*solution);
        let n = submitted.len();
        drop(submitted);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("0x{:064x}", n)))
    }
}

/// Quiet, fast-polling CPU config for tests.
pub fn test_config(num_workers: usize) -> SolverConfig {
    SolverConfig::default()
        .with_backend(SolverBackend::Cpu { num_workers })
        .with_update_interval(2_000)
        .with_poll_interval(Duration::from_millis(10))
        .with_retry(RetryPolicy::new(3, Duration::from_millis(1)))
        .with_output(false, false)
}

/// Recompute the seal for `solution` from scratch.
pub fn recompute_seal(solution: &PowSolution, owner_key: &[u8; 32]) -> [u8; 32] {
    let pre = hash_block_with_key(&MockChain::hash_of(solution.block_number), owner_key);
    seal_hash(&pre, solution.nonce)
}
