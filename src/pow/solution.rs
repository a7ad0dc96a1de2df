use serde::{Deserialize, Serialize};

use crate::core::constants::STALE_BLOCK_TOLERANCE;

/// A solution to the registration PoW problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowSolution {
    pub nonce: u64,
    pub block_number: u64,
    pub difficulty: u128,
    pub seal: [u8; 32],
}

impl PowSolution {
    /// True once the chain has moved more than `STALE_BLOCK_TOLERANCE` blocks
    /// past the block this solution was computed for.
    pub fn is_stale(&self, current_block: u64) -> bool {
        self.block_number < current_block.saturating_sub(STALE_BLOCK_TOLERANCE)
    }

    /// `work` argument of the register/faucet extrinsics
    pub fn work(&self) -> Vec<u8> {
        self.seal.to_vec()
    }

    pub fn seal_hex(&self) -> String {
        format!("0x{}", hex::encode(self.seal))
    }
}

/// Terminal result of one engine run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// A worker found a nonce for a block that was still fresh
    Solved(PowSolution),
    /// The hotkey became registered by other means while solving
    AlreadyRegistered,
    /// The caller cancelled the run
    Cancelled,
}

impl SolveOutcome {
    pub fn solution(&self) -> Option<&PowSolution> {
        match self {
            SolveOutcome::Solved(solution) => Some(solution),
            _ => None,
        }
    }
}
