//! Registration hash puzzle
//!
//! Bit-compatible with the subtensor runtime verifier:
//!
//! ```text
//! pre  = keccak256(block_hash ‖ hotkey)           (64 bytes in)
//! seal = keccak256(sha256(nonce_le ‖ pre))        (40 bytes into sha256)
//! ```
//!
//! The seal, read as a big-endian 256-bit integer, is accepted when
//! `seal * difficulty` does not overflow 256 bits.

use sha2::{Digest, Sha256};
use sp_core::hashing::keccak_256;
use sp_core::U256;

/// Precomputed per-block puzzle input shared by every nonce of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowJob {
    pub block_number: u64,
    pub difficulty: u128,
    /// `keccak256(block_hash ‖ owner_key)`
    pub block_and_key_hash: [u8; 32],
    /// Largest accepted seal value
    pub limit: U256,
}

impl PowJob {
    pub fn new(
        block_number: u64,
        block_bytes: &[u8; 32],
        owner_key: &[u8; 32],
        difficulty: u128,
    ) -> Self {
        Self {
            block_number,
            difficulty,
            block_and_key_hash: hash_block_with_key(block_bytes, owner_key),
            limit: limit(difficulty),
        }
    }

    /// Seal for `nonce` under this job
    #[inline]
    pub fn seal(&self, nonce: u64) -> [u8; 32] {
        seal_hash(&self.block_and_key_hash, nonce)
    }

    /// Returns the seal when `nonce` solves this job
    #[inline]
    pub fn check(&self, nonce: u64) -> Option<[u8; 32]> {
        let seal = self.seal(nonce);
        (U256::from_big_endian(&seal) <= self.limit).then_some(seal)
    }
}

/// `keccak256(block_bytes ‖ owner_key)`
pub fn hash_block_with_key(block_bytes: &[u8; 32], owner_key: &[u8; 32]) -> [u8; 32] {
    let mut input = [0u8; 64];
    input[..32].copy_from_slice(block_bytes);
    input[32..].copy_from_slice(owner_key);
    keccak_256(&input)
}

/// `keccak256(sha256(nonce_le ‖ block_and_key_hash))`
#[inline]
pub fn seal_hash(block_and_key_hash: &[u8; 32], nonce: u64) -> [u8; 32] {
    let mut pre_seal = [0u8; 40];
    pre_seal[..8].copy_from_slice(&nonce.to_le_bytes());
    pre_seal[8..].copy_from_slice(block_and_key_hash);
    let sha = Sha256::digest(pre_seal);
    keccak_256(&sha[..])
}

/// The 256-bit digest for `(block, key, nonce)`.
pub fn digest(block_bytes: &[u8; 32], owner_key: &[u8; 32], nonce: u64) -> U256 {
    let seal = seal_hash(&hash_block_with_key(block_bytes, owner_key), nonce);
    U256::from_big_endian(&seal)
}

/// Largest digest the chain accepts at `difficulty`.
///
/// `digest * difficulty` must fit in 256 bits, so the bound is
/// `floor((2^256 - 1) / difficulty)`. Difficulty zero accepts everything.
///
/// This is one above `floor(2^256 / difficulty) - 1` whenever `difficulty`
/// is not a power of two. The lower form would reject digests the runtime
/// accepts.
pub fn limit(difficulty: u128) -> U256 {
    if difficulty == 0 {
        return U256::MAX;
    }
    U256::MAX / U256::from(difficulty)
}

/// Same predicate the runtime applies to a submitted seal.
pub fn seal_meets_difficulty(seal: &[u8; 32], difficulty: u128) -> bool {
    let (_, overflowed) =
        U256::from_big_endian(seal).overflowing_mul(U256::from(difficulty));
    !overflowed
}
