use tracing::{debug, info};

use super::chain::{PowChain, RegistrationTarget, RetryPolicy};
use super::state::BlockSnapshot;
use crate::error::{Error, Result};

/// Watches the chain head on behalf of every worker.
///
/// One monitor query cycle per block, however many workers are searching.
pub struct BlockMonitor<'a, C: PowChain + ?Sized> {
    chain: &'a C,
    target: RegistrationTarget,
    retry: RetryPolicy,
}

impl<'a, C: PowChain + ?Sized> BlockMonitor<'a, C> {
    pub fn new(chain: &'a C, target: RegistrationTarget, retry: RetryPolicy) -> Self {
        Self {
            chain,
            target,
            retry,
        }
    }

    /// Fetch `(block_number, difficulty, block_hash)` for the current head.
    pub async fn fetch_block(&self) -> Result<BlockSnapshot> {
        self.retry
            .run("get_block", || async {
                let block_number = self.chain.get_current_block().await?;
                let difficulty = self.target.difficulty(self.chain).await?;
                let block_bytes = self
                    .chain
                    .get_block_hash(block_number)
                    .await?
                    .ok_or_else(|| {
                        Error::connection(format!(
                            "could not get hash of block {}",
                            block_number
                        ))
                    })?;

                Ok(BlockSnapshot {
                    block_bytes,
                    block_number,
                    difficulty,
                    nonce_base: rand::random(),
                })
            })
            .await
    }

    /// The new head, if it differs from `known_block_number`.
    pub async fn poll(&self, known_block_number: u64) -> Result<Option<BlockSnapshot>> {
        let head = self
            .retry
            .run("get_current_block", || self.chain.get_current_block())
            .await?;
        if head == known_block_number {
            return Ok(None);
        }

        let snapshot = self.fetch_block().await?;
        if snapshot.block_number == known_block_number {
            return Ok(None);
        }

        debug!(
            target = %self.target,
            block = snapshot.block_number,
            difficulty = snapshot.difficulty,
            "New block"
        );
        if snapshot.block_number < known_block_number {
            info!(
                known = known_block_number,
                head = snapshot.block_number,
                "Chain head moved backwards"
            );
        }
        Ok(Some(snapshot))
    }
}
