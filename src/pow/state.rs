//! Block state shared between the orchestrator and its workers
//!
//! The orchestrator publishes an immutable [`BlockSnapshot`] per block through
//! a `watch` channel. Workers hold receivers and pick up a new snapshot at
//! their next batch boundary, so no worker ever reads a half-written triple
//! and no worker needs its own chain connection.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

/// The block a search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSnapshot {
    pub block_bytes: [u8; 32],
    pub block_number: u64,
    pub difficulty: u128,
    /// Common offset added to every worker's partition for this block
    pub nonce_base: u64,
}

impl BlockSnapshot {
    pub fn block_hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.block_bytes))
    }
}

/// Single-writer, many-reader holder of the current [`BlockSnapshot`].
#[derive(Debug)]
pub struct SharedPowState {
    tx: watch::Sender<Arc<BlockSnapshot>>,
}

impl SharedPowState {
    pub fn new(initial: BlockSnapshot) -> Self {
        let (tx, _) = watch::channel(Arc::new(initial));
        Self { tx }
    }

    /// Current snapshot
    pub fn read(&self) -> Arc<BlockSnapshot> {
        self.tx.borrow().clone()
    }

    /// Replace the snapshot and notify every subscriber.
    ///
    /// Snapshots only move forward: a block number lower than the current one
    /// is ignored and `false` is returned.
    pub fn write(&self, snapshot: BlockSnapshot) -> bool {
        self.tx.send_if_modified(|current| {
            if snapshot.block_number < current.block_number || **current == snapshot {
                debug!(
                    current = current.block_number,
                    offered = snapshot.block_number,
                    "Ignoring non-advancing block snapshot"
                );
                return false;
            }
            *current = Arc::new(snapshot);
            true
        })
    }

    /// Receiver for a new worker. The current snapshot counts as unseen so the
    /// worker starts on it immediately.
    pub fn subscribe(&self) -> watch::Receiver<Arc<BlockSnapshot>> {
        let mut rx = self.tx.subscribe();
        rx.mark_changed();
        rx
    }

    pub fn block_number(&self) -> u64 {
        self.tx.borrow().block_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(block_number: u64) -> BlockSnapshot {
        BlockSnapshot {
            block_bytes: [block_number as u8; 32],
            block_number,
            difficulty: 1_000,
            nonce_base: 0,
        }
    }

    #[test]
    fn test_read_after_write() {
        let state = SharedPowState::new(snapshot(10));
        assert_eq!(state.read().block_number, 10);
        assert!(state.write(snapshot(11)));
        assert_eq!(*state.read(), snapshot(11));
    }

    #[test]
    fn test_write_never_goes_backwards() {
        let state = SharedPowState::new(snapshot(10));
        assert!(!state.write(snapshot(9)));
        assert_eq!(state.block_number(), 10);
    }

    #[test]
    fn test_subscribers_see_initial_and_new_snapshots() {
        let state = SharedPowState::new(snapshot(1));
        let mut rx = state.subscribe();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().block_number, 1);
        assert!(!rx.has_changed().unwrap());

        state.write(snapshot(2));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().block_number, 2);
    }

    #[test]
    fn test_block_hash_hex() {
        let s = snapshot(0xab);
        assert_eq!(s.block_hash_hex().len(), 66);
        assert!(s.block_hash_hex().starts_with("0xabab"));
    }
}
