//! Hash rate statistics for a running search

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::state::BlockSnapshot;
use super::worker::BatchReport;
use crate::core::constants::{HASH_RATE_EWMA_ALPHA, HASH_RATE_EWMA_SAMPLES};

/// Snapshot of search progress, refreshed once per orchestrator round.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistrationStatistics {
    /// Batches completed across all workers
    pub rounds_total: u64,
    /// Seconds since the search started
    pub time_spent_total: f64,
    /// Seconds covered by the last round
    pub time_spent: f64,
    /// Average seconds per batch
    pub time_average: f64,
    /// Smoothed hashes per second
    pub hash_rate: f64,
    /// Hashes per second since the search started
    pub hash_rate_perpetual: f64,
    pub difficulty: u128,
    pub block_number: u64,
    pub block_hash: String,
}

/// Exponentially weighted mean over the most recent samples.
///
/// The newest sample has weight 1, the one before it `alpha`, then `alpha^2`
/// and so on. Only samples actually observed are averaged.
#[derive(Debug, Clone)]
pub struct HashRateEwma {
    alpha: f64,
    capacity: usize,
    samples: VecDeque<f64>,
}

impl Default for HashRateEwma {
    fn default() -> Self {
        Self::new(HASH_RATE_EWMA_ALPHA, HASH_RATE_EWMA_SAMPLES)
    }
}

impl HashRateEwma {
    pub fn new(alpha: f64, capacity: usize) -> Self {
        Self {
            alpha,
            capacity: capacity.max(1),
            samples: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, sample: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn value(&self) -> f64 {
        let mut weight = 1.0;
        let mut weighted = 0.0;
        let mut total = 0.0;
        for sample in self.samples.iter().rev() {
            weighted += weight * sample;
            total += weight;
            weight *= self.alpha;
        }
        if total == 0.0 {
            0.0
        } else {
            weighted / total
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Folds batch reports into [`RegistrationStatistics`].
#[derive(Debug)]
pub struct StatisticsTracker {
    started: Instant,
    last_update: Instant,
    nonces_total: u64,
    ewma: HashRateEwma,
    stats: RegistrationStatistics,
}

impl StatisticsTracker {
    pub fn new(snapshot: &BlockSnapshot) -> Self {
        let now = Instant::now();
        let mut tracker = Self {
            started: now,
            last_update: now,
            nonces_total: 0,
            ewma: HashRateEwma::default(),
            stats: RegistrationStatistics::default(),
        };
        tracker.set_block(snapshot);
        tracker
    }

    pub fn set_block(&mut self, snapshot: &BlockSnapshot) {
        self.stats.block_number = snapshot.block_number;
        self.stats.difficulty = snapshot.difficulty;
        self.stats.block_hash = snapshot.block_hash_hex();
    }

    /// Record one round of batch reports observed at `now`.
    ///
    /// A round with no finished batch leaves the statistics untouched, so the
    /// next sample covers the whole time since the last round that had one.
    pub fn record(&mut self, reports: &[BatchReport], now: Instant) -> &RegistrationStatistics {
        if reports.is_empty() {
            return &self.stats;
        }
        let elapsed = now.saturating_duration_since(self.last_update);
        self.last_update = now;

        let nonces: u64 = reports.iter().map(|r| r.nonces).sum();
        self.nonces_total = self.nonces_total.saturating_add(nonces);
        self.stats.rounds_total += reports.len() as u64;

        if !elapsed.is_zero() {
            self.ewma.push(nonces as f64 / elapsed.as_secs_f64());
        }
        self.stats.hash_rate = self.ewma.value();

        let total = now.saturating_duration_since(self.started);
        self.stats.time_spent = elapsed.as_secs_f64();
        self.stats.time_spent_total = total.as_secs_f64();
        if self.stats.rounds_total > 0 {
            self.stats.time_average = self.stats.time_spent_total / self.stats.rounds_total as f64;
        }
        if !total.is_zero() {
            self.stats.hash_rate_perpetual = self.nonces_total as f64 / total.as_secs_f64();
        }
        &self.stats
    }

    pub fn stats(&self) -> &RegistrationStatistics {
        &self.stats
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> BlockSnapshot {
        BlockSnapshot {
            block_bytes: [1u8; 32],
            block_number: 42,
            difficulty: 1_000,
            nonce_base: 0,
        }
    }

    fn report(nonces: u64) -> BatchReport {
        BatchReport {
            worker_id: 0,
            block_number: 42,
            nonces,
            elapsed: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_ewma_constant_rate_converges() {
        let mut ewma = HashRateEwma::default();
        for _ in 0..25 {
            ewma.push(1_000.0);
            assert!((ewma.value() - 1_000.0).abs() < 1e-9);
        }
        assert_eq!(ewma.len(), 10);
    }

    #[test]
    fn test_ewma_weights_newest_highest() {
        let mut ewma = HashRateEwma::new(0.5, 10);
        ewma.push(0.0);
        ewma.push(100.0);
        // (1 * 100 + 0.5 * 0) / 1.5
        assert!((ewma.value() - 100.0 / 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_ewma_window_forgets_old_samples() {
        let mut ewma = HashRateEwma::new(0.8, 3);
        ewma.push(1e9);
        for _ in 0..3 {
            ewma.push(10.0);
        }
        assert!((ewma.value() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_ewma_is_zero() {
        assert_eq!(HashRateEwma::default().value(), 0.0);
    }

    #[test]
    fn test_tracker_accumulates_rounds() {
        let mut tracker = StatisticsTracker::new(&snapshot());
        let start = Instant::now();

        tracker.record(&[report(500), report(500)], start + Duration::from_secs(1));
        let stats = tracker.record(&[report(500)], start + Duration::from_secs(2)).clone();

        assert_eq!(stats.rounds_total, 3);
        assert_eq!(stats.block_number, 42);
        assert_eq!(stats.difficulty, 1_000);
        assert!(stats.hash_rate > 0.0);
        assert!(stats.hash_rate_perpetual > 0.0);
        assert!(stats.time_average > 0.0);
        assert!(stats.block_hash.starts_with("0x0101"));
    }

    #[test]
    fn test_tracker_ignores_rounds_without_batches() {
        let mut tracker = StatisticsTracker::new(&snapshot());
        let start = tracker.last_update;

        tracker.record(&[report(1_000)], start + Duration::from_secs(1));
        let before = tracker.stats().clone();
        let after = tracker.record(&[], start + Duration::from_secs(5)).clone();

        assert_eq!(before, after);
        assert_eq!(tracker.ewma.len(), 1);
    }

    #[test]
    fn test_hash_rate_settles_for_slow_worker() {
        // One 50_000 nonce batch lands every third 150ms round
        let mut tracker = StatisticsTracker::new(&snapshot());
        let start = tracker.last_update;
        let round = Duration::from_millis(150);
        let true_rate = 50_000.0 / (3.0 * round.as_secs_f64());

        let mut rates = Vec::new();
        for i in 1..=60u32 {
            let reports = if i % 3 == 0 { vec![report(50_000)] } else { Vec::new() };
            rates.push(tracker.record(&reports, start + round * i).hash_rate);
        }

        for rate in &rates[rates.len() - 6..] {
            assert!(
                (rate - true_rate).abs() / true_rate < 1e-6,
                "rate {} drifted from {}",
                rate,
                true_rate
            );
        }
    }
}
