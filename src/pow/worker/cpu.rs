use sp_core::U256;

use super::HashSolver;
use crate::error::Result;
use crate::pow::puzzle::{seal_hash, PowJob};

/// Single-threaded CPU search over `update_interval` nonces per batch.
#[derive(Debug, Clone)]
pub struct CpuSolver {
    update_interval: u64,
}

impl CpuSolver {
    pub fn new(update_interval: u64) -> Self {
        Self {
            update_interval: update_interval.max(1),
        }
    }
}

impl HashSolver for CpuSolver {
    fn name(&self) -> String {
        "cpu".to_string()
    }

    fn batch_size(&self) -> u64 {
        self.update_interval
    }

    fn solve_batch(&mut self, job: &PowJob, start: u64) -> Result<Option<(u64, [u8; 32])>> {
        for offset in 0..self.update_interval {
            let nonce = start.wrapping_add(offset);
            let seal = seal_hash(&job.block_and_key_hash, nonce);
            if U256::from_big_endian(&seal) <= job.limit {
                return Ok(Some((nonce, seal)));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow::puzzle::seal_meets_difficulty;

    #[test]
    fn test_difficulty_one_solves_first_nonce() {
        let job = PowJob::new(0, &[0u8; 32], &[0u8; 32], 1);
        let mut solver = CpuSolver::new(10);
        let (nonce, _) = solver.solve_batch(&job, 0).unwrap().unwrap();
        assert_eq!(nonce, 0);
    }

    #[test]
    fn test_found_nonce_is_valid() {
        let job = PowJob::new(5, &[1u8; 32], &[2u8; 32], 64);
        let mut solver = CpuSolver::new(10_000);
        let (nonce, seal) = solver.solve_batch(&job, 0).unwrap().unwrap();
        assert!(seal_meets_difficulty(&seal, 64));
        assert_eq!(job.seal(nonce), seal);
        // First hit within the batch.
        for earlier in 0..nonce {
            assert!(job.check(earlier).is_none());
        }
    }

    #[test]
    fn test_batch_without_solution() {
        let job = PowJob::new(5, &[1u8; 32], &[2u8; 32], u128::MAX);
        let mut solver = CpuSolver::new(100);
        assert!(solver.solve_batch(&job, 0).unwrap().is_none());
    }
}
