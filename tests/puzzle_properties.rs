use bittensor_pow::pow::puzzle::seal_hash;
use bittensor_pow::pow::{limit, seal_meets_difficulty, PowJob};
use proptest::prelude::*;
use sp_core::U256;

fn be_bytes(value: U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, word) in value.0.iter().enumerate() {
        out[24 - 8 * i..32 - 8 * i].copy_from_slice(&word.to_be_bytes());
    }
    out
}

proptest! {
    #[test]
    fn limit_never_increases_with_difficulty(a in any::<u128>(), b in any::<u128>()) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(limit(low) >= limit(high));
    }

    #[test]
    fn host_check_matches_chain_predicate(
        block in any::<[u8; 32]>(),
        key in any::<[u8; 32]>(),
        nonce in any::<u64>(),
        difficulty in 1u128..=u128::MAX,
    ) {
        let job = PowJob::new(7, &block, &key, difficulty);
        let seal = job.seal(nonce);
        prop_assert_eq!(job.check(nonce).is_some(), seal_meets_difficulty(&seal, difficulty));
    }

    #[test]
    fn limit_is_the_exact_boundary(difficulty in 1u128..=u128::MAX) {
        let bound = limit(difficulty);
        prop_assert!(seal_meets_difficulty(&be_bytes(bound), difficulty));
        if bound < U256::MAX {
            let past = be_bytes(bound + U256::one());
            prop_assert!(!seal_meets_difficulty(&past, difficulty));
        }
    }

    #[test]
    fn seal_depends_on_nonce(pre in any::<[u8; 32]>(), a in any::<u64>(), b in any::<u64>()) {
        prop_assume!(a != b);
        prop_assert_ne!(seal_hash(&pre, a), seal_hash(&pre, b));
    }
}

#[test]
fn zero_block_and_key_nonce_zero_solves_difficulty_one() {
    let job = PowJob::new(0, &[0u8; 32], &[0u8; 32], 1);
    assert!(job.check(0).is_some());
    assert_eq!(limit(0), U256::MAX);
}
