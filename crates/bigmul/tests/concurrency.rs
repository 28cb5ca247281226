//! A single multiplier shared between threads.

use std::sync::Arc;
use std::thread;

use num_bigint::BigUint;
use rayon::prelude::*;

use bigmul::{AllocatorKind, Multiplier, MultiplierConfig};

fn operand(words: usize, seed: u64) -> BigUint {
    let mut state = (seed << 1) | 1;
    let digits: Vec<u32> = (0..2 * words)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state as u32
        })
        .collect();
    BigUint::new(digits)
}

fn shared(allocator: AllocatorKind) -> Arc<Multiplier> {
    let mut config = MultiplierConfig {
        karatsuba_threshold: 256,
        fft_threshold: 4096,
        allocator,
        ..MultiplierConfig::default()
    };
    config.cache.min_bit_len = 0;
    config.cache.max_entries = 8;
    Arc::new(Multiplier::new(config).unwrap())
}

#[test]
fn threads_share_cache_and_pools() {
    for allocator in [AllocatorKind::Arena, AllocatorKind::Pool] {
        let m = shared(allocator);
        let a = Arc::new(operand(300, 1));
        let b = Arc::new(operand(250, 2));
        let expected = Arc::new(&*a * &*b);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = Arc::clone(&m);
                let a = Arc::clone(&a);
                let b = Arc::clone(&b);
                let expected = Arc::clone(&expected);
                thread::spawn(move || {
                    for _ in 0..5 {
                        assert_eq!(m.multiply_biguint(&a, &b), *expected);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let stats = m.cache_stats();
        assert!(stats.hits > 0, "{allocator}: {stats:?}");
        assert!(stats.size <= 8);
    }
}

#[test]
fn parallel_mixed_sizes() {
    let m = shared(AllocatorKind::Arena);
    let inputs: Vec<(BigUint, BigUint)> = (0..32u64)
        .map(|i| {
            let words = 1 + (i as usize * 37) % 400;
            (operand(words, i), operand(words / 2 + 1, i + 100))
        })
        .collect();
    inputs.par_iter().for_each(|(a, b)| {
        assert_eq!(m.multiply_biguint(a, b), a * b);
        assert_eq!(m.square_biguint(a), a * a);
    });
}

#[test]
fn threshold_changes_during_use() {
    let m = shared(AllocatorKind::Pool);
    let a = operand(200, 5);
    let b = operand(180, 6);
    let expected = &a * &b;
    rayon::scope(|s| {
        s.spawn(|_| {
            for fft in [4096, 100_000, 64 * 1024, 8192] {
                m.set_fft_threshold(fft).unwrap();
            }
        });
        for _ in 0..8 {
            s.spawn(|_| assert_eq!(m.multiply_biguint(&a, &b), expected));
        }
    });
}

#[test]
fn cache_bound_holds_under_contention() {
    let m = shared(AllocatorKind::Arena);
    (0..64u64).into_par_iter().for_each(|i| {
        let x = operand(100, i);
        assert_eq!(m.square_biguint(&x), &x * &x);
    });
    let stats = m.cache_stats();
    assert!(stats.size <= 8);
    assert!(stats.evictions >= 56);
}
