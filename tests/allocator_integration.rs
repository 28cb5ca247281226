//! Integration tests verifying the scratch allocators are actually used.

use bigmul::{AllocatorKind, Multiplier, MultiplierConfig};
use bigmul_memory::{ArenaPool, WordPool};
use bigmul_tests::operand;

fn fft_engine(allocator: AllocatorKind) -> Multiplier {
    Multiplier::new(
        MultiplierConfig {
            karatsuba_threshold: 64,
            fft_threshold: 64,
            allocator,
            ..MultiplierConfig::default()
        }
        .without_cache(),
    )
    .unwrap()
}

#[test]
fn arena_slabs_are_recycled() {
    let m = fft_engine(AllocatorKind::Arena);
    assert_eq!(m.allocator_kind(), AllocatorKind::Arena);
    let a = operand(40_000, 1);
    let b = operand(39_000, 2);
    for _ in 0..3 {
        assert_eq!(m.multiply_biguint(&a, &b), &a * &b);
    }
    let stats = m.allocator_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);
}

#[test]
fn pool_buffers_are_recycled() {
    let m = fft_engine(AllocatorKind::Pool);
    let a = operand(40_000, 3);
    assert_eq!(m.square_biguint(&a), &a * &a);
    let after_first = m.allocator_stats();
    assert_eq!(m.square_biguint(&a), &a * &a);
    let after_second = m.allocator_stats();
    assert!(after_second.hits > after_first.hits);
    assert!(after_second.hit_rate() > 0.0);
}

#[test]
fn large_unbalanced_products() {
    let a = operand(1 << 20, 5);
    let b = operand(5_000, 6);
    let expected = &a * &b;
    for allocator in [AllocatorKind::Arena, AllocatorKind::Pool] {
        let m = fft_engine(allocator);
        assert_eq!(m.multiply_biguint(&a, &b), expected, "{allocator}");
        assert_eq!(m.multiply_biguint(&b, &a), expected, "{allocator}");
    }
}

#[test]
fn memory_pools_standalone() {
    let arenas = ArenaPool::new(2);
    arenas.warm(10_000, 2);
    assert_eq!(arenas.idle_slabs(), 2);

    let pool = WordPool::default();
    pool.warm(1_000, 3);
    let buf = pool.acquire(900);
    assert_eq!(buf.len(), 900);
    assert_eq!(pool.stats().hits, 1);
    pool.release(buf);
}
