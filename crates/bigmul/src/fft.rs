//! FFT multiplication of magnitudes.
//!
//! Both operands are split into `1 << k` chunks, transformed, multiplied
//! pointwise and transformed back. Forward transforms of large operands go
//! through the [`TransformCache`] when one is supplied, so repeated
//! operands (a value squared, then multiplied again) skip their transform.

use std::ops::Deref;
use std::sync::Arc;

use crate::allocator::TempBuf;
use crate::arith::Word;
use crate::fft_cache::TransformCache;
use crate::fft_core::{pointwise_mul, pointwise_sqr, FftContext};
use crate::fft_poly::{reassemble, FftPlan, PolValues, Poly};
use crate::nat::bit_len;

/// Transform-domain values, either shared from the cache or scratch.
enum Values<'a> {
    Cached(Arc<PolValues>),
    Scratch(TempBuf<'a>),
}

impl Deref for Values<'_> {
    type Target = [Word];

    fn deref(&self) -> &[Word] {
        match self {
            Self::Cached(values) => &values.values,
            Self::Scratch(buf) => buf,
        }
    }
}

fn transform<'a>(
    ctx: &'a FftContext<'_>,
    cache: Option<&TransformCache>,
    plan: &FftPlan,
    operand: &[Word],
) -> Values<'a> {
    if let Some(cache) = cache.filter(|c| c.accepts(bit_len(operand))) {
        if let Some(values) = cache.get(operand, plan) {
            return Values::Cached(values);
        }
        let values = Arc::new(PolValues::compute(ctx, plan, operand));
        cache.put(operand, Arc::clone(&values));
        return Values::Cached(values);
    }
    let mut buf = ctx.alloc.alloc_fermat_slice(plan.chunks(), plan.n);
    Poly::new(operand, plan.k, plan.m).transform(ctx, plan.n, &mut buf);
    Values::Scratch(buf)
}

/// x·y for trimmed, non-empty magnitudes.
#[must_use]
pub fn fft_mul(
    ctx: &FftContext<'_>,
    cache: Option<&TransformCache>,
    x: &[Word],
    y: &[Word],
) -> Vec<Word> {
    if x.is_empty() || y.is_empty() {
        return Vec::new();
    }
    let plan = FftPlan::for_product(x.len() + y.len());
    let xv = transform(ctx, cache, &plan, x);
    let yv = transform(ctx, cache, &plan, y);

    let e = plan.n + 1;
    let mut prod = ctx.alloc.alloc_fermat_slice(plan.chunks(), plan.n);
    for ((p, a), b) in prod
        .chunks_exact_mut(e)
        .zip(xv.chunks_exact(e))
        .zip(yv.chunks_exact(e))
    {
        pointwise_mul(ctx, p, a, b);
    }
    reassemble(ctx, &plan, &prod)
}

/// x² with a single forward transform.
#[must_use]
pub fn fft_sqr(ctx: &FftContext<'_>, cache: Option<&TransformCache>, x: &[Word]) -> Vec<Word> {
    if x.is_empty() {
        return Vec::new();
    }
    let plan = FftPlan::for_product(2 * x.len());
    let xv = transform(ctx, cache, &plan, x);

    let e = plan.n + 1;
    let mut prod = ctx.alloc.alloc_fermat_slice(plan.chunks(), plan.n);
    for (p, a) in prod.chunks_exact_mut(e).zip(xv.chunks_exact(e)) {
        pointwise_sqr(ctx, p, a);
    }
    reassemble(ctx, &plan, &prod)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::HeapAllocator;
    use crate::arith::Arith;
    use crate::fft_cache::TransformCacheConfig;
    use crate::nat::schoolbook_mul;

    fn words(len: usize, seed: u64) -> Vec<Word> {
        let mut state = seed | 1;
        let mut v: Vec<Word> = (0..len)
            .map(|_| {
                state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
                state
            })
            .collect();
        if let Some(top) = v.last_mut() {
            *top |= 1;
        }
        v
    }

    fn with_ctx<R>(f: impl FnOnce(&FftContext<'_>) -> R) -> R {
        let alloc = HeapAllocator;
        let ctx = FftContext {
            arith: Arith::detect(),
            leaf: 16,
            alloc: &alloc,
        };
        f(&ctx)
    }

    #[test]
    fn multiply_matches_schoolbook() {
        with_ctx(|ctx| {
            for &(a, b) in &[(1, 1), (2, 70), (64, 64), (150, 151), (400, 37)] {
                let x = words(a, a as u64);
                let y = words(b, b as u64 + 99);
                assert_eq!(fft_mul(ctx, None, &x, &y), schoolbook_mul(&x, &y), "{a}x{b}");
            }
        });
    }

    #[test]
    fn square_matches_schoolbook() {
        with_ctx(|ctx| {
            for len in [1, 5, 63, 300] {
                let x = words(len, 5);
                assert_eq!(fft_sqr(ctx, None, &x), schoolbook_mul(&x, &x));
            }
        });
    }

    #[test]
    fn all_ones_operands() {
        with_ctx(|ctx| {
            let x = vec![u64::MAX; 257];
            assert_eq!(fft_sqr(ctx, None, &x), schoolbook_mul(&x, &x));
            assert_eq!(fft_mul(ctx, None, &x, &x[..100]), schoolbook_mul(&x, &x[..100]));
        });
    }

    #[test]
    fn empty_operand_is_zero() {
        with_ctx(|ctx| {
            assert!(fft_mul(ctx, None, &[], &[1]).is_empty());
            assert!(fft_sqr(ctx, None, &[]).is_empty());
        });
    }

    #[test]
    fn cached_transforms_are_reused() {
        let cache = TransformCache::new(TransformCacheConfig {
            enabled: true,
            max_entries: 8,
            min_bit_len: 0,
        });
        with_ctx(|ctx| {
            let x = words(120, 1);
            let y = words(90, 2);
            let expected = schoolbook_mul(&x, &y);
            assert_eq!(fft_mul(ctx, Some(&cache), &x, &y), expected);
            assert_eq!(cache.stats().hits, 0);
            assert_eq!(fft_mul(ctx, Some(&cache), &x, &y), expected);
            assert_eq!(cache.stats().hits, 2);

            let sq = fft_sqr(ctx, Some(&cache), &x);
            assert_eq!(sq, schoolbook_mul(&x, &x));
            assert_eq!(fft_sqr(ctx, Some(&cache), &x), sq);
            assert_eq!(cache.stats().hits, 3);
        });
    }
}
