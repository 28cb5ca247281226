//! Core FFT transform over Fermat-ring coefficient vectors.
//!
//! A vector of `1 << k` ring elements lives in one flat buffer, element `i`
//! at words `i*(n+1)..(i+1)*(n+1)`. The transform recurses on explicit
//! element ranges: source elements are addressed by index arithmetic,
//! destination halves are disjoint sub-slices.

use crate::allocator::TempAllocator;
use crate::arith::{Arith, Word};
use crate::constants::{NEGACYCLIC_MIN_WORDS, W};
use crate::fermat;
use crate::fft_poly::{negacyclic_mul, negacyclic_sqr, nests};
use crate::karatsuba::{karatsuba_mul, karatsuba_sqr};

/// Everything a transform-domain product needs besides its operands.
pub struct FftContext<'a> {
    /// Word kernels.
    pub arith: Arith,
    /// Karatsuba leaf size for pointwise products, in words.
    pub leaf: usize,
    /// Scratch source.
    pub alloc: &'a dyn TempAllocator,
}

/// Decimation-in-time transform of `1 << k` elements of ring size `n`.
///
/// The root of unity of a level with `1 << size` elements is
/// `√2^((4·n·W) >> size)`; the inverse uses its negation and leaves the
/// result multiplied by `1 << k`.
#[derive(Debug, Clone, Copy)]
pub struct Fourier<'a> {
    arith: &'a Arith,
    n: usize,
    k: usize,
    backward: bool,
}

impl<'a> Fourier<'a> {
    /// Forward transform.
    #[must_use]
    pub fn forward(arith: &'a Arith, n: usize, k: usize) -> Self {
        Self {
            arith,
            n,
            k,
            backward: false,
        }
    }

    /// Inverse transform, unscaled.
    #[must_use]
    pub fn backward(arith: &'a Arith, n: usize, k: usize) -> Self {
        Self {
            arith,
            n,
            k,
            backward: true,
        }
    }

    /// Transform all of `src` into `dst`. `tmp` and `tmp2` hold n+1 words each.
    pub fn run(&self, dst: &mut [Word], src: &[Word], tmp: &mut [Word], tmp2: &mut [Word]) {
        let len = (1 << self.k) * (self.n + 1);
        debug_assert_eq!(dst.len(), len);
        debug_assert_eq!(src.len(), len);
        self.recurse(dst, src, 0, self.k, tmp, tmp2);
    }

    #[allow(clippy::cast_possible_wrap)]
    fn recurse(
        &self,
        dst: &mut [Word],
        src: &[Word],
        base: usize,
        size: usize,
        tmp: &mut [Word],
        tmp2: &mut [Word],
    ) {
        let e = self.n + 1;
        let stride = 1 << (self.k - size);
        let src_elem = |j: usize| {
            let i = base + j * stride;
            &src[i * e..(i + 1) * e]
        };

        if size == 0 {
            dst[..e].copy_from_slice(src_elem(0));
            return;
        }
        if size == 1 {
            let (d0, d1) = dst.split_at_mut(e);
            fermat::add(self.arith, d0, src_elem(0), src_elem(1));
            fermat::sub(self.arith, &mut d1[..e], src_elem(0), src_elem(1));
            return;
        }

        let half = 1 << (size - 1);
        let (dst1, dst2) = dst.split_at_mut(half * e);
        self.recurse(dst1, src, base, size - 1, tmp, tmp2);
        self.recurse(dst2, src, base + stride, size - 1, tmp, tmp2);

        let mut w = ((4 * self.n * W) >> size) as isize;
        if self.backward {
            w = -w;
        }
        for (i, (e1, e2)) in dst1
            .chunks_exact_mut(e)
            .zip(dst2.chunks_exact_mut(e))
            .enumerate()
        {
            fermat::shift_half(self.arith, tmp, e2, i as isize * w, tmp2);
            fermat::sub(self.arith, e2, e1, tmp);
            fermat::add_assign(self.arith, e1, tmp);
        }
    }
}

/// z = x·y in the ring of size `z.len() - 1`.
///
/// Panics if either operand is not canonical.
pub fn pointwise_mul(ctx: &FftContext<'_>, z: &mut [Word], x: &[Word], y: &[Word]) {
    assert!(
        fermat::is_canonical(x) && fermat::is_canonical(y),
        "non-canonical Fermat operand in pointwise product"
    );
    let n = z.len() - 1;
    if x[n] == 1 {
        // x ≡ -1
        fermat::neg(z, y);
    } else if y[n] == 1 {
        fermat::neg(z, x);
    } else if n >= NEGACYCLIC_MIN_WORDS && nests(n) {
        negacyclic_mul(ctx, z, &x[..n], &y[..n]);
    } else {
        let p = karatsuba_mul(&ctx.arith, &x[..n], &y[..n], ctx.leaf);
        fermat::reduce_product(&ctx.arith, z, &p);
    }
}

/// z = x² in the ring of size `z.len() - 1`.
///
/// Panics if `x` is not canonical.
pub fn pointwise_sqr(ctx: &FftContext<'_>, z: &mut [Word], x: &[Word]) {
    assert!(
        fermat::is_canonical(x),
        "non-canonical Fermat operand in pointwise square"
    );
    let n = z.len() - 1;
    if x[n] == 1 {
        // (-1)² = 1
        z.fill(0);
        z[0] = 1;
    } else if n >= NEGACYCLIC_MIN_WORDS && nests(n) {
        negacyclic_sqr(ctx, z, &x[..n]);
    } else {
        let p = karatsuba_sqr(&ctx.arith, &x[..n], ctx.leaf);
        fermat::reduce_product(&ctx.arith, z, &p);
    }
}
