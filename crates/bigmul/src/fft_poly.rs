//! Splitting magnitudes into Fermat-ring polynomials and reassembling them.
//!
//! A magnitude is cut into `K = 1 << k` chunks of `m` words, each chunk
//! becoming one element of Z/(2^(n·W)+1). Two flavours are used:
//!
//! * cyclic, for the top-level product: `m·K` exceeds the product length,
//!   so the cyclic convolution of the zero-padded chunk sequences never
//!   wraps and equals the ordinary product;
//! * negacyclic, for products modulo 2^(n·W)+1 themselves: chunk `i` is
//!   weighted by θ^i with θ^K = -1 before the transform, which turns the
//!   wrap-around into the sign change the modulus requires.

use crate::arith::Word;
use crate::constants::{FFT_SIZE_THRESHOLD, NEGACYCLIC_MIN_WORDS, W};
use crate::fermat;
use crate::fft_core::{pointwise_mul, pointwise_sqr, FftContext, Fourier};
use crate::nat::{add_at, trim};

/// Transform size `k` and chunk length `m` for a product of `words` words.
#[must_use]
pub fn fft_size(words: usize) -> (usize, usize) {
    let bits = words * W;
    let k = FFT_SIZE_THRESHOLD
        .iter()
        .position(|&bound| bound > bits)
        .unwrap_or(FFT_SIZE_THRESHOLD.len());
    (k, (words >> k) + 1)
}

fn ceil_log2(n: usize) -> usize {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as usize
    }
}

/// Transform size used when a ring of `n` words multiplies negacyclically.
fn nested_k(n: usize) -> usize {
    (ceil_log2(n) + 1) / 2
}

/// Whether a ring of `n` words splits evenly for a nested transform.
#[must_use]
pub fn nests(n: usize) -> bool {
    n % (1 << nested_k(n)) == 0
}

/// Shape of the negacyclic transform multiplying in a ring of `n` words.
#[must_use]
pub fn nested_plan(n: usize) -> FftPlan {
    let k = nested_k(n);
    let m = n >> k;
    FftPlan {
        k,
        m,
        n: value_size(k, m, 0),
    }
}

/// Ring size in words for `1 << k` chunks of `m` words.
///
/// Guarantees `n·W > 2·m·W + k`, which bounds every coefficient of the
/// product (including its sign in the negacyclic case), and makes `n·W` a
/// multiple of `max(1 << (k - extra), W)` so the needed roots are powers of
/// √2. Large rings are further rounded so they split evenly when their own
/// pointwise products nest.
#[must_use]
pub fn value_size(k: usize, m: usize, extra: usize) -> usize {
    let unit = (1usize << k.saturating_sub(extra)).max(W);
    let bits = (2 * m * W + k) / unit * unit + unit;
    let mut n = bits / W;
    if n >= NEGACYCLIC_MIN_WORDS {
        let unit_words = unit / W;
        loop {
            let step = unit_words.max(1 << nested_k(n));
            let rounded = n.div_ceil(step) * step;
            if rounded == n {
                break;
            }
            n = rounded;
        }
    }
    n
}

/// Shape of a top-level transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FftPlan {
    /// log2 of the number of chunks.
    pub k: usize,
    /// Chunk length in words.
    pub m: usize,
    /// Ring size in words.
    pub n: usize,
}

impl FftPlan {
    /// Plan for a product whose operands total `words` words.
    #[must_use]
    pub fn for_product(words: usize) -> Self {
        let (k, m) = fft_size(words);
        Self {
            k,
            m,
            n: value_size(k, m, 2),
        }
    }

    /// Number of chunks.
    #[must_use]
    pub fn chunks(&self) -> usize {
        1 << self.k
    }

    /// Words of one transformed operand.
    #[must_use]
    pub fn values_len(&self) -> usize {
        self.chunks() * (self.n + 1)
    }
}

/// A magnitude viewed as `1 << k` chunks of `m` words.
#[derive(Debug, Clone, Copy)]
pub struct Poly<'a> {
    k: usize,
    m: usize,
    words: &'a [Word],
}

impl<'a> Poly<'a> {
    /// View `words` as a polynomial. Panics if it has more than `1 << k` chunks.
    #[must_use]
    pub fn new(words: &'a [Word], k: usize, m: usize) -> Self {
        assert!(
            words.len() <= m << k,
            "operand of {} words does not fit {} chunks of {m}",
            words.len(),
            1 << k
        );
        Self { k, m, words }
    }

    /// Chunk `i`, possibly shorter than `m` or empty.
    #[must_use]
    pub fn chunk(&self, i: usize) -> &'a [Word] {
        let start = (i * self.m).min(self.words.len());
        let end = ((i + 1) * self.m).min(self.words.len());
        &self.words[start..end]
    }

    /// Cyclic forward transform into `out` (`(1 << k)·(n+1)` words).
    pub fn transform(&self, ctx: &FftContext<'_>, n: usize, out: &mut [Word]) {
        let e = n + 1;
        let mut src = ctx.alloc.alloc_fermat_slice(1 << self.k, n);
        for (i, elem) in src.chunks_exact_mut(e).enumerate() {
            let chunk = self.chunk(i);
            elem[..chunk.len()].copy_from_slice(chunk);
        }
        let mut tmp = ctx.alloc.alloc_fermat(n);
        let mut tmp2 = ctx.alloc.alloc_fermat(n);
        Fourier::forward(&ctx.arith, n, self.k).run(out, &src, &mut tmp, &mut tmp2);
    }

    /// Negacyclic forward transform: chunk `i` is weighted by θ^i, θ = 2^(n·W/K).
    #[allow(clippy::cast_possible_wrap)]
    pub fn ntransform(&self, ctx: &FftContext<'_>, n: usize, out: &mut [Word]) {
        let e = n + 1;
        let theta = (n * W) >> self.k;
        let mut src = ctx.alloc.alloc_fermat_slice(1 << self.k, n);
        let mut tmp = ctx.alloc.alloc_fermat(n);
        for (i, elem) in src.chunks_exact_mut(e).enumerate() {
            let chunk = self.chunk(i);
            tmp.fill(0);
            tmp[..chunk.len()].copy_from_slice(chunk);
            fermat::shift(&ctx.arith, elem, &tmp, (i * theta) as isize);
        }
        let mut tmp2 = ctx.alloc.alloc_fermat(n);
        Fourier::forward(&ctx.arith, n, self.k).run(out, &src, &mut tmp, &mut tmp2);
    }
}

/// Forward transform of an operand, as stored in the transform cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolValues {
    /// log2 of the number of elements.
    pub k: usize,
    /// Chunk length the operand was cut into.
    pub m: usize,
    /// Ring size in words.
    pub n: usize,
    /// `(1 << k)·(n+1)` words of transform-domain values.
    pub values: Vec<Word>,
}

impl PolValues {
    /// Transform `words` according to `plan`.
    #[must_use]
    pub fn compute(ctx: &FftContext<'_>, plan: &FftPlan, words: &[Word]) -> Self {
        let mut values = vec![0; plan.values_len()];
        Poly::new(words, plan.k, plan.m).transform(ctx, plan.n, &mut values);
        Self {
            k: plan.k,
            m: plan.m,
            n: plan.n,
            values,
        }
    }

    /// Whether these values were computed for `plan`.
    #[must_use]
    pub fn matches(&self, plan: &FftPlan) -> bool {
        self.k == plan.k && self.m == plan.m && self.n == plan.n
    }
}

/// Inverse-transform a pointwise product and add the coefficients back
/// together at their chunk offsets.
#[allow(clippy::cast_possible_wrap)]
pub fn reassemble(ctx: &FftContext<'_>, plan: &FftPlan, product: &[Word]) -> Vec<Word> {
    let FftPlan { k, m, n } = *plan;
    let e = n + 1;
    let mut coeffs = ctx.alloc.alloc_fermat_slice(plan.chunks(), n);
    let mut tmp = ctx.alloc.alloc_fermat(n);
    let mut tmp2 = ctx.alloc.alloc_fermat(n);
    Fourier::backward(&ctx.arith, n, k).run(&mut coeffs, product, &mut tmp, &mut tmp2);

    let mut z = vec![0; (plan.chunks() - 1) * m + e];
    for (i, coeff) in coeffs.chunks_exact(e).enumerate() {
        // divide by K
        fermat::shift(&ctx.arith, &mut tmp, coeff, -(k as isize));
        assert_eq!(tmp[n], 0, "coefficient overflowed the ring");
        add_at(&ctx.arith, &mut z, &tmp[..n], i * m);
    }
    trim(&mut z);
    z
}

/// z = x·y mod (2^(n·W)+1) through a nested negacyclic transform.
/// `x` and `y` hold n words each.
pub fn negacyclic_mul(ctx: &FftContext<'_>, z: &mut [Word], x: &[Word], y: &[Word]) {
    let nested = Nested::new(z.len() - 1);
    let mut xv = ctx.alloc.alloc_fermat_slice(nested.chunks(), nested.n2);
    let mut yv = ctx.alloc.alloc_fermat_slice(nested.chunks(), nested.n2);
    Poly::new(x, nested.k, nested.m).ntransform(ctx, nested.n2, &mut xv);
    Poly::new(y, nested.k, nested.m).ntransform(ctx, nested.n2, &mut yv);

    let e = nested.n2 + 1;
    let mut prod = ctx.alloc.alloc_fermat_slice(nested.chunks(), nested.n2);
    for ((p, a), b) in prod
        .chunks_exact_mut(e)
        .zip(xv.chunks_exact(e))
        .zip(yv.chunks_exact(e))
    {
        pointwise_mul(ctx, p, a, b);
    }
    nested.finish(ctx, z, &prod);
}

/// z = x² mod (2^(n·W)+1) through a nested negacyclic transform.
pub fn negacyclic_sqr(ctx: &FftContext<'_>, z: &mut [Word], x: &[Word]) {
    let nested = Nested::new(z.len() - 1);
    let mut xv = ctx.alloc.alloc_fermat_slice(nested.chunks(), nested.n2);
    Poly::new(x, nested.k, nested.m).ntransform(ctx, nested.n2, &mut xv);

    let e = nested.n2 + 1;
    let mut prod = ctx.alloc.alloc_fermat_slice(nested.chunks(), nested.n2);
    for (p, a) in prod.chunks_exact_mut(e).zip(xv.chunks_exact(e)) {
        pointwise_sqr(ctx, p, a);
    }
    nested.finish(ctx, z, &prod);
}

/// Shape of a nested negacyclic product in a ring of `n` words.
struct Nested {
    n: usize,
    k: usize,
    m: usize,
    n2: usize,
}

impl Nested {
    fn new(n: usize) -> Self {
        debug_assert!(nests(n));
        let FftPlan { k, m, n: n2 } = nested_plan(n);
        assert!(n2 < n, "nested ring of {n2} words does not shrink {n}");
        Self { n, k, m, n2 }
    }

    fn chunks(&self) -> usize {
        1 << self.k
    }

    /// Inverse-transform, unweight, and fold the signed coefficients into z.
    #[allow(clippy::cast_possible_wrap)]
    fn finish(&self, ctx: &FftContext<'_>, z: &mut [Word], product: &[Word]) {
        let Self { n, k, m, n2 } = *self;
        let e = n2 + 1;
        let theta = (n2 * W) >> k;

        let mut coeffs = ctx.alloc.alloc_fermat_slice(self.chunks(), n2);
        let mut tmp = ctx.alloc.alloc_fermat(n2);
        let mut tmp2 = ctx.alloc.alloc_fermat(n2);
        Fourier::backward(&ctx.arith, n2, k).run(&mut coeffs, product, &mut tmp, &mut tmp2);

        // Coefficients are signed and below 2^(n2·W - 1) in magnitude.
        let span = n + n2 + 1;
        let mut positive = ctx.alloc.alloc_words(span);
        let mut negative = ctx.alloc.alloc_words(span);
        for (i, coeff) in coeffs.chunks_exact(e).enumerate() {
            fermat::shift(&ctx.arith, &mut tmp, coeff, -((k + i * theta) as isize));
            if tmp[n2] == 1 || tmp[n2 - 1] >> (W - 1) == 1 {
                fermat::neg_assign(&mut tmp);
                add_at(&ctx.arith, &mut negative, &tmp[..n2], i * m);
            } else {
                add_at(&ctx.arith, &mut positive, &tmp[..n2], i * m);
            }
        }

        let mut scratch = ctx.alloc.alloc_fermat(n);
        let mut folded = ctx.alloc.alloc_fermat(n);
        fermat::reduce_mod(&ctx.arith, z, &positive, &mut scratch);
        fermat::reduce_mod(&ctx.arith, &mut folded, &negative, &mut scratch);
        fermat::sub_assign(&ctx.arith, z, &folded);
    }
}
