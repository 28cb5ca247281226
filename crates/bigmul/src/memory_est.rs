//! Scratch-memory estimates for FFT multiplication.
//!
//! Sizes an arena up front so a whole product usually runs without heap
//! fallbacks, and reports the expected footprint in bytes.

use crate::constants::{NEGACYCLIC_MIN_WORDS, W};
use crate::fft_poly::{nested_plan, nests, FftPlan};

/// Words a single negacyclic pointwise product in a ring of `n` words draws.
fn nested_words(n: usize) -> usize {
    if n < NEGACYCLIC_MIN_WORDS || !nests(n) {
        return 0;
    }
    let inner = nested_plan(n);
    let e = inner.n + 1;
    // operand and product vectors, transform sources, coefficient vector
    let vectors = 6 * inner.chunks() * e;
    let accumulators = 2 * (n + e) + 2 * (n + 1);
    vectors + 8 * e + accumulators + inner.chunks() * nested_words(inner.n)
}

/// Arena words needed for a product of `words` words in total.
#[must_use]
pub fn estimate_bump_capacity(words: usize) -> usize {
    let plan = FftPlan::for_product(words);
    let e = plan.n + 1;
    let top = 6 * plan.values_len() + 8 * e;
    let nested = plan.chunks() * nested_words(plan.n);
    (top + nested) * 12 / 10
}

/// Estimated scratch bytes for multiplying operands of `a_bits` and `b_bits` bits.
#[must_use]
pub fn estimate_fft_memory(a_bits: usize, b_bits: usize) -> usize {
    let words = a_bits.div_ceil(W) + b_bits.div_ceil(W);
    estimate_bump_capacity(words.max(1)) * (W / 8)
}
