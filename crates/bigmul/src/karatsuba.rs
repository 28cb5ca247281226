//! Karatsuba multiplication over word vectors.
//!
//! Operands longer than the leaf size are split at half the longer length
//! and combined from three half-size products:
//! `z1 = (x0 + x1)(y0 + y1) - z0 - z2`. Highly unbalanced operands are cut
//! into slices of the shorter length first.

use crate::arith::{Arith, Word};
use crate::constants::{MIN_KARATSUBA_LEAF_WORDS, W};
use crate::nat::{add, add_at, mul_basic, sub_assign, trim, trimmed};

/// Leaf size in words for a Karatsuba threshold given in product bits.
///
/// The threshold counts both operands, so each leaf operand gets half of
/// it. Never below [`MIN_KARATSUBA_LEAF_WORDS`], which keeps the recursion
/// strictly shrinking.
#[must_use]
pub fn leaf_words(threshold_bits: usize) -> usize {
    (threshold_bits / (2 * W)).max(MIN_KARATSUBA_LEAF_WORDS)
}

/// x * y, falling back to schoolbook at `leaf` words.
#[must_use]
pub fn karatsuba_mul(arith: &Arith, x: &[Word], y: &[Word], leaf: usize) -> Vec<Word> {
    let leaf = leaf.max(MIN_KARATSUBA_LEAF_WORDS);
    kmul(arith, trimmed(x), trimmed(y), leaf)
}

/// x * x, falling back to schoolbook at `leaf` words.
#[must_use]
pub fn karatsuba_sqr(arith: &Arith, x: &[Word], leaf: usize) -> Vec<Word> {
    let leaf = leaf.max(MIN_KARATSUBA_LEAF_WORDS);
    ksqr(arith, trimmed(x), leaf)
}

fn kmul(arith: &Arith, x: &[Word], y: &[Word], leaf: usize) -> Vec<Word> {
    let (x, y) = if x.len() < y.len() { (y, x) } else { (x, y) };
    let (n, m) = (x.len(), y.len());

    if m == 0 {
        return Vec::new();
    }
    if n <= leaf {
        return mul_basic(arith, x, y);
    }
    if n > 2 * m {
        return mul_unbalanced(arith, x, y, leaf);
    }

    let k = n / 2;
    let (x0, x1) = x.split_at(k);
    let (y0, y1) = if m <= k { (y, &[][..]) } else { y.split_at(k) };

    let z0 = kmul(arith, trimmed(x0), trimmed(y0), leaf);
    let z2 = kmul(arith, x1, y1, leaf);

    let sum_x = add(arith, x0, x1);
    let sum_y = add(arith, y0, y1);
    let mut z1 = kmul(arith, &sum_x, &sum_y, leaf);
    sub_assign(arith, &mut z1, &z0);
    sub_assign(arith, &mut z1, &z2);

    assemble(arith, &z0, &z1, &z2, k)
}

fn mul_unbalanced(arith: &Arith, x: &[Word], y: &[Word], leaf: usize) -> Vec<Word> {
    let m = y.len();
    let mut z = vec![0; x.len() + m];
    for (i, part) in x.chunks(m).enumerate() {
        let prod = kmul(arith, trimmed(part), y, leaf);
        add_at(arith, &mut z, &prod, i * m);
    }
    trim(&mut z);
    z
}

fn ksqr(arith: &Arith, x: &[Word], leaf: usize) -> Vec<Word> {
    let n = x.len();
    if n <= leaf {
        return mul_basic(arith, x, x);
    }

    let k = n / 2;
    let (x0, x1) = x.split_at(k);
    let z0 = ksqr(arith, trimmed(x0), leaf);
    let z2 = ksqr(arith, x1, leaf);

    let sum = add(arith, x0, x1);
    let mut z1 = ksqr(arith, &sum, leaf);
    sub_assign(arith, &mut z1, &z0);
    sub_assign(arith, &mut z1, &z2);

    assemble(arith, &z0, &z1, &z2, k)
}

/// z0 + z1·b^k + z2·b^2k
fn assemble(arith: &Arith, z0: &[Word], z1: &[Word], z2: &[Word], k: usize) -> Vec<Word> {
    let size = (z2.len() + 2 * k).max(z1.len() + k).max(z0.len());
    let mut z = vec![0; size + 1];
    z[..z0.len()].copy_from_slice(z0);
    add_at(arith, &mut z, z1, k);
    add_at(arith, &mut z, z2, 2 * k);
    trim(&mut z);
    z
}
