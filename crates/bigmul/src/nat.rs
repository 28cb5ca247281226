//! Unsigned magnitudes as little-endian word vectors.
//!
//! A nat is a `[Word]` with the least significant word first. Vectors
//! returned from this module are trimmed: no high zero words, and zero is
//! the empty vector.

use num_bigint::BigUint;

use crate::arith::{add_scalar, sub_scalar, Arith, Word};
use crate::constants::W;

/// `x` without its high zero words.
#[must_use]
pub fn trimmed(x: &[Word]) -> &[Word] {
    let len = x.iter().rposition(|&w| w != 0).map_or(0, |i| i + 1);
    &x[..len]
}

/// Drop high zero words in place.
pub fn trim(z: &mut Vec<Word>) {
    let len = trimmed(z).len();
    z.truncate(len);
}

/// Number of significant bits.
#[must_use]
pub fn bit_len(x: &[Word]) -> usize {
    match trimmed(x) {
        [] => 0,
        t => (t.len() - 1) * W + (W - t[t.len() - 1].leading_zeros() as usize),
    }
}

/// Words of a `BigUint`.
#[must_use]
pub fn from_biguint(x: &BigUint) -> Vec<Word> {
    x.to_u64_digits()
}

/// Split words into the 32-bit digits `num-bigint` builds from, trimmed.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn to_u32_digits(x: &[Word]) -> Vec<u32> {
    let mut digits: Vec<u32> = trimmed(x)
        .iter()
        .flat_map(|&w| [w as u32, (w >> 32) as u32])
        .collect();
    while digits.last() == Some(&0) {
        digits.pop();
    }
    digits
}

/// `BigUint` holding `x`.
#[must_use]
pub fn to_biguint(x: &[Word]) -> BigUint {
    BigUint::new(to_u32_digits(x))
}

/// z <<= s for s < W, returning the bits shifted out of the top word.
pub fn shl_assign(z: &mut [Word], s: usize) -> Word {
    debug_assert!(s < W);
    if s == 0 {
        return 0;
    }
    let mut carry = 0;
    for w in z.iter_mut() {
        let out = *w >> (W - s);
        *w = (*w << s) | carry;
        carry = out;
    }
    carry
}

/// z[shift..] += x. The sum must fit in `z`.
pub fn add_at(arith: &Arith, z: &mut [Word], x: &[Word], shift: usize) {
    let m = x.len();
    if m == 0 {
        return;
    }
    assert!(shift + m <= z.len(), "add_at: out of bounds");
    let carry = arith.add_assign_vv(&mut z[shift..shift + m], x);
    if carry != 0 {
        let overflow = add_scalar(&mut z[shift + m..], carry);
        assert_eq!(overflow, 0, "add_at: carry out of destination");
    }
}

/// x + y.
#[must_use]
pub fn add(arith: &Arith, x: &[Word], y: &[Word]) -> Vec<Word> {
    let (x, y) = if x.len() < y.len() { (y, x) } else { (x, y) };
    let (n, m) = (x.len(), y.len());
    let mut z = vec![0; n + 1];
    let carry = arith.add_vv(&mut z[..m], &x[..m], y);
    z[m..n].copy_from_slice(&x[m..]);
    z[n] = add_scalar(&mut z[m..n], carry);
    trim(&mut z);
    z
}

/// x - y, where x >= y.
#[must_use]
pub fn sub(arith: &Arith, x: &[Word], y: &[Word]) -> Vec<Word> {
    let mut z = x.to_vec();
    sub_assign(arith, &mut z, y);
    z
}

/// z -= y, where z >= y.
pub fn sub_assign(arith: &Arith, z: &mut Vec<Word>, y: &[Word]) {
    let y = trimmed(y);
    let m = y.len();
    assert!(m <= z.len(), "sub_assign: negative result");
    let borrow = arith.sub_assign_vv(&mut z[..m], y);
    let borrow = sub_scalar(&mut z[m..], borrow);
    assert_eq!(borrow, 0, "sub_assign: negative result");
    trim(z);
}

/// Schoolbook product accumulated into `z`, which must be zeroed and hold
/// `x.len() + y.len()` words.
pub fn basic_mul(arith: &Arith, z: &mut [Word], x: &[Word], y: &[Word]) {
    let n = x.len();
    debug_assert!(z.len() >= n + y.len());
    if n == 0 {
        return;
    }
    for (i, &yi) in y.iter().enumerate() {
        if yi != 0 {
            z[i + n] = arith.add_mul_vvw(&mut z[i..i + n], x, yi);
        }
    }
}

/// x * y by schoolbook multiplication.
#[must_use]
pub fn mul_basic(arith: &Arith, x: &[Word], y: &[Word]) -> Vec<Word> {
    let (x, y) = (trimmed(x), trimmed(y));
    if x.is_empty() || y.is_empty() {
        return Vec::new();
    }
    let mut z = vec![0; x.len() + y.len()];
    basic_mul(arith, &mut z, x, y);
    trim(&mut z);
    z
}

/// Reference product on the scalar kernel, independent of any dispatch.
#[must_use]
pub fn schoolbook_mul(x: &[Word], y: &[Word]) -> Vec<Word> {
    mul_basic(&Arith::scalar(), x, y)
}
