//! Arithmetic modulo 2^(n·W) + 1 on buffers of n+1 words.
//!
//! A Fermat value is a `[Word]` of length n+1: n low words plus a top word.
//! The canonical range is `[0, 2^(n·W)]`, so the top word is 0, or 1 with
//! every low word zero (the residue of -1). Every operation here takes
//! canonical inputs and leaves a canonical result.
//!
//! Multiplying by a power of two is a rotation: 2^(n·W) ≡ -1, so bits
//! shifted past the top re-enter at the bottom with their sign flipped.

use crate::arith::{add_scalar, sub_scalar, Arith, Word};
use crate::constants::W;
use crate::nat::shl_assign;

/// Whether `x` is in the canonical range.
#[must_use]
pub fn is_canonical(x: &[Word]) -> bool {
    let n = x.len() - 1;
    match x[n] {
        0 => true,
        1 => x[..n].iter().all(|&w| w == 0),
        _ => false,
    }
}

/// Bring any top word back into the canonical range.
pub fn norm(x: &mut [Word]) {
    let n = x.len() - 1;
    let c = x[n];
    if c == 0 {
        return;
    }
    // low + c·b^n ≡ low - c
    x[n] = 0;
    if sub_scalar(&mut x[..n], c) != 0 {
        // low - c + b^n wrapped; one more step of b^n + 1
        x[n] = add_scalar(&mut x[..n], 1);
    }
}

/// Store `low + top·b^n` given the low words already in `z` and a signed top.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn settle_top(z: &mut [Word], top: i128) {
    let n = z.len() - 1;
    if top >= 0 {
        z[n] = top as Word;
    } else {
        // top·b^n ≡ -top
        z[n] = 0;
        z[n] = add_scalar(&mut z[..n], top.unsigned_abs() as Word);
    }
    norm(z);
}

/// z = x + y
pub fn add(arith: &Arith, z: &mut [Word], x: &[Word], y: &[Word]) {
    let n = z.len() - 1;
    let c = arith.add_vv(&mut z[..n], &x[..n], &y[..n]);
    z[n] = x[n] + y[n] + c;
    norm(z);
}

/// z += y
pub fn add_assign(arith: &Arith, z: &mut [Word], y: &[Word]) {
    let n = z.len() - 1;
    let c = arith.add_assign_vv(&mut z[..n], &y[..n]);
    z[n] += y[n] + c;
    norm(z);
}

/// z = x - y
pub fn sub(arith: &Arith, z: &mut [Word], x: &[Word], y: &[Word]) {
    let n = z.len() - 1;
    let b = arith.sub_vv(&mut z[..n], &x[..n], &y[..n]);
    settle_top(z, i128::from(x[n]) - i128::from(y[n]) - i128::from(b));
}

/// z -= y
pub fn sub_assign(arith: &Arith, z: &mut [Word], y: &[Word]) {
    let n = z.len() - 1;
    let b = arith.sub_assign_vv(&mut z[..n], &y[..n]);
    settle_top(z, i128::from(z[n]) - i128::from(y[n]) - i128::from(b));
}

/// x = -x
pub fn neg_assign(x: &mut [Word]) {
    let n = x.len() - 1;
    if x[n] == 1 {
        x.fill(0);
        x[0] = 1;
    } else if x[..n].iter().any(|&w| w != 0) {
        // b^n + 1 - low = !low + 2
        for w in &mut x[..n] {
            *w = !*w;
        }
        x[n] = add_scalar(&mut x[..n], 2);
    }
}

/// z = -x
pub fn neg(z: &mut [Word], x: &[Word]) {
    z.copy_from_slice(x);
    neg_assign(z);
}

/// z = x · 2^k for any signed k.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn shift(arith: &Arith, z: &mut [Word], x: &[Word], k: isize) {
    let n = x.len() - 1;
    debug_assert_eq!(z.len(), n + 1);
    let bits = n * W;
    let mut s = k.rem_euclid(2 * bits as isize) as usize;
    let negate = s >= bits;
    if negate {
        s -= bits;
    }
    let (kw, kb) = (s / W, s % W);

    // Whole words: the top kw words wrap around negated, as does x[n].
    z.fill(0);
    z[kw..n].copy_from_slice(&x[..n - kw]);
    let b1 = arith.sub_assign_vv(&mut z[..kw], &x[n - kw..n]);
    let b2 = sub_scalar(&mut z[kw..n], b1);
    let b3 = sub_scalar(&mut z[kw..n], x[n]);
    z[n] = add_scalar(&mut z[..n], b2 + b3);

    shl_assign(z, kb);
    norm(z);
    if negate {
        neg_assign(z);
    }
}

/// z = x · √2^k, with √2 = 2^(3nW/4) - 2^(nW/4). `tmp` holds n+1 words.
pub fn shift_half(arith: &Arith, z: &mut [Word], x: &[Word], k: isize, tmp: &mut [Word]) {
    if k.rem_euclid(2) == 0 {
        shift(arith, z, x, k.div_euclid(2));
        return;
    }
    let half = (k - 1).div_euclid(2);
    let quarter = isize::try_from((x.len() - 1) * W / 4).unwrap_or(isize::MAX);
    shift(arith, z, x, half + 3 * quarter);
    shift(arith, tmp, x, half + quarter);
    sub_assign(arith, z, tmp);
}

/// z = p mod (b^n + 1) for a product `p` of at most 2n words.
pub fn reduce_product(arith: &Arith, z: &mut [Word], p: &[Word]) {
    let n = z.len() - 1;
    debug_assert!(p.len() <= 2 * n);
    z.fill(0);
    let lo = p.len().min(n);
    z[..lo].copy_from_slice(&p[..lo]);
    if p.len() > n {
        let hi = &p[n..];
        let b = arith.sub_assign_vv(&mut z[..hi.len()], hi);
        if sub_scalar(&mut z[hi.len()..n], b) != 0 {
            z[n] = add_scalar(&mut z[..n], 1);
        }
    }
}

/// z = x mod (b^n + 1) for `x` of any length, folding n-word chunks with
/// alternating signs. `tmp` holds n+1 words.
pub fn reduce_mod(arith: &Arith, z: &mut [Word], x: &[Word], tmp: &mut [Word]) {
    let n = z.len() - 1;
    z.fill(0);
    for (t, chunk) in x.chunks(n).enumerate() {
        tmp.fill(0);
        tmp[..chunk.len()].copy_from_slice(chunk);
        if t % 2 == 0 {
            add_assign(arith, z, tmp);
        } else {
            sub_assign(arith, z, tmp);
        }
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;
    use num_traits::One;

    use super::*;
    use crate::nat::{from_biguint, to_biguint};

    fn modulus(n: usize) -> BigUint {
        (BigUint::one() << (n * W)) + BigUint::one()
    }

    fn fermat(value: &BigUint, n: usize) -> Vec<Word> {
        let mut v = from_biguint(&(value % modulus(n)));
        v.resize(n + 1, 0);
        v
    }

    fn samples(n: usize) -> Vec<Vec<Word>> {
        let m = modulus(n);
        let minus_one = &m - BigUint::one();
        let mut out = vec![
            fermat(&BigUint::ZERO, n),
            fermat(&BigUint::one(), n),
            fermat(&BigUint::from(2u32), n),
            fermat(&minus_one, n),
            fermat(&(&minus_one - BigUint::one()), n),
            fermat(&(BigUint::one() << (n * W - 1)), n),
        ];
        let mut state = 0x9e37_79b9_7f4a_7c15_u64 ^ n as u64;
        for _ in 0..4 {
            let words: Vec<Word> = (0..n)
                .map(|_| {
                    state = state.wrapping_mul(0x5851_f42d_4c95_7f2d).wrapping_add(1);
                    state
                })
                .collect();
            out.push(fermat(&to_biguint(&words), n));
        }
        out
    }

    #[test]
    fn canonical_detection() {
        assert!(is_canonical(&[5, 0]));
        assert!(is_canonical(&[0, 1]));
        assert!(!is_canonical(&[1, 1]));
        assert!(!is_canonical(&[0, 2]));
    }

    #[test]
    fn norm_reduces_any_top() {
        for n in [1, 2, 3] {
            for top in [1u64, 2, 3, u64::MAX] {
                let mut x = vec![7; n + 1];
                x[n] = top;
                let expected = to_biguint(&x) % modulus(n);
                norm(&mut x);
                assert!(is_canonical(&x));
                assert_eq!(to_biguint(&x), expected);
            }
        }
    }

    #[test]
    fn add_sub_neg_match_modular_arithmetic() {
        let arith = Arith::detect();
        for n in [1, 2, 5] {
            let m = modulus(n);
            for x in samples(n) {
                for y in samples(n) {
                    let (bx, by) = (to_biguint(&x), to_biguint(&y));
                    let mut z = vec![0; n + 1];

                    add(&arith, &mut z, &x, &y);
                    assert!(is_canonical(&z));
                    assert_eq!(to_biguint(&z), (&bx + &by) % &m);

                    sub(&arith, &mut z, &x, &y);
                    assert!(is_canonical(&z));
                    assert_eq!(to_biguint(&z), (&bx + &m - &by) % &m);

                    let mut acc = x.clone();
                    add_assign(&arith, &mut acc, &y);
                    sub_assign(&arith, &mut acc, &y);
                    assert_eq!(acc, x);
                }
                let mut z = vec![0; n + 1];
                neg(&mut z, &x);
                assert!(is_canonical(&z));
                assert_eq!(to_biguint(&z), (&m - to_biguint(&x)) % &m);
            }
        }
    }

    #[test]
    fn shift_is_multiplication_by_power_of_two() {
        let arith = Arith::detect();
        for n in [1, 2, 3] {
            let m = modulus(n);
            let period = 2 * n * W;
            for x in samples(n) {
                let bx = to_biguint(&x);
                for k in [0isize, 1, 5, 63, 64, 65, 100, 127, 128, 129, 191, 200, -1, -64, -130, 1000] {
                    let mut z = vec![0; n + 1];
                    shift(&arith, &mut z, &x, k);
                    assert!(is_canonical(&z), "non-canonical shift n={n} k={k}");
                    let e = k.rem_euclid(period as isize) as usize;
                    let expected = (&bx << e) % &m;
                    assert_eq!(to_biguint(&z), expected, "shift n={n} k={k}");
                }
            }
        }
    }

    #[test]
    fn shift_half_squares_to_shift() {
        let arith = Arith::detect();
        for n in [1, 2, 4] {
            for x in samples(n) {
                for k in [-7isize, -1, 1, 3, 65, 129] {
                    let mut tmp = vec![0; n + 1];
                    let mut once = vec![0; n + 1];
                    let mut twice = vec![0; n + 1];
                    shift_half(&arith, &mut once, &x, k, &mut tmp);
                    assert!(is_canonical(&once));
                    shift_half(&arith, &mut twice, &once, k, &mut tmp);
                    let mut direct = vec![0; n + 1];
                    shift(&arith, &mut direct, &x, k);
                    assert_eq!(twice, direct, "√2^{k}·√2^{k} != 2^{k} at n={n}");
                }
            }
        }
    }

    #[test]
    fn reductions_match_modulo() {
        let arith = Arith::detect();
        for n in [1, 3] {
            let m = modulus(n);
            for x in samples(n) {
                for y in samples(n) {
                    if x[n] == 1 || y[n] == 1 {
                        continue;
                    }
                    let p = crate::nat::schoolbook_mul(&x[..n], &y[..n]);
                    let mut z = vec![0; n + 1];
                    reduce_product(&arith, &mut z, &p);
                    assert!(is_canonical(&z));
                    assert_eq!(to_biguint(&z), to_biguint(&p) % &m);
                }
            }
            let long: Vec<Word> = (1..=(4 * n as u64 + 1)).map(|i| i.wrapping_mul(u64::MAX / 3)).collect();
            let mut z = vec![0; n + 1];
            let mut tmp = vec![0; n + 1];
            reduce_mod(&arith, &mut z, &long, &mut tmp);
            assert_eq!(to_biguint(&z), to_biguint(&long) % &m);
        }
    }
}
