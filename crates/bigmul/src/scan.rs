//! Decimal parsing by divide and conquer.
//!
//! Long digit strings are split at a power-of-ten boundary, both halves are
//! parsed recursively and recombined as `high·10^len(low) + low`, so the
//! cost is dominated by a few large multiplications instead of a quadratic
//! digit loop.

use num_bigint::BigUint;
use parking_lot::Mutex;

use crate::constants::QUADRATIC_SCAN_THRESHOLD;
use crate::errors::MulError;
use crate::multiplier::Multiplier;

/// Decimal parser and formatter backed by a [`Multiplier`].
#[derive(Debug)]
pub struct DecimalScanner<'m> {
    multiplier: &'m Multiplier,
    /// `powers[i] = 10^(QUADRATIC_SCAN_THRESHOLD << i)`
    powers: Mutex<Vec<BigUint>>,
}

impl Default for DecimalScanner<'static> {
    fn default() -> Self {
        Self::new(Multiplier::global())
    }
}

impl<'m> DecimalScanner<'m> {
    /// Scanner multiplying through `multiplier`.
    #[must_use]
    pub fn new(multiplier: &'m Multiplier) -> Self {
        Self {
            multiplier,
            powers: Mutex::new(Vec::new()),
        }
    }

    /// Parse a string of ASCII digits. The empty string is zero and leading
    /// zeros are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`MulError::InvalidDigit`] at the first byte that is not an
    /// ASCII digit.
    pub fn parse(&self, s: &str) -> Result<BigUint, MulError> {
        if let Some((position, found)) = s.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
            return Err(MulError::InvalidDigit { position, found });
        }
        Ok(self.parse_digits(s.as_bytes()))
    }

    /// Canonical decimal representation.
    #[must_use]
    pub fn format(&self, x: &BigUint) -> String {
        x.to_str_radix(10)
    }

    fn parse_digits(&self, digits: &[u8]) -> BigUint {
        if digits.len() <= QUADRATIC_SCAN_THRESHOLD {
            return BigUint::parse_bytes(digits, 10).unwrap_or_default();
        }
        // largest i with QUADRATIC_SCAN_THRESHOLD << i < digits.len()
        let mut i = 0;
        while QUADRATIC_SCAN_THRESHOLD << (i + 1) < digits.len() {
            i += 1;
        }
        let low_len = QUADRATIC_SCAN_THRESHOLD << i;
        let (high, low) = digits.split_at(digits.len() - low_len);
        let high = self.parse_digits(high);
        let low = self.parse_digits(low);
        let scale = self.power(i);
        self.multiplier.multiply_biguint(&high, &scale) + low
    }

    /// `10^(QUADRATIC_SCAN_THRESHOLD << i)`. The table lock is not held
    /// while the next power is squared; a thread that loses the race to
    /// extend the table drops its copy.
    #[allow(clippy::cast_possible_truncation)]
    fn power(&self, i: usize) -> BigUint {
        loop {
            let (len, last) = {
                let powers = self.powers.lock();
                if let Some(p) = powers.get(i) {
                    return p.clone();
                }
                (powers.len(), powers.last().cloned())
            };
            let next = match last {
                None => BigUint::from(10u32).pow(QUADRATIC_SCAN_THRESHOLD as u32),
                Some(last) => self.multiplier.square_biguint(&last),
            };
            let mut powers = self.powers.lock();
            if powers.len() == len {
                powers.push(next);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use num_traits::{One, Zero};

    use super::*;

    #[test]
    fn short_strings() {
        let scanner = DecimalScanner::default();
        assert_eq!(scanner.parse("").unwrap(), BigUint::zero());
        assert_eq!(scanner.parse("0").unwrap(), BigUint::zero());
        assert_eq!(scanner.parse("000123").unwrap(), BigUint::from(123u32));
        assert_eq!(scanner.format(&scanner.parse("000123").unwrap()), "123");
        assert_eq!(scanner.format(&BigUint::zero()), "0");
    }

    #[test]
    fn rejects_non_digits() {
        let scanner = DecimalScanner::default();
        assert_eq!(
            scanner.parse("12a4"),
            Err(MulError::InvalidDigit {
                position: 2,
                found: 'a'
            })
        );
        assert!(matches!(
            scanner.parse("-5"),
            Err(MulError::InvalidDigit { position: 0, .. })
        ));
        assert!(scanner.parse("1 2").is_err());
        assert!(scanner.parse("١٢").is_err());
    }

    #[test]
    fn long_strings_split() {
        let scanner = DecimalScanner::default();
        let digits: String = (0..5000).map(|i| char::from(b'0' + (i * 7 % 10) as u8)).collect();
        let expected = BigUint::parse_bytes(digits.as_bytes(), 10).unwrap();
        assert_eq!(scanner.parse(&digits).unwrap(), expected);
        assert_eq!(scanner.format(&expected), digits.trim_start_matches('0'));
    }

    #[test]
    fn boundary_lengths() {
        let scanner = DecimalScanner::default();
        for len in [
            QUADRATIC_SCAN_THRESHOLD,
            QUADRATIC_SCAN_THRESHOLD + 1,
            2 * QUADRATIC_SCAN_THRESHOLD,
            2 * QUADRATIC_SCAN_THRESHOLD + 1,
        ] {
            let digits = "9".repeat(len);
            let expected = BigUint::from(10u32).pow(len as u32) - BigUint::one();
            assert_eq!(scanner.parse(&digits).unwrap(), expected, "len {len}");
        }
    }

    #[test]
    fn powers_are_memoized() {
        let scanner = DecimalScanner::default();
        let digits = "1".repeat(6 * QUADRATIC_SCAN_THRESHOLD);
        let _ = scanner.parse(&digits).unwrap();
        let powers = scanner.powers.lock();
        assert_eq!(powers.len(), 3);
        assert_eq!(powers[1], &powers[0] * &powers[0]);
    }

    #[test]
    fn concurrent_parses_share_powers() {
        let scanner = DecimalScanner::default();
        let digits: String = (0..10 * QUADRATIC_SCAN_THRESHOLD)
            .map(|i| char::from(b'0' + (i * 3 % 10) as u8))
            .collect();
        let expected = BigUint::parse_bytes(digits.as_bytes(), 10).unwrap();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| assert_eq!(scanner.parse(&digits).unwrap(), expected));
            }
        });
        let powers = scanner.powers.lock();
        assert_eq!(powers.len(), 4);
        for i in 1..powers.len() {
            assert_eq!(powers[i], &powers[i - 1] * &powers[i - 1]);
        }
    }
}
