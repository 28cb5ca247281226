//! Shared helpers for the workspace integration tests.

use num_bigint::BigUint;

use bigmul::{AllocatorKind, Multiplier, MultiplierConfig};

/// A multiplier pinned to one path, or using the defaults.
pub struct NamedEngine {
    /// Label used in assertion messages.
    pub name: &'static str,
    /// The engine itself.
    pub multiplier: Multiplier,
}

fn forced(karatsuba: usize, fft: usize, allocator: AllocatorKind) -> Multiplier {
    let mut config = MultiplierConfig {
        karatsuba_threshold: karatsuba,
        fft_threshold: fft,
        allocator,
        ..MultiplierConfig::default()
    };
    config.cache.min_bit_len = 0;
    match Multiplier::new(config) {
        Ok(m) => m,
        Err(err) => panic!("test engine rejected its configuration: {err}"),
    }
}

/// One engine per path and allocator, plus the default configuration.
#[must_use]
pub fn engines() -> Vec<NamedEngine> {
    vec![
        NamedEngine {
            name: "schoolbook",
            multiplier: forced(usize::MAX, usize::MAX, AllocatorKind::Arena),
        },
        NamedEngine {
            name: "karatsuba",
            multiplier: forced(64, usize::MAX, AllocatorKind::Arena),
        },
        NamedEngine {
            name: "fft-arena",
            multiplier: forced(64, 64, AllocatorKind::Arena),
        },
        NamedEngine {
            name: "fft-pool",
            multiplier: forced(64, 64, AllocatorKind::Pool),
        },
        NamedEngine {
            name: "default",
            multiplier: Multiplier::default(),
        },
    ]
}

/// Deterministic operand of exactly `bits` bits.
#[must_use]
pub fn operand(bits: u64, seed: u64) -> BigUint {
    if bits == 0 {
        return BigUint::default();
    }
    let mut state = (seed << 1) | 1;
    let words = bits.div_ceil(32);
    let digits: Vec<u32> = (0..words)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 32) as u32
        })
        .collect();
    let mut x = BigUint::new(digits);
    x.set_bit(bits - 1, true);
    let excess = x.bits() - bits;
    x >> excess
}
