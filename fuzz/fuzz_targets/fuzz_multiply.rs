#![no_main]

use libfuzzer_sys::fuzz_target;
use num_bigint::BigUint;
use std::sync::OnceLock;

use bigmul::{AllocatorKind, Multiplier, MultiplierConfig};

fn engines() -> &'static [Multiplier; 3] {
    static ENGINES: OnceLock<[Multiplier; 3]> = OnceLock::new();
    ENGINES.get_or_init(|| {
        let forced = |karatsuba: usize, fft: usize, allocator: AllocatorKind| {
            let mut config = MultiplierConfig {
                karatsuba_threshold: karatsuba,
                fft_threshold: fft,
                allocator,
                ..MultiplierConfig::default()
            };
            config.cache.min_bit_len = 0;
            Multiplier::new(config).unwrap()
        };
        [
            forced(64, usize::MAX, AllocatorKind::Arena),
            forced(64, 64, AllocatorKind::Arena),
            forced(64, 64, AllocatorKind::Pool),
        ]
    })
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    // First byte picks the split point between the two operands.
    let split = 1 + usize::from(data[0]) * (data.len() - 1) / 256;
    let a = BigUint::from_bytes_le(&data[1..split]);
    let b = BigUint::from_bytes_le(&data[split..]);
    let expected = &a * &b;

    for m in engines() {
        assert_eq!(m.multiply_biguint(&a, &b), expected);
        assert_eq!(m.square_biguint(&a), &a * &a);
    }
});
