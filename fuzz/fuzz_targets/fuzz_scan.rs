#![no_main]

use libfuzzer_sys::fuzz_target;
use num_bigint::BigUint;

use bigmul::DecimalScanner;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let scanner = DecimalScanner::default();
    match scanner.parse(text) {
        Ok(value) => {
            let expected = if text.is_empty() {
                BigUint::default()
            } else {
                BigUint::parse_bytes(text.as_bytes(), 10).unwrap()
            };
            assert_eq!(value, expected);
            assert_eq!(scanner.parse(&scanner.format(&value)).unwrap(), value);
        }
        Err(_) => assert!(!text.bytes().all(|b| b.is_ascii_digit())),
    }
});
