//! # bigmul
//!
//! Arbitrary-precision integer multiplication with size-based dispatch:
//! schoolbook for small operands, Karatsuba in the middle range, and a
//! Schönhage–Strassen style FFT over Fermat rings for large ones.
//!
//! ```
//! use bigmul::{Multiplier, MultiplierConfig};
//! use num_bigint::BigInt;
//!
//! let m = Multiplier::new(MultiplierConfig::default()).unwrap();
//! assert_eq!(m.multiply(&BigInt::from(123), &BigInt::from(456)), BigInt::from(56_088));
//! ```

pub mod allocator;
pub mod arith;
pub mod bump;
pub mod config;
pub mod constants;
pub mod errors;
pub mod fermat;
pub mod fft;
pub mod fft_cache;
pub mod fft_core;
pub mod fft_poly;
pub mod karatsuba;
pub mod memory_est;
pub mod multiplier;
pub mod nat;
pub mod scan;

// Re-exports
pub use arith::{Arith, CpuFeatures, KernelLevel, Word};
pub use config::{AllocatorKind, MultiplierConfig};
pub use errors::MulError;
pub use fft_cache::{CacheStats, TransformCache, TransformCacheConfig};
pub use multiplier::{mul, mul_to, sqr, sqr_to, MulPath, Multiplier};
pub use scan::DecimalScanner;
