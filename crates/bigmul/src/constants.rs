//! Tuning constants and defaults.

/// Bits per word.
pub const W: usize = 64;

/// Default combined operand size (bits) from which Karatsuba replaces schoolbook.
pub const DEFAULT_KARATSUBA_THRESHOLD: usize = 4096;

/// Default combined operand size (bits) from which the FFT path is taken.
pub const DEFAULT_FFT_THRESHOLD: usize = 230_400;

/// Smallest accepted value for either threshold.
pub const MIN_THRESHOLD_BITS: usize = 64;

/// Karatsuba never recurses below this many words.
pub const MIN_KARATSUBA_LEAF_WORDS: usize = 4;

/// Below this length the word kernels always take the scalar path.
pub const MIN_UNROLLED_LEN: usize = 8;

/// Default number of cached forward transforms.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 128;

/// Default minimum operand size (bits) for transform caching.
pub const DEFAULT_CACHE_MIN_BITS: usize = 100_000;

/// Upper bound (bits of the product) for each transform size `k`: the
/// first index whose bound exceeds the product size is chosen.
pub const FFT_SIZE_THRESHOLD: [usize; 16] = [
    0,
    0,
    0,
    4 << 10,
    8 << 10,
    16 << 10,
    32 << 10,
    64 << 10,
    1 << 18,
    1 << 20,
    3 << 20,
    8 << 20,
    30 << 20,
    100 << 20,
    300 << 20,
    600 << 20,
];

/// Fermat rings of at least this many words multiply their pointwise
/// products with a nested negacyclic transform.
pub const NEGACYCLIC_MIN_WORDS: usize = 2048;

/// Decimal strings up to this many digits are parsed quadratically.
/// 1232 digits fit in 4096 bits.
pub const QUADRATIC_SCAN_THRESHOLD: usize = 1232;
