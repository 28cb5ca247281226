//! Size-based dispatch between schoolbook, Karatsuba and FFT multiplication.
//!
//! The combined bit length of the operands picks the path. Thresholds can be
//! changed at runtime; every path produces identical results, so a change
//! only affects speed.

use std::fmt;
use std::sync::{Arc, OnceLock};

use bigmul_memory::{ArenaPool, PoolStats, WordPool};
use num_bigint::{BigInt, BigUint};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::allocator::PoolAllocator;
use crate::arith::{Arith, KernelLevel, Word};
use crate::bump::BumpAllocator;
use crate::config::{validate_thresholds, AllocatorKind, MultiplierConfig};
use crate::errors::MulError;
use crate::fft::{fft_mul, fft_sqr};
use crate::fft_cache::{CacheStats, TransformCache, TransformCacheConfig};
use crate::fft_core::FftContext;
use crate::fft_poly::FftPlan;
use crate::karatsuba::{karatsuba_mul, karatsuba_sqr, leaf_words};
use crate::memory_est::estimate_bump_capacity;
use crate::nat::{bit_len, from_biguint, mul_basic, to_biguint, to_u32_digits, trimmed};

/// Algorithm chosen for a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MulPath {
    /// Quadratic schoolbook multiplication.
    Schoolbook,
    /// Karatsuba recursion.
    Karatsuba,
    /// Fermat-ring FFT.
    Fft,
}

impl fmt::Display for MulPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schoolbook => write!(f, "schoolbook"),
            Self::Karatsuba => write!(f, "karatsuba"),
            Self::Fft => write!(f, "fft"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Thresholds {
    karatsuba: usize,
    fft: usize,
}

impl Thresholds {
    fn path(self, bits: usize) -> MulPath {
        if bits < self.karatsuba {
            MulPath::Schoolbook
        } else if bits < self.fft {
            MulPath::Karatsuba
        } else {
            MulPath::Fft
        }
    }
}

/// Multiplication engine: thresholds, word kernels, scratch memory and a
/// transform cache.
///
/// `Send + Sync`; one instance can serve any number of threads.
pub struct Multiplier {
    thresholds: RwLock<Thresholds>,
    arith: Arith,
    allocator: AllocatorKind,
    cache: Arc<TransformCache>,
    arenas: ArenaPool,
    pool: WordPool,
}

impl fmt::Debug for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = *self.thresholds.read();
        f.debug_struct("Multiplier")
            .field("karatsuba_threshold", &t.karatsuba)
            .field("fft_threshold", &t.fft)
            .field("kernel", &self.arith.level())
            .field("allocator", &self.allocator)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

static GLOBAL: OnceLock<Multiplier> = OnceLock::new();

impl Multiplier {
    /// Build a multiplier with the detected word kernel.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure of `config`.
    pub fn new(config: MultiplierConfig) -> Result<Self, MulError> {
        Self::with_arith(config, Arith::detect())
    }

    /// Build a multiplier on an explicit word kernel.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure of `config`.
    pub fn with_arith(config: MultiplierConfig, arith: Arith) -> Result<Self, MulError> {
        Self::with_cache(config, arith, Arc::new(TransformCache::new(config.cache)))
    }

    /// Build a multiplier sharing an existing transform cache, whose
    /// configuration is replaced by `config.cache`.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure of `config`.
    pub fn with_cache(
        config: MultiplierConfig,
        arith: Arith,
        cache: Arc<TransformCache>,
    ) -> Result<Self, MulError> {
        config.validate()?;
        cache.set_config(config.cache)?;
        Ok(Self::assemble(config, arith, cache))
    }

    /// Wire up an engine from an already validated `config`.
    fn assemble(config: MultiplierConfig, arith: Arith, cache: Arc<TransformCache>) -> Self {
        Self {
            thresholds: RwLock::new(Thresholds {
                karatsuba: config.karatsuba_threshold,
                fft: config.fft_threshold,
            }),
            arith,
            allocator: config.allocator,
            cache,
            arenas: ArenaPool::default(),
            pool: WordPool::default(),
        }
    }

    /// Process-wide instance with default settings.
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(Self::default)
    }

    /// Current settings.
    #[must_use]
    pub fn config(&self) -> MultiplierConfig {
        let t = *self.thresholds.read();
        MultiplierConfig {
            karatsuba_threshold: t.karatsuba,
            fft_threshold: t.fft,
            cache: self.cache.config(),
            allocator: self.allocator,
        }
    }

    /// Combined operand bits from which Karatsuba is used.
    #[must_use]
    pub fn karatsuba_threshold(&self) -> usize {
        self.thresholds.read().karatsuba
    }

    /// Combined operand bits from which FFT is used.
    #[must_use]
    pub fn fft_threshold(&self) -> usize {
        self.thresholds.read().fft
    }

    /// Change the Karatsuba threshold.
    ///
    /// # Errors
    ///
    /// Returns [`MulError::InvalidThreshold`] if `bits` is below the minimum
    /// or above the FFT threshold; the setting is left unchanged.
    pub fn set_karatsuba_threshold(&self, bits: usize) -> Result<(), MulError> {
        let mut t = self.thresholds.write();
        validate_thresholds(bits, t.fft)?;
        t.karatsuba = bits;
        debug!(karatsuba_threshold = bits, "threshold updated");
        Ok(())
    }

    /// Change the FFT threshold.
    ///
    /// # Errors
    ///
    /// Returns [`MulError::InvalidThreshold`] if `bits` is below the minimum
    /// or below the Karatsuba threshold; the setting is left unchanged.
    pub fn set_fft_threshold(&self, bits: usize) -> Result<(), MulError> {
        let mut t = self.thresholds.write();
        validate_thresholds(t.karatsuba, bits)?;
        t.fft = bits;
        debug!(fft_threshold = bits, "threshold updated");
        Ok(())
    }

    /// Set both thresholds at once.
    ///
    /// # Errors
    ///
    /// Returns [`MulError::InvalidThreshold`] for an invalid pair.
    pub fn set_thresholds(&self, karatsuba: usize, fft: usize) -> Result<(), MulError> {
        validate_thresholds(karatsuba, fft)?;
        *self.thresholds.write() = Thresholds { karatsuba, fft };
        debug!(karatsuba_threshold = karatsuba, fft_threshold = fft, "thresholds updated");
        Ok(())
    }

    /// Reconfigure the transform cache.
    ///
    /// # Errors
    ///
    /// Returns [`MulError::InvalidCacheConfig`] for an unusable setting.
    pub fn set_cache_config(&self, config: TransformCacheConfig) -> Result<(), MulError> {
        self.cache.set_config(config)
    }

    /// Turn caching on or off, keeping the other cache settings.
    ///
    /// # Errors
    ///
    /// Returns [`MulError::InvalidCacheConfig`] when enabling a cache
    /// configured with zero entries.
    pub fn set_cache_enabled(&self, enabled: bool) -> Result<(), MulError> {
        self.cache.set_config(TransformCacheConfig {
            enabled,
            ..self.cache.config()
        })
    }

    /// Drop every cached transform and reset the cache counters.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// The transform cache in use.
    #[must_use]
    pub fn cache(&self) -> &Arc<TransformCache> {
        &self.cache
    }

    /// Temporary allocation strategy.
    #[must_use]
    pub fn allocator_kind(&self) -> AllocatorKind {
        self.allocator
    }

    /// Counters of the active scratch allocator.
    #[must_use]
    pub fn allocator_stats(&self) -> PoolStats {
        match self.allocator {
            AllocatorKind::Arena => self.arenas.stats(),
            AllocatorKind::Pool => self.pool.stats(),
        }
    }

    /// Word kernel in use.
    #[must_use]
    pub fn kernel_level(&self) -> KernelLevel {
        self.arith.level()
    }

    /// Pre-allocate scratch memory for FFT products of `words` words in total.
    pub fn prewarm(&self, words: usize) {
        match self.allocator {
            AllocatorKind::Arena => self.arenas.warm(estimate_bump_capacity(words), 1),
            AllocatorKind::Pool => {
                let plan = FftPlan::for_product(words);
                self.pool.warm(plan.values_len(), 3);
                self.pool.warm(plan.n + 1, 4);
            }
        }
        debug!(words, allocator = %self.allocator, "scratch memory prewarmed");
    }

    /// Path a product of operands with `a_bits` and `b_bits` bits takes.
    #[must_use]
    pub fn path_for(&self, a_bits: u64, b_bits: u64) -> MulPath {
        let bits = usize::try_from(a_bits.saturating_add(b_bits)).unwrap_or(usize::MAX);
        self.thresholds.read().path(bits)
    }

    /// a·b.
    #[must_use]
    pub fn multiply(&self, a: &BigInt, b: &BigInt) -> BigInt {
        let z = self.mul_words(&from_biguint(a.magnitude()), &from_biguint(b.magnitude()));
        BigInt::from_biguint(a.sign() * b.sign(), to_biguint(&z))
    }

    /// a².
    #[must_use]
    pub fn square(&self, a: &BigInt) -> BigInt {
        BigInt::from(self.square_biguint(a.magnitude()))
    }

    /// dst = a·b, reusing the storage of `dst`.
    pub fn multiply_into(&self, dst: &mut BigInt, a: &BigInt, b: &BigInt) {
        let z = self.mul_words(&from_biguint(a.magnitude()), &from_biguint(b.magnitude()));
        dst.assign_from_slice(a.sign() * b.sign(), &to_u32_digits(&z));
    }

    /// dst = a², reusing the storage of `dst`.
    pub fn square_into(&self, dst: &mut BigInt, a: &BigInt) {
        let z = self.sqr_words(&from_biguint(a.magnitude()));
        dst.assign_from_slice(num_bigint::Sign::Plus, &to_u32_digits(&z));
    }

    /// a·b on magnitudes.
    #[must_use]
    pub fn multiply_biguint(&self, a: &BigUint, b: &BigUint) -> BigUint {
        to_biguint(&self.mul_words(&from_biguint(a), &from_biguint(b)))
    }

    /// a² on magnitudes.
    #[must_use]
    pub fn square_biguint(&self, a: &BigUint) -> BigUint {
        to_biguint(&self.sqr_words(&from_biguint(a)))
    }

    /// dst = a·b on magnitudes, reusing the storage of `dst`.
    pub fn multiply_biguint_into(&self, dst: &mut BigUint, a: &BigUint, b: &BigUint) {
        let z = self.mul_words(&from_biguint(a), &from_biguint(b));
        dst.assign_from_slice(&to_u32_digits(&z));
    }

    /// dst = a² on magnitudes, reusing the storage of `dst`.
    pub fn square_biguint_into(&self, dst: &mut BigUint, a: &BigUint) {
        let z = self.sqr_words(&from_biguint(a));
        dst.assign_from_slice(&to_u32_digits(&z));
    }

    /// Product of two word vectors (least significant word first).
    #[must_use]
    pub fn mul_words(&self, x: &[Word], y: &[Word]) -> Vec<Word> {
        let (x, y) = (trimmed(x), trimmed(y));
        if x.is_empty() || y.is_empty() {
            return Vec::new();
        }
        let t = *self.thresholds.read();
        let bits = bit_len(x) + bit_len(y);
        let path = t.path(bits);
        trace!(bits, %path, "multiply");
        match path {
            MulPath::Schoolbook => mul_basic(&self.arith, x, y),
            MulPath::Karatsuba => karatsuba_mul(&self.arith, x, y, leaf_words(t.karatsuba)),
            MulPath::Fft => self.with_context(x.len() + y.len(), t, |ctx| {
                fft_mul(ctx, Some(&*self.cache), x, y)
            }),
        }
    }

    /// Square of a word vector.
    #[must_use]
    pub fn sqr_words(&self, x: &[Word]) -> Vec<Word> {
        let x = trimmed(x);
        if x.is_empty() {
            return Vec::new();
        }
        let t = *self.thresholds.read();
        let bits = 2 * bit_len(x);
        let path = t.path(bits);
        trace!(bits, %path, "square");
        match path {
            MulPath::Schoolbook => mul_basic(&self.arith, x, x),
            MulPath::Karatsuba => karatsuba_sqr(&self.arith, x, leaf_words(t.karatsuba)),
            MulPath::Fft => {
                self.with_context(2 * x.len(), t, |ctx| fft_sqr(ctx, Some(&*self.cache), x))
            }
        }
    }

    fn with_context<R>(
        &self,
        words: usize,
        t: Thresholds,
        f: impl FnOnce(&FftContext<'_>) -> R,
    ) -> R {
        let leaf = leaf_words(t.karatsuba);
        match self.allocator {
            AllocatorKind::Arena => {
                let alloc = BumpAllocator::acquire(&self.arenas, estimate_bump_capacity(words));
                let result = f(&FftContext {
                    arith: self.arith,
                    leaf,
                    alloc: &alloc,
                });
                if alloc.fallbacks() > 0 {
                    debug!(
                        words,
                        capacity = alloc.capacity(),
                        fallbacks = alloc.fallbacks(),
                        "arena estimate exceeded"
                    );
                }
                result
            }
            AllocatorKind::Pool => {
                let alloc = PoolAllocator::new(&self.pool);
                f(&FftContext {
                    arith: self.arith,
                    leaf,
                    alloc: &alloc,
                })
            }
        }
    }
}

impl Default for Multiplier {
    fn default() -> Self {
        let config = MultiplierConfig::default();
        Self::assemble(config, Arith::detect(), Arc::new(TransformCache::new(config.cache)))
    }
}

/// a·b through the global multiplier.
#[must_use]
pub fn mul(a: &BigUint, b: &BigUint) -> BigUint {
    Multiplier::global().multiply_biguint(a, b)
}

/// a² through the global multiplier.
#[must_use]
pub fn sqr(a: &BigUint) -> BigUint {
    Multiplier::global().square_biguint(a)
}

/// dst = a·b through the global multiplier.
pub fn mul_to(dst: &mut BigUint, a: &BigUint, b: &BigUint) {
    Multiplier::global().multiply_biguint_into(dst, a, b);
}

/// dst = a² through the global multiplier.
pub fn sqr_to(dst: &mut BigUint, a: &BigUint) {
    Multiplier::global().square_biguint_into(dst, a);
}
