//! Multiplier configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_FFT_THRESHOLD, DEFAULT_KARATSUBA_THRESHOLD, MIN_THRESHOLD_BITS};
use crate::errors::MulError;
use crate::fft_cache::TransformCacheConfig;

/// Where FFT temporaries come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocatorKind {
    /// One bump arena per top-level product, released in one step.
    #[default]
    Arena,
    /// Size-classed free list; each buffer returns on drop.
    Pool,
}

impl std::fmt::Display for AllocatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Arena => write!(f, "arena"),
            Self::Pool => write!(f, "pool"),
        }
    }
}

/// Settings for a [`crate::Multiplier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiplierConfig {
    /// Combined operand bits from which Karatsuba replaces schoolbook.
    pub karatsuba_threshold: usize,
    /// Combined operand bits from which the FFT path is taken.
    pub fft_threshold: usize,
    /// Transform cache settings.
    pub cache: TransformCacheConfig,
    /// Temporary allocation strategy.
    pub allocator: AllocatorKind,
}

impl Default for MultiplierConfig {
    fn default() -> Self {
        Self {
            karatsuba_threshold: DEFAULT_KARATSUBA_THRESHOLD,
            fft_threshold: DEFAULT_FFT_THRESHOLD,
            cache: TransformCacheConfig::default(),
            allocator: AllocatorKind::default(),
        }
    }
}

/// Check a pair of thresholds.
pub(crate) fn validate_thresholds(karatsuba: usize, fft: usize) -> Result<(), MulError> {
    for (name, value) in [("karatsuba", karatsuba), ("fft", fft)] {
        if value < MIN_THRESHOLD_BITS {
            return Err(MulError::InvalidThreshold {
                name,
                value,
                reason: "below the 64-bit minimum",
            });
        }
    }
    if fft < karatsuba {
        return Err(MulError::InvalidThreshold {
            name: "fft",
            value: fft,
            reason: "below the karatsuba threshold",
        });
    }
    Ok(())
}

impl MultiplierConfig {
    /// Check every setting.
    ///
    /// # Errors
    ///
    /// Returns [`MulError::InvalidThreshold`] for thresholds below
    /// [`MIN_THRESHOLD_BITS`] or an FFT threshold below the Karatsuba one,
    /// and [`MulError::InvalidCacheConfig`] for an unusable cache setting.
    pub fn validate(&self) -> Result<(), MulError> {
        validate_thresholds(self.karatsuba_threshold, self.fft_threshold)?;
        self.cache.validate()
    }

    /// Same settings with caching disabled.
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.cache.enabled = false;
        self
    }
}
