//! Thread-safe LRU cache of forward transforms.
//!
//! Entries are keyed by a fingerprint of the operand words and the
//! transform shape, but a lookup only hits when the stored operand and
//! shape compare equal to the request, so a fingerprint collision is a
//! miss rather than a wrong answer.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::arith::Word;
use crate::constants::{DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_MIN_BITS};
use crate::errors::MulError;
use crate::fft_poly::{FftPlan, PolValues};
use crate::nat::bit_len;

/// Cache behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformCacheConfig {
    /// Whether transforms are cached at all.
    pub enabled: bool,
    /// Maximum number of cached transforms.
    pub max_entries: usize,
    /// Operands shorter than this many bits are never cached.
    pub min_bit_len: usize,
}

impl Default for TransformCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            min_bit_len: DEFAULT_CACHE_MIN_BITS,
        }
    }
}

impl TransformCacheConfig {
    /// A configuration with caching turned off.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`MulError::InvalidCacheConfig`] when caching is enabled with
    /// room for zero entries.
    pub fn validate(&self) -> Result<(), MulError> {
        if self.enabled && self.max_entries == 0 {
            return Err(MulError::InvalidCacheConfig(
                "max_entries must be positive when caching is enabled".into(),
            ));
        }
        Ok(())
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that had to compute the transform.
    pub misses: u64,
    /// Entries dropped to make room.
    pub evictions: u64,
    /// Entries currently held.
    pub size: usize,
    /// hits / (hits + misses), or 0 before any lookup.
    pub hit_rate: f64,
}

struct CacheEntry {
    operand: Vec<Word>,
    values: Arc<PolValues>,
    last_used: u64,
}

struct CacheState {
    config: TransformCacheConfig,
    entries: HashMap<u64, CacheEntry>,
    tick: u64,
}

/// Bounded cache of [`PolValues`], shared between threads.
pub struct TransformCache {
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl std::fmt::Debug for TransformCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformCache")
            .field("config", &self.config())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

fn fingerprint(operand: &[Word], plan: &FftPlan) -> u64 {
    let mut hasher = DefaultHasher::new();
    operand.hash(&mut hasher);
    (plan.k, plan.m, plan.n).hash(&mut hasher);
    hasher.finish()
}

impl TransformCache {
    /// Create a cache. The configuration is not validated here.
    #[must_use]
    pub fn new(config: TransformCacheConfig) -> Self {
        Self {
            state: Mutex::new(CacheState {
                config,
                entries: HashMap::new(),
                tick: 0,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> TransformCacheConfig {
        self.state.lock().config
    }

    /// Replace the configuration. Disabling drops every entry, shrinking
    /// evicts the least recently used ones.
    ///
    /// # Errors
    ///
    /// Returns [`MulError::InvalidCacheConfig`] if `config` fails validation.
    pub fn set_config(&self, config: TransformCacheConfig) -> Result<(), MulError> {
        config.validate()?;
        let mut state = self.state.lock();
        state.config = config;
        if !config.enabled {
            state.entries.clear();
        }
        while state.entries.len() > config.max_entries {
            self.evict_oldest(&mut state);
        }
        debug!(
            enabled = config.enabled,
            max_entries = config.max_entries,
            min_bit_len = config.min_bit_len,
            "transform cache reconfigured"
        );
        Ok(())
    }

    /// Whether an operand of `bits` significant bits is eligible for caching.
    #[must_use]
    pub fn accepts(&self, bits: usize) -> bool {
        let config = self.config();
        config.enabled && bits >= config.min_bit_len
    }

    /// Cached transform of `operand` with shape `plan`, if present.
    ///
    /// Ineligible operands return `None` without touching the counters.
    ///
    /// # Panics
    ///
    /// Panics if a matching entry holds values of the wrong length.
    pub fn get(&self, operand: &[Word], plan: &FftPlan) -> Option<Arc<PolValues>> {
        if !self.accepts(bit_len(operand)) {
            return None;
        }
        let key = fingerprint(operand, plan);
        let mut state = self.state.lock();
        state.tick += 1;
        let tick = state.tick;
        match state.entries.get_mut(&key) {
            Some(entry) if entry.values.matches(plan) && entry.operand == operand => {
                assert_eq!(
                    entry.values.values.len(),
                    plan.values_len(),
                    "cached transform shape mismatch"
                );
                entry.last_used = tick;
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(&entry.values))
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store the transform of `operand`. Ignored when the operand is not
    /// eligible; evicts the least recently used entry when full.
    pub fn put(&self, operand: &[Word], values: Arc<PolValues>) {
        if !self.accepts(bit_len(operand)) {
            return;
        }
        let plan = FftPlan {
            k: values.k,
            m: values.m,
            n: values.n,
        };
        let key = fingerprint(operand, &plan);
        let mut state = self.state.lock();
        state.tick += 1;
        let tick = state.tick;
        if !state.entries.contains_key(&key) && state.entries.len() >= state.config.max_entries {
            self.evict_oldest(&mut state);
        }
        state.entries.insert(
            key,
            CacheEntry {
                operand: operand.to_vec(),
                values,
                last_used: tick,
            },
        );
    }

    fn evict_oldest(&self, state: &mut CacheState) {
        let oldest = state
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(&key, _)| key);
        if let Some(key) = oldest {
            state.entries.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(remaining = state.entries.len(), "evicted cached transform");
        }
    }

    /// Number of cached transforms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether the cache holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry and reset the counters.
    pub fn clear(&self) {
        self.state.lock().entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }

    /// Counter snapshot.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        CacheStats {
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.len(),
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
        }
    }
}

impl Default for TransformCache {
    fn default() -> Self {
        Self::new(TransformCacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_config(max_entries: usize) -> TransformCacheConfig {
        TransformCacheConfig {
            enabled: true,
            max_entries,
            min_bit_len: 0,
        }
    }

    fn plan() -> FftPlan {
        FftPlan { k: 2, m: 1, n: 1 }
    }

    fn values(fill: Word) -> Arc<PolValues> {
        let plan = plan();
        Arc::new(PolValues {
            k: plan.k,
            m: plan.m,
            n: plan.n,
            values: vec![fill; plan.values_len()],
        })
    }

    #[test]
    fn put_then_get() {
        let cache = TransformCache::new(open_config(4));
        assert!(cache.get(&[1, 2], &plan()).is_none());
        cache.put(&[1, 2], values(7));
        let hit = cache.get(&[1, 2], &plan()).unwrap();
        assert_eq!(hit.values[0], 7);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 1));
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn different_operand_or_shape_misses() {
        let cache = TransformCache::new(open_config(4));
        cache.put(&[1, 2], values(7));
        assert!(cache.get(&[1, 3], &plan()).is_none());
        let other = FftPlan { k: 2, m: 2, n: 1 };
        assert!(cache.get(&[1, 2], &other).is_none());
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = TransformCache::new(open_config(2));
        cache.put(&[1], values(1));
        cache.put(&[2], values(2));
        assert!(cache.get(&[1], &plan()).is_some());
        cache.put(&[3], values(3));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&[2], &plan()).is_none());
        assert!(cache.get(&[1], &plan()).is_some());
        assert!(cache.get(&[3], &plan()).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn small_operands_bypass() {
        let cache = TransformCache::new(TransformCacheConfig {
            min_bit_len: 1000,
            ..open_config(4)
        });
        cache.put(&[1], values(1));
        assert!(cache.is_empty());
        assert!(cache.get(&[1], &plan()).is_none());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn min_bit_len_counts_significant_bits() {
        let cache = TransformCache::new(TransformCacheConfig {
            min_bit_len: 100,
            ..open_config(4)
        });
        // two words, but only 65 significant bits
        cache.put(&[0, 1], values(1));
        assert!(cache.is_empty());
        assert!(!cache.accepts(99));
        assert!(cache.accepts(100));
        cache.put(&[0, 1 << 36], values(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn disabling_clears_entries() {
        let cache = TransformCache::new(open_config(4));
        cache.put(&[1], values(1));
        cache.set_config(TransformCacheConfig::disabled()).unwrap();
        assert!(cache.is_empty());
        cache.put(&[1], values(1));
        assert!(cache.is_empty());
    }

    #[test]
    fn shrinking_evicts() {
        let cache = TransformCache::new(open_config(4));
        for i in 0..4 {
            cache.put(&[i], values(i));
        }
        cache.set_config(open_config(1)).unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&[3], &plan()).is_some());
    }

    #[test]
    fn rejects_zero_capacity() {
        let cache = TransformCache::default();
        let err = cache.set_config(open_config(0)).unwrap_err();
        assert!(matches!(err, MulError::InvalidCacheConfig(_)));
        assert_eq!(cache.config(), TransformCacheConfig::default());
    }

    #[test]
    fn clear_resets_counters() {
        let cache = TransformCache::new(open_config(4));
        cache.put(&[1], values(1));
        let _ = cache.get(&[1], &plan());
        cache.clear();
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    #[should_panic(expected = "cached transform shape mismatch")]
    fn corrupt_entry_panics() {
        let cache = TransformCache::new(open_config(4));
        let mut bad = (*values(1)).clone();
        bad.values.pop();
        cache.put(&[1], Arc::new(bad));
        let _ = cache.get(&[1], &plan());
    }

    #[test]
    fn concurrent_access() {
        use std::thread;

        let cache = Arc::new(TransformCache::new(open_config(1000)));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..50 {
                        let operand = [t * 100 + i];
                        cache.put(&operand, values(i));
                        assert_eq!(cache.get(&operand, &plan()).unwrap().values[0], i);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 200);
        assert_eq!(cache.stats().hits, 200);
    }

    #[test]
    fn config_serde_round_trip() {
        let config = TransformCacheConfig {
            enabled: false,
            max_entries: 9,
            min_bit_len: 42,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<TransformCacheConfig>(&json).unwrap(), config);
        let partial: TransformCacheConfig = serde_json::from_str(r#"{"max_entries":3}"#).unwrap();
        assert_eq!(partial.max_entries, 3);
        assert!(partial.enabled);
    }
}
