//! Word-buffer pool with size classes for scratch reuse.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::stats::{AtomicPoolStats, PoolStats};

/// Smallest pooled class, in words.
const MIN_CLASS_WORDS: usize = 64;

/// Pool of `Vec<u64>` scratch buffers, organized by size class (64 words times a power of 4).
///
/// Every buffer handed out is zero-filled to the requested length; its
/// capacity is at least the class size, so a buffer released back lands in a
/// class whose requests it can always satisfy.
#[derive(Debug)]
pub struct WordPool {
    pools: Mutex<HashMap<usize, Vec<Vec<u64>>>>,
    max_words: usize,
    max_per_class: usize,
    stats: AtomicPoolStats,
}

impl WordPool {
    /// Create a pool keeping buffers up to `max_words` long, at most
    /// `max_per_class` per size class.
    #[must_use]
    pub fn new(max_words: usize, max_per_class: usize) -> Self {
        Self {
            pools: Mutex::new(HashMap::new()),
            max_words,
            max_per_class,
            stats: AtomicPoolStats::new(),
        }
    }

    /// Get a zeroed buffer of exactly `words` words.
    pub fn acquire(&self, words: usize) -> Vec<u64> {
        if words > self.max_words {
            self.stats.record_miss();
            return vec![0; words];
        }
        let class = Self::size_class(words);
        let reused = self.pools.lock().get_mut(&class).and_then(Vec::pop);
        match reused {
            Some(mut buf) => {
                self.stats.record_hit();
                buf.clear();
                buf.resize(words, 0);
                buf
            }
            None => {
                self.stats.record_miss();
                let mut buf = Vec::with_capacity(class);
                buf.resize(words, 0);
                buf
            }
        }
    }

    /// Return a buffer for reuse.
    pub fn release(&self, buf: Vec<u64>) {
        let capacity = buf.capacity();
        if capacity > self.max_words || capacity < MIN_CLASS_WORDS {
            self.stats.record_eviction();
            return;
        }
        let class = Self::class_fitting(capacity);
        let mut pools = self.pools.lock();
        let pool = pools.entry(class).or_default();
        if pool.len() < self.max_per_class {
            pool.push(buf);
        } else {
            self.stats.record_eviction();
        }
    }

    /// Smallest class holding `words` words.
    fn size_class(words: usize) -> usize {
        let mut class = MIN_CLASS_WORDS;
        while class < words {
            class *= 4;
        }
        class
    }

    /// Largest class a buffer of `capacity` words can serve.
    fn class_fitting(capacity: usize) -> usize {
        let mut class = MIN_CLASS_WORDS;
        while class * 4 <= capacity {
            class *= 4;
        }
        class
    }

    /// Total number of pooled buffers.
    #[must_use]
    pub fn total_pooled(&self) -> usize {
        self.pools.lock().values().map(Vec::len).sum()
    }

    /// Snapshot of pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.stats.snapshot()
    }

    /// Reset statistics counters.
    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Drop all pooled buffers.
    pub fn clear(&self) {
        self.pools.lock().clear();
    }

    /// Pre-populate the class serving `words`-word requests up to `count` buffers.
    pub fn warm(&self, words: usize, count: usize) {
        if words > self.max_words {
            return;
        }
        let class = Self::size_class(words);
        let mut pools = self.pools.lock();
        let pool = pools.entry(class).or_default();
        let to_add = count
            .min(self.max_per_class)
            .saturating_sub(pool.len());
        for _ in 0..to_add {
            pool.push(Vec::with_capacity(class));
        }
    }
}

impl Default for WordPool {
    fn default() -> Self {
        // 2^24 words = 128 MiB per buffer.
        Self::new(1 << 24, 32)
    }
}
