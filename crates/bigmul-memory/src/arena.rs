//! Bump arenas recycled through a size-classed free list.
//!
//! An [`Arena`] hands out zeroed word slices by bump advance and frees them
//! all at once when dropped: the slab is reset and returned to its
//! [`ArenaPool`] class. Slices borrow the arena, so none can outlive the
//! release.
//!
//! A slab that cannot be reserved yields an unbacked arena of capacity zero:
//! every request on it fails and the caller allocates on demand instead.

use std::cell::Cell;
use std::collections::HashMap;

use bumpalo::Bump;
use parking_lot::Mutex;
use tracing::warn;

use crate::stats::{AtomicPoolStats, PoolStats};

/// Smallest arena capacity, in words.
pub const MIN_ARENA_WORDS: usize = 4096;

const WORD_BYTES: usize = std::mem::size_of::<u64>();

/// Free list of bump slabs keyed by capacity class (a power of two in words).
#[derive(Debug)]
pub struct ArenaPool {
    slabs: Mutex<HashMap<usize, Vec<Bump>>>,
    max_per_class: usize,
    stats: AtomicPoolStats,
}

impl ArenaPool {
    /// Create a pool retaining at most `max_per_class` idle slabs per class.
    #[must_use]
    pub fn new(max_per_class: usize) -> Self {
        Self {
            slabs: Mutex::new(HashMap::new()),
            max_per_class,
            stats: AtomicPoolStats::new(),
        }
    }

    /// Take an arena able to serve at least `words` words without overflow.
    pub fn acquire(&self, words: usize) -> Arena<'_> {
        let class = Self::size_class(words);
        let recycled = self.slabs.lock().get_mut(&class).and_then(Vec::pop);
        let bump = if let Some(bump) = recycled {
            self.stats.record_hit();
            Some(bump)
        } else {
            self.stats.record_miss();
            let bump = Self::reserve(class);
            if bump.is_none() {
                warn!(words = class, "arena slab allocation refused, serving from heap");
            }
            bump
        };
        Arena {
            capacity: if bump.is_some() { class } else { 0 },
            bump: bump.unwrap_or_default(),
            class,
            used: Cell::new(0),
            pool: self,
        }
    }

    fn reserve(class: usize) -> Option<Bump> {
        let bytes = class.checked_mul(WORD_BYTES)?;
        Bump::try_with_capacity(bytes).ok()
    }

    fn release(&self, class: usize, mut bump: Bump) {
        bump.reset();
        let mut slabs = self.slabs.lock();
        let free = slabs.entry(class).or_default();
        if free.len() < self.max_per_class {
            free.push(bump);
        } else {
            self.stats.record_eviction();
        }
    }

    fn size_class(words: usize) -> usize {
        words
            .max(MIN_ARENA_WORDS)
            .checked_next_power_of_two()
            .unwrap_or(usize::MAX)
    }

    /// Number of idle slabs across all classes.
    #[must_use]
    pub fn idle_slabs(&self) -> usize {
        self.slabs.lock().values().map(Vec::len).sum()
    }

    /// Pre-allocate idle slabs for `words`-word arenas, up to `count` in the class.
    pub fn warm(&self, words: usize, count: usize) {
        let class = Self::size_class(words);
        let mut slabs = self.slabs.lock();
        let free = slabs.entry(class).or_default();
        let to_add = count.min(self.max_per_class).saturating_sub(free.len());
        for _ in 0..to_add {
            match Self::reserve(class) {
                Some(bump) => free.push(bump),
                None => {
                    warn!(words = class, "arena warm-up stopped, slab allocation refused");
                    break;
                }
            }
        }
    }

    /// Snapshot of acquire statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.stats.snapshot()
    }

    /// Drop all idle slabs.
    pub fn clear(&self) {
        self.slabs.lock().clear();
    }
}

impl Default for ArenaPool {
    fn default() -> Self {
        Self::new(4)
    }
}

/// A bump arena checked out of an [`ArenaPool`].
///
/// Not `Sync`: one arena serves one top-level operation on one thread.
pub struct Arena<'p> {
    bump: Bump,
    class: usize,
    capacity: usize,
    used: Cell<usize>,
    pool: &'p ArenaPool,
}

impl Arena<'_> {
    /// Carve a zeroed slice of `len` words, or `None` if it would exceed
    /// the arena's capacity or the slab cannot provide it.
    #[allow(clippy::mut_from_ref)]
    pub fn try_alloc_words(&self, len: usize) -> Option<&mut [u64]> {
        let used = self.used.get();
        if used.checked_add(len)? > self.capacity {
            return None;
        }
        let slice = self.bump.try_alloc_slice_fill_default(len).ok()?;
        self.used.set(used + len);
        Some(slice)
    }

    /// Capacity in words; zero when the slab could not be reserved.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the arena owns a slab.
    #[must_use]
    pub fn is_backed(&self) -> bool {
        self.capacity > 0
    }

    /// Words handed out so far.
    #[must_use]
    pub fn used(&self) -> usize {
        self.used.get()
    }

    /// Words still available.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity - self.used.get()
    }
}

impl Drop for Arena<'_> {
    fn drop(&mut self) {
        if self.is_backed() {
            let bump = std::mem::take(&mut self.bump);
            self.pool.release(self.class, bump);
        }
    }
}
