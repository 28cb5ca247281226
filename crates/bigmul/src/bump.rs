//! Bump allocation for one top-level multiplication.

use std::cell::Cell;

use bigmul_memory::{Arena, ArenaPool};
use tracing::debug;

use crate::allocator::{TempAllocator, TempBuf};

/// Arena-backed [`TempAllocator`].
///
/// Buffers are carved by bump advance and reclaimed together when the
/// allocator is dropped. A request past the estimated capacity, or any
/// request when no slab could be reserved, gets a heap buffer instead and is
/// counted as a fallback.
pub struct BumpAllocator<'p> {
    arena: Arena<'p>,
    fallbacks: Cell<usize>,
}

impl<'p> BumpAllocator<'p> {
    /// Check out an arena for roughly `capacity` words.
    #[must_use]
    pub fn acquire(pool: &'p ArenaPool, capacity: usize) -> Self {
        Self {
            arena: pool.acquire(capacity),
            fallbacks: Cell::new(0),
        }
    }

    /// Arena capacity in words.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Words handed out from the arena.
    #[must_use]
    pub fn used(&self) -> usize {
        self.arena.used()
    }

    /// Words still available in the arena.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.arena.remaining()
    }

    /// Requests served from the heap because the arena was full or unbacked.
    #[must_use]
    pub fn fallbacks(&self) -> usize {
        self.fallbacks.get()
    }
}

impl TempAllocator for BumpAllocator<'_> {
    fn alloc_words(&self, len: usize) -> TempBuf<'_> {
        match self.arena.try_alloc_words(len) {
            Some(slice) => TempBuf::Arena(slice),
            None => {
                self.fallbacks.set(self.fallbacks.get() + 1);
                debug!(
                    requested = len,
                    remaining = self.arena.remaining(),
                    backed = self.arena.is_backed(),
                    "arena exhausted, using heap buffer"
                );
                TempBuf::Owned(vec![0; len])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_from_arena() {
        let pool = ArenaPool::default();
        let alloc = BumpAllocator::acquire(&pool, 1000);
        let a = alloc.alloc_fermat(10);
        let b = alloc.alloc_fermat_slice(4, 10);
        assert!(matches!(a, TempBuf::Arena(_)));
        assert_eq!(a.len() + b.len(), 55);
        assert_eq!(alloc.used(), 55);
        assert_eq!(alloc.fallbacks(), 0);
    }

    #[test]
    fn overflow_falls_back_to_heap() {
        let pool = ArenaPool::default();
        let alloc = BumpAllocator::acquire(&pool, 16);
        let cap = alloc.capacity();
        let _fill = alloc.alloc_words(cap);
        let extra = alloc.alloc_words(8);
        assert!(matches!(extra, TempBuf::Owned(_)));
        assert_eq!(extra.len(), 8);
        assert_eq!(alloc.fallbacks(), 1);
        assert_eq!(alloc.remaining(), 0);
    }

    #[test]
    fn refused_slab_serves_every_request_from_heap() {
        let pool = ArenaPool::default();
        let alloc = BumpAllocator::acquire(&pool, 1 << 60);
        assert_eq!(alloc.capacity(), 0);
        let mut a = alloc.alloc_words(32);
        let b = alloc.alloc_fermat(4);
        assert!(matches!(a, TempBuf::Owned(_)));
        assert!(matches!(b, TempBuf::Owned(_)));
        assert!(a.iter().chain(b.iter()).all(|&w| w == 0));
        a.fill(1);
        assert_eq!(alloc.fallbacks(), 2);
        assert_eq!(alloc.used(), 0);
    }

    #[test]
    fn release_recycles_arena() {
        let pool = ArenaPool::default();
        {
            let alloc = BumpAllocator::acquire(&pool, 5000);
            let mut buf = alloc.alloc_words(100);
            buf.fill(3);
        }
        assert_eq!(pool.idle_slabs(), 1);
        let alloc = BumpAllocator::acquire(&pool, 5000);
        assert!(alloc.alloc_words(100).iter().all(|&w| w == 0));
        assert_eq!(pool.stats().hits, 1);
    }
}
