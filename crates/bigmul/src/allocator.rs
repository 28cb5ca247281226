//! Scratch allocation for transform temporaries.
//!
//! FFT code asks a [`TempAllocator`] for zeroed word buffers and never frees
//! them explicitly: each [`TempBuf`] gives its memory back when dropped,
//! whichever strategy produced it.

use std::ops::{Deref, DerefMut};

use bigmul_memory::{PoolStats, WordPool};

use crate::arith::Word;

/// Source of zeroed scratch buffers.
pub trait TempAllocator {
    /// A zeroed buffer of `len` words.
    fn alloc_words(&self, len: usize) -> TempBuf<'_>;

    /// One Fermat value of ring size `n` (n+1 words).
    fn alloc_fermat(&self, n: usize) -> TempBuf<'_> {
        self.alloc_words(n + 1)
    }

    /// `count` contiguous Fermat values of ring size `n`.
    fn alloc_fermat_slice(&self, count: usize, n: usize) -> TempBuf<'_> {
        self.alloc_words(count * (n + 1))
    }
}

/// A scratch buffer, returned to its origin on drop.
#[derive(Debug)]
pub enum TempBuf<'a> {
    /// Carved from an arena; reclaimed when the arena is released.
    Arena(&'a mut [Word]),
    /// Borrowed from a word pool; handed back on drop.
    Pooled {
        /// The buffer itself.
        buf: Vec<Word>,
        /// Pool it returns to.
        pool: &'a WordPool,
    },
    /// Plain heap memory.
    Owned(Vec<Word>),
}

impl Deref for TempBuf<'_> {
    type Target = [Word];

    fn deref(&self) -> &[Word] {
        match self {
            Self::Arena(slice) => slice,
            Self::Pooled { buf, .. } | Self::Owned(buf) => buf,
        }
    }
}

impl DerefMut for TempBuf<'_> {
    fn deref_mut(&mut self) -> &mut [Word] {
        match self {
            Self::Arena(slice) => slice,
            Self::Pooled { buf, .. } | Self::Owned(buf) => buf,
        }
    }
}

impl Drop for TempBuf<'_> {
    fn drop(&mut self) {
        if let Self::Pooled { buf, pool } = self {
            pool.release(std::mem::take(buf));
        }
    }
}

/// Allocator drawing from a shared [`WordPool`].
#[derive(Debug, Clone, Copy)]
pub struct PoolAllocator<'p> {
    pool: &'p WordPool,
}

impl<'p> PoolAllocator<'p> {
    /// Allocate from `pool`.
    #[must_use]
    pub fn new(pool: &'p WordPool) -> Self {
        Self { pool }
    }

    /// Usage statistics of the underlying pool.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

impl TempAllocator for PoolAllocator<'_> {
    fn alloc_words(&self, len: usize) -> TempBuf<'_> {
        TempBuf::Pooled {
            buf: self.pool.acquire(len),
            pool: self.pool,
        }
    }
}

/// Allocator that creates a fresh heap buffer every time.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapAllocator;

impl TempAllocator for HeapAllocator {
    fn alloc_words(&self, len: usize) -> TempBuf<'_> {
        TempBuf::Owned(vec![0; len])
    }
}
