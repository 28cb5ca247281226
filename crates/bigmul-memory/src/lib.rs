//! # bigmul-memory
//!
//! Scratch-memory management for the multiplication engine.
//!
//! Provides a size-classed pool of word buffers and recyclable bump arenas,
//! both with lock-free usage counters.
#![warn(missing_docs)]

pub mod arena;
pub mod pool;
pub mod stats;

pub use arena::{Arena, ArenaPool};
pub use pool::WordPool;
pub use stats::{AtomicPoolStats, PoolStats};
