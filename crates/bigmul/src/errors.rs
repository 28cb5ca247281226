//! Error type for configuration and parsing failures.

/// Errors surfaced by the multiplication engine.
///
/// Arithmetic itself is infallible; only configuration and decimal input
/// can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MulError {
    /// A decimal string contained a non-digit byte.
    #[error("invalid decimal digit {found:?} at position {position}")]
    InvalidDigit {
        /// Byte offset of the offending character.
        position: usize,
        /// The offending character.
        found: char,
    },

    /// A threshold was zero, too small, or inconsistent with the other one.
    #[error("invalid {name} threshold {value}: {reason}")]
    InvalidThreshold {
        /// Which threshold.
        name: &'static str,
        /// Rejected value in bits.
        value: usize,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The transform cache configuration was rejected.
    #[error("invalid cache configuration: {0}")]
    InvalidCacheConfig(String),
}
