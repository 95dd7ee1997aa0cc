//! # gtt-yield
//!
//! The pure yield-computation pipeline: engagement counters in, token
//! reward amounts out. Every function here is deterministic and free of
//! I/O so that any historical payout can be recomputed bit-for-bit from
//! its inputs.
//!
//! ## Modules
//!
//! - [`tiers`] — tier/period reward multiplier resolution
//! - [`formula`] — per-capsule yield scoring
//! - [`convert`] — reward conversion and per-account aggregation

pub mod convert;
pub mod formula;
pub mod tiers;

/// Error types for yield computation.
#[derive(Debug, thiserror::Error)]
pub enum YieldError {
    /// Conversion rate must be positive.
    #[error("conversion rate must be positive, got {0}")]
    NonPositiveRate(f64),

    /// Quality clamp bounds are inverted or non-positive.
    #[error("invalid quality clamp bounds: floor {floor}, ceiling {ceiling}")]
    InvalidClampBounds {
        /// Lower bound.
        floor: f64,
        /// Upper bound.
        ceiling: f64,
    },
}

/// Convenience result type for yield operations.
pub type Result<T> = std::result::Result<T, YieldError>;
