//! # gtt-claims
//!
//! At-most-once claim processing for accrued rewards.
//!
//! A claim converts claimable yield into a settlement intent for the
//! external minting collaborator. Each `(account, period)` pair pays out
//! at most once: retries and double-submits from the UI are expected and
//! resolve idempotently to the original claim rather than erroring or
//! double-paying.
//!
//! ## Modules
//!
//! - [`period`] — deterministic accrual-period identifiers
//! - [`ledger`] — the idempotency record set
//! - [`coordinator`] — per-account serialization and the claim workflow

pub mod coordinator;
pub mod ledger;
pub mod period;

pub use coordinator::{ClaimCoordinator, ClaimOutcome, EntitlementSource, SettlementIntent};
pub use ledger::{ClaimLedger, ClaimRecord};

/// Error types for claim operations.
///
/// An already-claimed period is NOT represented here: it is an expected,
/// success-equivalent outcome surfaced as
/// [`ClaimOutcome::AlreadyClaimed`].
#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    /// Claim amounts must be positive.
    #[error("claim amount must be positive, got {0}")]
    InvalidAmount(f64),

    /// The requested amount exceeds the freshly computed entitlement.
    #[error("amount mismatch: requested {requested}, entitled {entitled}")]
    AmountMismatch {
        /// Amount the caller asked for.
        requested: f64,
        /// Entitlement recomputed at claim time.
        entitled: f64,
    },

    /// The per-account lock could not be acquired in time; retryable.
    #[error("account busy: lock not acquired within {timeout_ms} ms")]
    Busy {
        /// The bounded wait that elapsed.
        timeout_ms: u64,
    },
}

/// Convenience result type for claim operations.
pub type Result<T> = std::result::Result<T, ClaimError>;
