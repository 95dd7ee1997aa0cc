//! # gtt-vault
//!
//! Pooled-stake share accounting with periodic auto-compounding.
//!
//! Depositors receive shares priced at the vault's current share price;
//! compounding folds newly accrued yield into the vault's total value,
//! which raises the share price for every holder at once. A performance
//! fee is skimmed from each compound into an accrued fee pool.
//!
//! ## Modules
//!
//! - [`state`] — vault state and the Idle/Compounding phase machine
//! - [`accountant`] — deposit, withdraw, compound, and fee collection

pub mod accountant;
pub mod state;

pub use accountant::{CompoundReport, VaultAccountant};
pub use state::{VaultPhase, VaultState};

/// Error types for vault operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Deposit/withdraw amounts and share counts must be positive.
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(f64),

    /// Withdrawal exceeds the shares held by the position.
    #[error("insufficient shares: requested {requested}, held {held}")]
    InsufficientShares {
        /// Shares requested for withdrawal.
        requested: f64,
        /// Shares actually held.
        held: f64,
    },

    /// Yield folded into the vault cannot be negative.
    #[error("negative yield amount: {0}")]
    NegativeYield(f64),

    /// Performance fee rate must lie in [0, 1].
    #[error("performance fee rate out of range: {0}")]
    FeeOutOfRange(f64),

    /// A compound is already in flight.
    #[error("compound already in progress")]
    CompoundInProgress,
}

/// Convenience result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
