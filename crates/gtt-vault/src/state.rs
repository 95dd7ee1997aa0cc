//! Vault state and the compounding phase machine.
//!
//! ```text
//! Idle --begin_compound--> Compounding --finish_compound--> Idle
//! ```
//!
//! At most one compound may be in flight per vault; a second
//! `begin_compound` while Compounding fails with
//! [`VaultError::CompoundInProgress`].

use serde::{Deserialize, Serialize};

use crate::{Result, VaultError};

/// Share price a freshly bootstrapped vault starts at.
pub const BOOTSTRAP_SHARE_PRICE: f64 = 1.0;

/// Compounding phase of a vault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultPhase {
    /// Accepting deposits/withdrawals; no compound in flight.
    Idle,
    /// A compound recomputation is in flight.
    Compounding,
}

/// Process-wide state of a single vault instance.
///
/// Invariant: `share_price = total_value / total_shares` whenever
/// `total_shares > 0`. `total_value` rises only through deposits and
/// compounded yield, and falls only through withdrawals; fee extraction
/// is taken from yield before it ever reaches `total_value`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VaultState {
    /// Sum of deposited principal still attributed to open positions.
    pub total_principal: f64,
    /// Total value backing outstanding shares (principal + net yield).
    pub total_value: f64,
    /// Shares outstanding across all positions.
    pub total_shares: f64,
    /// Current price of one share.
    pub share_price: f64,
    /// Unix timestamp (seconds) of the last completed compound.
    pub last_compound_at: u64,
    /// Performance fees accrued and not yet collected.
    pub accrued_fees: f64,
    /// Current compounding phase.
    pub phase: VaultPhase,
}

impl Default for VaultState {
    fn default() -> Self {
        Self {
            total_principal: 0.0,
            total_value: 0.0,
            total_shares: 0.0,
            share_price: BOOTSTRAP_SHARE_PRICE,
            last_compound_at: 0,
            accrued_fees: 0.0,
            phase: VaultPhase::Idle,
        }
    }
}

impl VaultState {
    /// Enter the Compounding phase.
    ///
    /// # Errors
    ///
    /// - [`VaultError::CompoundInProgress`] if already Compounding
    pub fn begin_compound(&mut self) -> Result<()> {
        if self.phase == VaultPhase::Compounding {
            return Err(VaultError::CompoundInProgress);
        }
        self.phase = VaultPhase::Compounding;
        Ok(())
    }

    /// Return to Idle after a compound completes.
    pub fn finish_compound(&mut self, now: u64) {
        self.phase = VaultPhase::Idle;
        self.last_compound_at = now;
    }

    /// Recompute the share price from value and shares outstanding.
    ///
    /// No-op on an empty vault: the bootstrap price stays in place so the
    /// next first deposit is priced at 1.0.
    pub fn reprice(&mut self) {
        if self.total_shares > 0.0 {
            self.share_price = self.total_value / self.total_shares;
        }
    }
}
