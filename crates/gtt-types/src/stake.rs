//! Stake position structures.

use serde::{Deserialize, Serialize};

use crate::AccountId;

/// A record of principal staked by an account into the vault.
///
/// One position per account per vault. Created on first deposit, mutated
/// on additional deposit/withdrawal, zeroed on full withdrawal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StakePosition {
    /// Owning account.
    pub account_id: AccountId,
    /// Total principal deposited, in GTT.
    pub principal: f64,
    /// Vault shares held.
    pub shares: f64,
    /// Unix timestamp (seconds) of the first deposit.
    pub deposited_at: u64,
}

impl StakePosition {
    /// Create a fresh position for a first deposit.
    pub fn new(account_id: impl Into<AccountId>, deposited_at: u64) -> Self {
        Self {
            account_id: account_id.into(),
            principal: 0.0,
            shares: 0.0,
            deposited_at,
        }
    }

    /// Whole days the position has been staked.
    pub fn staking_period_days(&self, now: u64) -> u64 {
        now.saturating_sub(self.deposited_at) / crate::SECONDS_PER_DAY
    }

    /// True once the position holds no shares.
    pub fn is_empty(&self) -> bool {
        self.shares <= 0.0
    }
}
