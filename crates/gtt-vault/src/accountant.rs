//! Deposit, withdraw, compound, and fee collection.
//!
//! ## Share math
//!
//! ```text
//! deposit:  shares_issued = amount / share_price
//! withdraw: amount_out    = shares * share_price
//! compound: total_value  += yield * (1 - fee_rate)
//!           share_price   = total_value / total_shares
//! ```
//!
//! The accountant requires exclusive access (`&mut self`) for every
//! mutation; callers that share a vault across tasks wrap it in a lock
//! and hold the write guard for the whole call, so no operation ever
//! reads a stale share price.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use gtt_types::{AccountId, StakePosition};

use crate::state::{VaultState, BOOTSTRAP_SHARE_PRICE};
use crate::{Result, VaultError};

/// Outcome of a single compound.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompoundReport {
    /// Yield offered to the vault before fees.
    pub gross_yield: f64,
    /// Fee skimmed into the accrued pool.
    pub fee: f64,
    /// Yield folded into total value.
    pub net_yield: f64,
    /// Share price after repricing.
    pub share_price: f64,
}

/// Pooled-stake accountant for one vault instance.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VaultAccountant {
    state: VaultState,
    positions: HashMap<AccountId, StakePosition>,
}

impl VaultAccountant {
    /// Create an empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current vault state.
    pub fn state(&self) -> &VaultState {
        &self.state
    }

    /// The stake position for an account, if one is open.
    pub fn position(&self, account_id: &str) -> Option<&StakePosition> {
        self.positions.get(account_id)
    }

    /// Number of open positions.
    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Deposit principal and issue shares at the current share price.
    ///
    /// The first deposit into an empty vault bootstraps the share price
    /// to [`BOOTSTRAP_SHARE_PRICE`], so it is issued shares 1:1.
    ///
    /// # Errors
    ///
    /// - [`VaultError::NonPositiveAmount`] if `amount <= 0`
    pub fn deposit(&mut self, account_id: &AccountId, amount: f64, now: u64) -> Result<f64> {
        if amount.is_nan() || amount <= 0.0 {
            return Err(VaultError::NonPositiveAmount(amount));
        }

        if self.state.total_shares <= 0.0 {
            self.state.share_price = BOOTSTRAP_SHARE_PRICE;
        }
        let shares_issued = amount / self.state.share_price;

        let position = self
            .positions
            .entry(account_id.clone())
            .or_insert_with(|| StakePosition::new(account_id.clone(), now));
        position.principal += amount;
        position.shares += shares_issued;

        self.state.total_principal += amount;
        self.state.total_value += amount;
        self.state.total_shares += shares_issued;

        tracing::info!(
            account = %account_id,
            amount,
            shares_issued,
            share_price = self.state.share_price,
            "vault deposit"
        );

        Ok(shares_issued)
    }

    /// Redeem shares for principal plus accrued yield.
    ///
    /// Principal attribution shrinks proportionally to the share of the
    /// position redeemed; a full exit removes the position entirely.
    ///
    /// # Errors
    ///
    /// - [`VaultError::NonPositiveAmount`] if `shares <= 0`
    /// - [`VaultError::InsufficientShares`] if the position holds fewer
    ///   shares than requested (a missing position holds 0)
    pub fn withdraw(&mut self, account_id: &AccountId, shares: f64) -> Result<f64> {
        if shares.is_nan() || shares <= 0.0 {
            return Err(VaultError::NonPositiveAmount(shares));
        }

        let held = self.positions.get(account_id).map_or(0.0, |p| p.shares);
        if shares > held {
            return Err(VaultError::InsufficientShares {
                requested: shares,
                held,
            });
        }

        let amount = shares * self.state.share_price;
        let full_exit = (held - shares).abs() < f64::EPSILON * held.max(1.0);

        if let Some(position) = self.positions.get_mut(account_id) {
            let principal_released = position.principal * (shares / held);
            position.shares -= shares;
            position.principal -= principal_released;
            self.state.total_principal -= principal_released;
        }
        if full_exit {
            self.positions.remove(account_id);
        }

        self.state.total_shares -= shares;
        self.state.total_value -= amount;
        if self.state.total_shares <= 0.0 {
            // Vault fully drained: clear float residue for the next bootstrap.
            self.state.total_shares = 0.0;
            self.state.total_value = 0.0;
            self.state.total_principal = 0.0;
        }

        tracing::info!(
            account = %account_id,
            shares,
            amount,
            share_price = self.state.share_price,
            "vault withdrawal"
        );

        Ok(amount)
    }

    /// Fold accrued yield into the vault, skimming the performance fee.
    ///
    /// Runs the `Idle -> Compounding -> Idle` transition; at most one
    /// compound is in flight at a time. Compounding an empty vault only
    /// stamps the timestamp — no value appears out of nowhere and the
    /// share price is untouched.
    ///
    /// # Errors
    ///
    /// - [`VaultError::NegativeYield`] if `yield_amount < 0`
    /// - [`VaultError::FeeOutOfRange`] if `fee_rate` is outside [0, 1]
    /// - [`VaultError::CompoundInProgress`] if already Compounding
    pub fn compound(
        &mut self,
        yield_amount: f64,
        fee_rate: f64,
        now: u64,
    ) -> Result<CompoundReport> {
        if yield_amount < 0.0 {
            return Err(VaultError::NegativeYield(yield_amount));
        }
        if !(0.0..=1.0).contains(&fee_rate) {
            return Err(VaultError::FeeOutOfRange(fee_rate));
        }

        self.state.begin_compound()?;

        let (fee, net_yield) = if self.state.total_shares > 0.0 {
            let fee = yield_amount * fee_rate;
            let net = yield_amount - fee;
            self.state.accrued_fees += fee;
            self.state.total_value += net;
            self.state.reprice();
            (fee, net)
        } else {
            (0.0, 0.0)
        };

        self.state.finish_compound(now);

        let report = CompoundReport {
            gross_yield: yield_amount,
            fee,
            net_yield,
            share_price: self.state.share_price,
        };

        tracing::info!(
            gross = report.gross_yield,
            fee = report.fee,
            net = report.net_yield,
            share_price = report.share_price,
            "vault compounded"
        );

        Ok(report)
    }

    /// Drain the accrued performance-fee pool.
    ///
    /// Returns the drained amount for the treasury collaborator to move.
    pub fn collect_fees(&mut self) -> f64 {
        let collected = self.state.accrued_fees;
        self.state.accrued_fees = 0.0;
        if collected > 0.0 {
            tracing::info!(collected, "performance fees collected");
        }
        collected
    }
}
