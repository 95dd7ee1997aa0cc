//! The claim idempotency ledger.
//!
//! One record per successful `(account, period)` claim. Once written, a
//! record is never overwritten: re-inserting the same key leaves the
//! original in place, which is what makes retried claims idempotent.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use gtt_types::{AccountId, PeriodId};

/// A completed claim, written atomically with the balance debit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    /// Claiming account.
    pub account_id: AccountId,
    /// Accrual period the claim settles.
    pub period_id: PeriodId,
    /// Token amount claimed.
    pub amount: f64,
    /// Unix timestamp (seconds) when the claim committed.
    pub claimed_at: u64,
}

/// In-memory claim record set, keyed by `(account, period)`.
///
/// Stands in for the durable store of the external persistence
/// collaborator; the interface is the contract, not the container.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClaimLedger {
    records: HashMap<(AccountId, PeriodId), ClaimRecord>,
}

impl ClaimLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the record for an account/period pair.
    pub fn get(&self, account_id: &str, period_id: &PeriodId) -> Option<&ClaimRecord> {
        self.records
            .get(&(account_id.to_string(), *period_id))
    }

    /// Insert a record if the pair has never been claimed.
    ///
    /// Returns `true` on insert; `false` leaves the ORIGINAL record
    /// untouched (the first claim wins, permanently).
    pub fn insert_new(&mut self, record: ClaimRecord) -> bool {
        let key = (record.account_id.clone(), record.period_id);
        if self.records.contains_key(&key) {
            return false;
        }
        self.records.insert(key, record);
        true
    }

    /// All records for one account, in no particular order.
    pub fn account_records(&self, account_id: &str) -> Vec<&ClaimRecord> {
        self.records
            .values()
            .filter(|r| r.account_id == account_id)
            .collect()
    }

    /// Number of records in the ledger.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no claims have been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
