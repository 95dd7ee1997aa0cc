//! In-memory account/capsule book.
//!
//! Stands in for the external persistence collaborator: the engine hands
//! it validated records, and it answers entitlement queries by
//! recomputing from current capsule data — never from a cached figure a
//! stale client could have seen. Already-claimed value is tracked as an
//! offset against the ever-growing accrued total.

use std::collections::HashMap;

use gtt_claims::coordinator::EntitlementSource;
use gtt_types::{Account, AccountId, Capsule};
use gtt_yield::convert::{self, CapsuleYield, ClaimableSummary};
use gtt_yield::tiers;

use crate::config::ResolvedConfig;

/// Per-account book: the account record, its capsules, and claim state.
#[derive(Clone, Debug)]
struct AccountBook {
    account: Account,
    capsules: Vec<Capsule>,
    stake_started_at: Option<u64>,
    claimed_offset: f64,
}

impl AccountBook {
    fn new(account: Account) -> Self {
        Self {
            account,
            capsules: Vec::new(),
            stake_started_at: None,
            claimed_offset: 0.0,
        }
    }
}

/// Registry of accounts and their capsules.
pub struct AccountRegistry {
    conversion: gtt_yield::convert::ConversionConfig,
    weights: gtt_yield::formula::YieldWeights,
    schedule: gtt_yield::tiers::BonusSchedule,
    books: HashMap<AccountId, AccountBook>,
}

impl AccountRegistry {
    /// Create an empty registry with the resolved engine parameters.
    pub fn new(config: &ResolvedConfig) -> Self {
        Self {
            conversion: config.conversion.clone(),
            weights: config.weights.clone(),
            schedule: config.schedule.clone(),
            books: HashMap::new(),
        }
    }

    /// Insert or update an account record.
    ///
    /// Claim state (claimed offset, stake start) survives tier updates
    /// from the external membership process.
    pub fn upsert_account(&mut self, account: Account) {
        match self.books.get_mut(&account.id) {
            Some(book) => book.account = account,
            None => {
                self.books.insert(account.id.clone(), AccountBook::new(account));
            }
        }
    }

    /// Insert or update a capsule under its creator's book.
    ///
    /// An unseen creator gets a lowest-tier book on the spot; membership
    /// data lagging behind content must not drop engagement.
    pub fn upsert_capsule(&mut self, capsule: Capsule) {
        let book = self
            .books
            .entry(capsule.creator.clone())
            .or_insert_with(|| {
                AccountBook::new(Account::new(capsule.creator.clone(), Default::default()))
            });
        match book.capsules.iter_mut().find(|c| c.id == capsule.id) {
            Some(existing) => *existing = capsule,
            None => book.capsules.push(capsule),
        }
    }

    /// Record when an account's stake position opened.
    pub fn set_stake_started(&mut self, account_id: &str, at: u64) {
        if let Some(book) = self.books.get_mut(account_id) {
            if book.stake_started_at.is_none() {
                book.stake_started_at = Some(at);
            }
        }
    }

    /// Clear stake tracking after a full withdrawal.
    pub fn clear_stake(&mut self, account_id: &str) {
        if let Some(book) = self.books.get_mut(account_id) {
            book.stake_started_at = None;
        }
    }

    /// The stored account record.
    pub fn account(&self, account_id: &str) -> Option<&Account> {
        self.books.get(account_id).map(|b| &b.account)
    }

    /// Number of capsules booked for an account.
    pub fn capsule_count(&self, account_id: &str) -> usize {
        self.books.get(account_id).map_or(0, |b| b.capsules.len())
    }

    /// Compute the account's claimable summary as of `now`.
    ///
    /// The gross aggregate is computed from current capsule data; value
    /// already claimed is netted off the claimable amount (floored at 0).
    /// Unknown accounts get an empty summary.
    pub fn summary(&self, account_id: &str, now: u64) -> gtt_yield::Result<ClaimableSummary> {
        let Some(book) = self.books.get(account_id) else {
            return convert::aggregate(&account_id.to_string(), &[], &self.conversion);
        };

        let staking_days = book
            .stake_started_at
            .map_or(0, |at| now.saturating_sub(at) / gtt_types::SECONDS_PER_DAY);
        let multiplier =
            tiers::resolve_multiplier(book.account.tier, staking_days, &self.schedule);

        let entries: Vec<CapsuleYield> = book
            .capsules
            .iter()
            .map(|c| CapsuleYield::evaluate(c, multiplier, &self.weights, now))
            .collect();

        let mut summary = convert::aggregate(&book.account.id, &entries, &self.conversion)?;
        summary.amount = (summary.amount - book.claimed_offset).max(0.0);
        Ok(summary)
    }

    /// Lifetime claimed total for an account.
    pub fn lifetime_claimed(&self, account_id: &str) -> f64 {
        self.books
            .get(account_id)
            .map_or(0.0, |b| b.account.lifetime_claimed)
    }
}

impl EntitlementSource for AccountRegistry {
    fn claimable(&self, account_id: &str, now: u64) -> f64 {
        self.summary(account_id, now).map_or(0.0, |s| s.amount)
    }

    fn debit(&mut self, account_id: &str, amount: f64) {
        if let Some(book) = self.books.get_mut(account_id) {
            book.claimed_offset += amount;
            book.account.lifetime_claimed += amount;
            book.account.claimable = (book.account.claimable - amount).max(0.0);
        }
    }
}
