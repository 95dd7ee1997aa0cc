//! Per-account claim serialization and the claim workflow.
//!
//! Concurrent claims for the SAME account are serialized behind a
//! per-account async lock acquired with a bounded timeout; claims for
//! different accounts proceed in parallel. The compute-then-commit
//! section (entitlement re-check, ledger write, balance debit) runs
//! entirely under the account lock, so two racing claims for one period
//! resolve to exactly one payout and one idempotent replay.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use gtt_types::{AccountId, PeriodId, AMOUNT_EPSILON, TOKEN_SYMBOL};

use crate::ledger::{ClaimLedger, ClaimRecord};
use crate::period;
use crate::{ClaimError, Result};

/// Default bound on waiting for an account lock.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 250;

/// Where the coordinator reads (and debits) claimable balances.
///
/// Implementations recompute the entitlement from current capsule data
/// at claim time; the coordinator never trusts a caller-supplied figure.
/// Both methods are invoked while the account's claim lock is held.
pub trait EntitlementSource {
    /// The account's claimable balance, freshly computed as of `now`.
    fn claimable(&self, account_id: &str, now: u64) -> f64;

    /// Debit a successfully claimed amount from the balance.
    fn debit(&mut self, account_id: &str, amount: f64);
}

/// Instruction for the external minting/transfer collaborator.
///
/// Settlement execution is out of scope here; if it fails downstream,
/// reconciliation against the claim record is the caller's job — the
/// coordinator does not retry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SettlementIntent {
    /// Receiving account.
    pub account_id: AccountId,
    /// Token amount to settle.
    pub amount: f64,
    /// Token symbol.
    pub token: String,
    /// Hex-rendered accrual period id, for reconciliation.
    pub period_id: String,
}

/// Outcome of a claim call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ClaimOutcome {
    /// The claim committed; hand the intent to settlement.
    Claimed {
        /// The freshly written record.
        record: ClaimRecord,
        /// Settlement instruction for the minting collaborator.
        intent: SettlementIntent,
    },
    /// The period was already claimed; carries the ORIGINAL record so
    /// retries observe the first claim's amount and timestamp. This is
    /// success-equivalent, not a failure.
    AlreadyClaimed {
        /// The record written by the first successful claim.
        record: ClaimRecord,
    },
}

impl ClaimOutcome {
    /// The record behind either outcome.
    pub fn record(&self) -> &ClaimRecord {
        match self {
            ClaimOutcome::Claimed { record, .. } => record,
            ClaimOutcome::AlreadyClaimed { record } => record,
        }
    }

    /// True for a first-time successful claim.
    pub fn is_new_claim(&self) -> bool {
        matches!(self, ClaimOutcome::Claimed { .. })
    }
}

/// Coordinator settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClaimConfig {
    /// Bound on waiting for an account's claim lock, in milliseconds.
    pub lock_timeout_ms: u64,
    /// Accrual period length in seconds.
    pub period_secs: u64,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            period_secs: period::DEFAULT_PERIOD_SECS,
        }
    }
}

/// Serializes and records claim operations.
pub struct ClaimCoordinator<E> {
    config: ClaimConfig,
    account_locks: Mutex<HashMap<AccountId, Arc<Mutex<()>>>>,
    ledger: Mutex<ClaimLedger>,
    source: Mutex<E>,
}

impl<E: EntitlementSource> ClaimCoordinator<E> {
    /// Create a coordinator over an entitlement source.
    pub fn new(config: ClaimConfig, source: E) -> Self {
        Self {
            config,
            account_locks: Mutex::new(HashMap::new()),
            ledger: Mutex::new(ClaimLedger::new()),
            source: Mutex::new(source),
        }
    }

    /// Claim `amount` for the accrual period containing `now`.
    pub async fn claim_current_period(
        &self,
        account_id: &AccountId,
        amount: f64,
        now: u64,
    ) -> Result<ClaimOutcome> {
        let index = period::period_index(now, self.config.period_secs);
        let period_id = period::derive_period_id(account_id, index);
        self.claim(account_id, period_id, amount, now).await
    }

    /// Claim `amount` for an explicit accrual period.
    ///
    /// All-or-nothing: on any validation failure no state changes. On
    /// success the claim record and the balance debit commit together
    /// under the account lock.
    ///
    /// # Errors
    ///
    /// - [`ClaimError::InvalidAmount`] for non-positive amounts
    /// - [`ClaimError::Busy`] if the account lock is contended past the
    ///   configured bound (retryable)
    /// - [`ClaimError::AmountMismatch`] if `amount` exceeds the
    ///   entitlement recomputed at claim time
    pub async fn claim(
        &self,
        account_id: &AccountId,
        period_id: PeriodId,
        amount: f64,
        now: u64,
    ) -> Result<ClaimOutcome> {
        if amount.is_nan() || amount <= 0.0 {
            return Err(ClaimError::InvalidAmount(amount));
        }

        let account_lock = {
            let mut locks = self.account_locks.lock().await;
            locks
                .entry(account_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let timeout = Duration::from_millis(self.config.lock_timeout_ms);
        let _guard = tokio::time::timeout(timeout, account_lock.lock())
            .await
            .map_err(|_| ClaimError::Busy {
                timeout_ms: self.config.lock_timeout_ms,
            })?;

        // Idempotency: a period claimed once replays the original record.
        if let Some(original) = self.ledger.lock().await.get(account_id, &period_id).cloned() {
            tracing::info!(
                account = %account_id,
                period = %period::period_id_hex(&period_id),
                amount = original.amount,
                "claim replayed idempotently"
            );
            return Ok(ClaimOutcome::AlreadyClaimed { record: original });
        }

        // Entitlement is recomputed here, never taken from the caller.
        let mut source = self.source.lock().await;
        let entitled = source.claimable(account_id, now);
        if amount > entitled + AMOUNT_EPSILON {
            tracing::warn!(
                account = %account_id,
                requested = amount,
                entitled,
                "claim rejected: stale amount"
            );
            return Err(ClaimError::AmountMismatch {
                requested: amount,
                entitled,
            });
        }

        let record = ClaimRecord {
            account_id: account_id.clone(),
            period_id,
            amount,
            claimed_at: now,
        };
        if !self.ledger.lock().await.insert_new(record.clone()) {
            // Unreachable while the account lock is held; kept as a
            // no-double-debit backstop.
            let original = self
                .ledger
                .lock()
                .await
                .get(account_id, &period_id)
                .cloned()
                .unwrap_or(record);
            return Ok(ClaimOutcome::AlreadyClaimed { record: original });
        }
        source.debit(account_id, amount);

        let intent = SettlementIntent {
            account_id: account_id.clone(),
            amount,
            token: TOKEN_SYMBOL.to_string(),
            period_id: period::period_id_hex(&period_id),
        };

        tracing::info!(
            account = %account_id,
            amount,
            period = %intent.period_id,
            "claim committed"
        );

        Ok(ClaimOutcome::Claimed { record, intent })
    }

    /// All claim records for an account.
    pub async fn account_claims(&self, account_id: &str) -> Vec<ClaimRecord> {
        self.ledger
            .lock()
            .await
            .account_records(account_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Total number of claim records.
    pub async fn ledger_len(&self) -> usize {
        self.ledger.lock().await.len()
    }

    /// Run a closure against the entitlement source.
    ///
    /// This is how the host keeps the source's account/capsule data
    /// current; it takes the source lock but NOT any account claim lock,
    /// so it must not be used to mutate claimable balances mid-claim.
    pub async fn with_source<R>(&self, f: impl FnOnce(&mut E) -> R) -> R {
        let mut source = self.source.lock().await;
        f(&mut source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::derive_period_id;

    /// Plain balance-map entitlement source for tests.
    struct MapSource {
        balances: HashMap<String, f64>,
    }

    impl MapSource {
        fn with(account: &str, balance: f64) -> Self {
            let mut balances = HashMap::new();
            balances.insert(account.to_string(), balance);
            Self { balances }
        }
    }

    impl EntitlementSource for MapSource {
        fn claimable(&self, account_id: &str, _now: u64) -> f64 {
            self.balances.get(account_id).copied().unwrap_or(0.0)
        }

        fn debit(&mut self, account_id: &str, amount: f64) {
            if let Some(balance) = self.balances.get_mut(account_id) {
                *balance -= amount;
            }
        }
    }

    /// Source whose entitlement computation takes a while, to force lock
    /// contention.
    struct SlowSource {
        inner: MapSource,
        delay: Duration,
    }

    impl EntitlementSource for SlowSource {
        fn claimable(&self, account_id: &str, now: u64) -> f64 {
            std::thread::sleep(self.delay);
            self.inner.claimable(account_id, now)
        }

        fn debit(&mut self, account_id: &str, amount: f64) {
            self.inner.debit(account_id, amount);
        }
    }

    const NOW: u64 = 1_700_000_000;

    fn coordinator(balance: f64) -> ClaimCoordinator<MapSource> {
        ClaimCoordinator::new(ClaimConfig::default(), MapSource::with("u1", balance))
    }

    #[tokio::test]
    async fn test_claim_success() {
        let coord = coordinator(100.0);
        let account = "u1".to_string();
        let pid = derive_period_id(&account, 1);

        let outcome = coord.claim(&account, pid, 92.25, NOW).await.expect("claim");
        assert!(outcome.is_new_claim());
        match outcome {
            ClaimOutcome::Claimed { record, intent } => {
                assert_eq!(record.amount, 92.25);
                assert_eq!(record.claimed_at, NOW);
                assert_eq!(intent.token, "GTT");
                assert_eq!(intent.account_id, account);
                assert_eq!(intent.period_id.len(), 64);
            }
            ClaimOutcome::AlreadyClaimed { .. } => {
                unreachable!("first claim must commit")
            }
        }
        assert_eq!(coord.ledger_len().await, 1);
    }

    #[tokio::test]
    async fn test_claim_idempotent_replay() {
        let coord = coordinator(100.0);
        let account = "u1".to_string();
        let pid = derive_period_id(&account, 1);

        let first = coord.claim(&account, pid, 50.0, NOW).await.expect("claim");
        let second = coord
            .claim(&account, pid, 50.0, NOW + 10)
            .await
            .expect("replay");

        assert!(first.is_new_claim());
        assert!(!second.is_new_claim());
        // The replay carries the ORIGINAL amount and timestamp.
        assert_eq!(second.record().amount, 50.0);
        assert_eq!(second.record().claimed_at, NOW);
        assert_eq!(coord.ledger_len().await, 1);
    }

    #[tokio::test]
    async fn test_replay_with_different_amount_returns_original() {
        let coord = coordinator(100.0);
        let account = "u1".to_string();
        let pid = derive_period_id(&account, 1);

        coord.claim(&account, pid, 30.0, NOW).await.expect("claim");
        let replay = coord
            .claim(&account, pid, 70.0, NOW + 5)
            .await
            .expect("replay");
        assert_eq!(replay.record().amount, 30.0);
    }

    #[tokio::test]
    async fn test_amount_mismatch_rejected() {
        let coord = coordinator(10.0);
        let account = "u1".to_string();
        let pid = derive_period_id(&account, 1);

        let err = coord
            .claim(&account, pid, 10.5, NOW)
            .await
            .expect_err("stale amount");
        assert!(matches!(
            err,
            ClaimError::AmountMismatch { requested, entitled }
                if requested == 10.5 && entitled == 10.0
        ));
        // Nothing committed.
        assert_eq!(coord.ledger_len().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_amount_rejected() {
        let coord = coordinator(10.0);
        let account = "u1".to_string();
        let pid = derive_period_id(&account, 1);

        assert!(coord.claim(&account, pid, 0.0, NOW).await.is_err());
        assert!(coord.claim(&account, pid, -1.0, NOW).await.is_err());
        assert!(coord.claim(&account, pid, f64::NAN, NOW).await.is_err());
    }

    #[tokio::test]
    async fn test_debit_applied_once() {
        let coord = coordinator(100.0);
        let account = "u1".to_string();
        let pid = derive_period_id(&account, 1);

        coord.claim(&account, pid, 60.0, NOW).await.expect("claim");
        coord
            .claim(&account, pid, 60.0, NOW)
            .await
            .expect("replay");

        // Balance debited exactly once: a fresh period can claim the rest.
        let pid2 = derive_period_id(&account, 2);
        let outcome = coord.claim(&account, pid2, 40.0, NOW).await.expect("claim");
        assert!(outcome.is_new_claim());

        let pid3 = derive_period_id(&account, 3);
        let err = coord
            .claim(&account, pid3, 1.0, NOW)
            .await
            .expect_err("balance exhausted");
        assert!(matches!(err, ClaimError::AmountMismatch { .. }));
    }

    #[tokio::test]
    async fn test_different_accounts_do_not_contend() {
        let mut balances = HashMap::new();
        balances.insert("u1".to_string(), 10.0);
        balances.insert("u2".to_string(), 10.0);
        let coord = Arc::new(ClaimCoordinator::new(
            ClaimConfig::default(),
            MapSource { balances },
        ));

        let a = {
            let coord = Arc::clone(&coord);
            tokio::spawn(async move {
                let account = "u1".to_string();
                let pid = derive_period_id(&account, 1);
                coord.claim(&account, pid, 10.0, NOW).await
            })
        };
        let b = {
            let coord = Arc::clone(&coord);
            tokio::spawn(async move {
                let account = "u2".to_string();
                let pid = derive_period_id(&account, 1);
                coord.claim(&account, pid, 10.0, NOW).await
            })
        };

        let ra = a.await.expect("join").expect("claim u1");
        let rb = b.await.expect("join").expect("claim u2");
        assert!(ra.is_new_claim());
        assert!(rb.is_new_claim());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_contended_lock_returns_busy() {
        let coord = Arc::new(ClaimCoordinator::new(
            ClaimConfig {
                lock_timeout_ms: 50,
                period_secs: period::DEFAULT_PERIOD_SECS,
            },
            SlowSource {
                inner: MapSource::with("u1", 100.0),
                delay: Duration::from_millis(400),
            },
        ));

        let holder = {
            let coord = Arc::clone(&coord);
            tokio::spawn(async move {
                let account = "u1".to_string();
                let pid = derive_period_id(&account, 1);
                coord.claim(&account, pid, 10.0, NOW).await
            })
        };

        // Give the holder time to take the account lock, then contend.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let account = "u1".to_string();
        let pid = derive_period_id(&account, 2);
        let err = coord
            .claim(&account, pid, 10.0, NOW)
            .await
            .expect_err("lock contended");
        assert!(matches!(err, ClaimError::Busy { timeout_ms: 50 }));

        holder.await.expect("join").expect("holder claim");
    }

    #[tokio::test]
    async fn test_account_claims_listing() {
        let coord = coordinator(100.0);
        let account = "u1".to_string();
        coord
            .claim(&account, derive_period_id(&account, 1), 10.0, NOW)
            .await
            .expect("claim");
        coord
            .claim(&account, derive_period_id(&account, 2), 20.0, NOW)
            .await
            .expect("claim");

        let records = coord.account_claims(&account).await;
        assert_eq!(records.len(), 2);
        assert!(coord.account_claims("ghost").await.is_empty());
    }
}
