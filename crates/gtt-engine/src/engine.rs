//! The request-facing engine facade.
//!
//! Each deposit/withdraw/claim/compound call is an independent unit of
//! work. Claims serialize per account inside the coordinator; vault
//! mutations take the vault-wide write lock for their whole
//! compute-then-commit section, so a compound can never interleave with
//! a deposit or withdrawal reading a stale share price.

use std::time::Duration;

use tokio::sync::{Mutex, RwLock, RwLockWriteGuard};

use gtt_claims::coordinator::{ClaimCoordinator, ClaimOutcome};
use gtt_claims::ClaimError;
use gtt_types::{Account, AccountId, Capsule, StakePosition};
use gtt_vault::{CompoundReport, VaultAccountant, VaultError, VaultState};
use gtt_yield::convert::ClaimableSummary;
use gtt_yield::YieldError;

use crate::config::{ConfigError, EngineConfig, ResolvedConfig};
use crate::registry::AccountRegistry;
use crate::Result;

/// Error types surfaced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Vault accounting rejected the operation.
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// Claim processing rejected the operation.
    #[error(transparent)]
    Claim(#[from] ClaimError),

    /// Yield computation rejected its inputs.
    #[error(transparent)]
    Yield(#[from] YieldError),

    /// Startup configuration was invalid; fatal.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The vault lock was contended past the configured bound; retryable.
    #[error("vault busy: lock not acquired within {timeout_ms} ms")]
    Busy {
        /// The bounded wait that elapsed.
        timeout_ms: u64,
    },
}

/// The yield/vault/claims engine.
pub struct Engine {
    resolved: ResolvedConfig,
    vault: RwLock<VaultAccountant>,
    coordinator: ClaimCoordinator<AccountRegistry>,
    pending_yield: Mutex<f64>,
}

impl Engine {
    /// Build an engine from raw configuration.
    ///
    /// Fails fast on any missing or out-of-range financial parameter.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let resolved = config.resolve()?;
        Ok(Self::from_resolved(resolved))
    }

    /// Build an engine from already-validated configuration.
    pub fn from_resolved(resolved: ResolvedConfig) -> Self {
        let registry = AccountRegistry::new(&resolved);
        let coordinator = ClaimCoordinator::new(resolved.claim.clone(), registry);
        tracing::info!(
            conversion_rate = resolved.conversion.conversion_rate,
            base_apy = resolved.conversion.base_apy,
            fee_rate = resolved.performance_fee_rate,
            compound_interval_secs = resolved.compound_interval_secs,
            "engine configured"
        );
        Self {
            resolved,
            vault: RwLock::new(VaultAccountant::new()),
            coordinator,
            pending_yield: Mutex::new(0.0),
        }
    }

    /// The resolved configuration in effect.
    pub fn config(&self) -> &ResolvedConfig {
        &self.resolved
    }

    /// Register or update an account record.
    pub async fn register_account(&self, account: Account) {
        self.coordinator
            .with_source(|registry| registry.upsert_account(account))
            .await;
    }

    /// Ingest a validated capsule record (new or updated counters).
    pub async fn ingest_capsule(&self, capsule: Capsule) {
        self.coordinator
            .with_source(|registry| registry.upsert_capsule(capsule))
            .await;
    }

    /// The account's claimable summary as of `now`.
    pub async fn claimable_summary(&self, account_id: &str, now: u64) -> Result<ClaimableSummary> {
        let summary = self
            .coordinator
            .with_source(|registry| registry.summary(account_id, now))
            .await?;
        Ok(summary)
    }

    /// Acquire the vault write lock within the configured bound.
    ///
    /// Request-driven mutations must not queue unboundedly behind a
    /// long-running compound; they fail retryable instead.
    async fn vault_write(&self) -> Result<RwLockWriteGuard<'_, VaultAccountant>> {
        let timeout_ms = self.resolved.claim.lock_timeout_ms;
        tokio::time::timeout(Duration::from_millis(timeout_ms), self.vault.write())
            .await
            .map_err(|_| EngineError::Busy { timeout_ms })
    }

    /// Stake principal into the vault.
    ///
    /// Returns the shares issued. Also starts the account's staking
    /// clock if this is its first open position.
    pub async fn deposit(&self, account_id: &AccountId, amount: f64, now: u64) -> Result<f64> {
        let shares = self.vault_write().await?.deposit(account_id, amount, now)?;
        self.coordinator
            .with_source(|registry| registry.set_stake_started(account_id, now))
            .await;
        Ok(shares)
    }

    /// Redeem vault shares.
    ///
    /// Returns the amount paid out. A full exit stops the staking clock.
    pub async fn withdraw(&self, account_id: &AccountId, shares: f64) -> Result<f64> {
        let (amount, emptied) = {
            let mut vault = self.vault_write().await?;
            let amount = vault.withdraw(account_id, shares)?;
            (amount, vault.position(account_id).is_none())
        };
        if emptied {
            self.coordinator
                .with_source(|registry| registry.clear_stake(account_id))
                .await;
        }
        Ok(amount)
    }

    /// Claim accrued rewards for the current accrual period.
    pub async fn claim(
        &self,
        account_id: &AccountId,
        amount: f64,
        now: u64,
    ) -> Result<ClaimOutcome> {
        Ok(self
            .coordinator
            .claim_current_period(account_id, amount, now)
            .await?)
    }

    /// Record yield accrued by the external yield feed, to be folded in
    /// at the next compound.
    pub async fn accrue_yield(&self, amount: f64) -> Result<()> {
        if amount < 0.0 {
            return Err(VaultError::NegativeYield(amount).into());
        }
        let mut pending = self.pending_yield.lock().await;
        *pending += amount;
        tracing::trace!(amount, pending = *pending, "yield accrued");
        Ok(())
    }

    /// Fold all pending yield into the vault now.
    ///
    /// Invoked by the scheduler each interval and by the manual trigger.
    /// Pending yield is only cleared once the compound commits.
    pub async fn compound_now(&self, now: u64) -> Result<CompoundReport> {
        let mut pending = self.pending_yield.lock().await;
        let report = self
            .vault
            .write()
            .await
            .compound(*pending, self.resolved.performance_fee_rate, now)?;
        *pending = 0.0;
        Ok(report)
    }

    /// Drain accrued performance fees for the treasury collaborator.
    pub async fn collect_fees(&self) -> Result<f64> {
        Ok(self.vault_write().await?.collect_fees())
    }

    /// Snapshot of the vault state.
    pub async fn vault_state(&self) -> VaultState {
        self.vault.read().await.state().clone()
    }

    /// Snapshot of an account's stake position.
    pub async fn stake_position(&self, account_id: &str) -> Option<StakePosition> {
        self.vault.read().await.position(account_id).cloned()
    }

    /// All claim records for an account.
    pub async fn account_claims(&self, account_id: &str) -> Vec<gtt_claims::ClaimRecord> {
        self.coordinator.account_claims(account_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gtt_types::{Tier, SECONDS_PER_DAY};

    const NOW: u64 = 1_700_000_000;

    fn engine() -> Engine {
        let config = EngineConfig::from_toml(
            r#"
            [rewards]
            base_apy = 0.12
            conversion_rate = 0.1

            [tiers]
            tier_bonuses = [0.0, 0.10, 0.25, 0.50]
            period_steps = [[90, 0.10], [180, 0.25], [365, 0.50]]

            [vault]
            performance_fee_rate = 0.02
            "#,
        )
        .expect("parse");
        Engine::new(&config).expect("engine")
    }

    fn reference_capsule(creator: &str) -> Capsule {
        Capsule {
            id: "c1".to_string(),
            creator: creator.to_string(),
            created_at: NOW - 30 * SECONDS_PER_DAY,
            views: 1000,
            shares: 50,
            verifications: 10,
            minted: true,
            veritas_sealed: false,
            quality_score: 50.0,
            category: String::new(),
        }
    }

    #[test]
    fn test_engine_rejects_incomplete_config() {
        let config = EngineConfig::from_toml("").expect("parse");
        assert!(matches!(
            Engine::new(&config),
            Err(EngineError::Config(ConfigError::MissingParameter(_)))
        ));
    }

    #[tokio::test]
    async fn test_end_to_end_claim_flow() {
        let engine = engine();
        let account = "u1".to_string();

        engine.register_account(Account::new(&account, Tier::Creator)).await;
        engine.ingest_capsule(reference_capsule(&account)).await;
        engine
            .deposit(&account, 100.0, NOW - 180 * SECONDS_PER_DAY)
            .await
            .expect("deposit");

        let summary = engine.claimable_summary(&account, NOW).await.expect("summary");
        assert!((summary.amount - 92.25).abs() < 1e-9);

        let outcome = engine.claim(&account, 92.25, NOW).await.expect("claim");
        assert!(outcome.is_new_claim());

        // Entitlement is now exhausted.
        let after = engine.claimable_summary(&account, NOW).await.expect("summary");
        assert!(after.amount.abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_claim_with_stale_amount_rejected() {
        let engine = engine();
        let account = "u1".to_string();
        engine.register_account(Account::new(&account, Tier::Explorer)).await;
        engine.ingest_capsule(reference_capsule(&account)).await;

        let err = engine
            .claim(&account, 10_000.0, NOW)
            .await
            .expect_err("stale amount");
        assert!(matches!(
            err,
            EngineError::Claim(ClaimError::AmountMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_deposit_compound_withdraw_cycle() {
        let engine = engine();
        let account = "u1".to_string();
        engine.register_account(Account::new(&account, Tier::Explorer)).await;

        engine.deposit(&account, 100.0, NOW).await.expect("deposit");
        engine.accrue_yield(10.0).await.expect("accrue");
        let report = engine.compound_now(NOW + 60).await.expect("compound");
        assert!((report.net_yield - 9.8).abs() < 1e-12);

        let state = engine.vault_state().await;
        assert!((state.share_price - 1.098).abs() < 1e-12);

        let amount = engine.withdraw(&account, 100.0).await.expect("withdraw");
        assert!((amount - 109.8).abs() < 1e-9);
        assert!(engine.stake_position(&account).await.is_none());
    }

    #[tokio::test]
    async fn test_compound_with_nothing_pending() {
        let engine = engine();
        let account = "u1".to_string();
        engine.deposit(&account, 100.0, NOW).await.expect("deposit");

        let report = engine.compound_now(NOW).await.expect("compound");
        assert_eq!(report.gross_yield, 0.0);
        let state = engine.vault_state().await;
        assert!((state.share_price - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_pending_yield_accumulates_until_compound() {
        let engine = engine();
        let account = "u1".to_string();
        engine.deposit(&account, 100.0, NOW).await.expect("deposit");

        engine.accrue_yield(3.0).await.expect("accrue");
        engine.accrue_yield(7.0).await.expect("accrue");
        let report = engine.compound_now(NOW).await.expect("compound");
        assert!((report.gross_yield - 10.0).abs() < 1e-12);

        // Drained: a second compound folds nothing.
        let report = engine.compound_now(NOW + 1).await.expect("compound");
        assert_eq!(report.gross_yield, 0.0);
    }

    #[tokio::test]
    async fn test_negative_accrual_rejected() {
        let engine = engine();
        assert!(engine.accrue_yield(-1.0).await.is_err());
    }

    #[tokio::test]
    async fn test_collect_fees() {
        let engine = engine();
        let account = "u1".to_string();
        engine.deposit(&account, 100.0, NOW).await.expect("deposit");
        engine.accrue_yield(10.0).await.expect("accrue");
        engine.compound_now(NOW).await.expect("compound");

        let fees = engine.collect_fees().await.expect("collect");
        assert!((fees - 0.2).abs() < 1e-12);
        assert_eq!(engine.collect_fees().await.expect("collect"), 0.0);
    }

    #[tokio::test]
    async fn test_withdraw_stops_staking_clock() {
        let engine = engine();
        let account = "u1".to_string();
        engine.register_account(Account::new(&account, Tier::Creator)).await;
        engine.ingest_capsule(reference_capsule(&account)).await;

        engine
            .deposit(&account, 100.0, NOW - 180 * SECONDS_PER_DAY)
            .await
            .expect("deposit");
        let staked = engine.claimable_summary(&account, NOW).await.expect("summary");

        engine.withdraw(&account, 100.0).await.expect("withdraw");
        let unstaked = engine.claimable_summary(&account, NOW).await.expect("summary");

        // Without the 180-day period bonus the multiplier drops 1.50 -> 1.25.
        assert!(unstaked.amount < staked.amount);
        assert!((unstaked.amount - 615.0 * 1.25 * 0.1).abs() < 1e-9);
    }
}
