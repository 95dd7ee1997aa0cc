//! Reward conversion and per-account aggregation.
//!
//! Yield scores become token amounts through a single linear conversion:
//!
//! ```text
//! reward = yield_score * multiplier * conversion_rate
//! ```
//!
//! The conversion rate is injected configuration, never a constant baked
//! into this crate. Aggregation over a capsule set is associative and
//! order-independent; the per-capsule breakdown always sums back to the
//! aggregate total within [`gtt_types::AMOUNT_EPSILON`].

use serde::{Deserialize, Serialize};

use gtt_types::{AccountId, Capsule, CapsuleId, AMOUNT_EPSILON};

use crate::formula::{self, YieldWeights};
use crate::{Result, YieldError};

/// Default minimum yield a capsule must accrue before its reward counts
/// toward the claimable amount.
pub const DEFAULT_MIN_CLAIM_YIELD: f64 = 1.0;

/// Conversion parameters, supplied by the host configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Tokens per yield point (e.g. 0.1 GTT per point).
    pub conversion_rate: f64,
    /// Base APY used for APY-equivalent display figures (e.g. 0.12).
    pub base_apy: f64,
    /// Minimum capsule yield before its reward is claimable.
    pub min_claim_yield: f64,
}

/// A single capsule's evaluated yield, ready for conversion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapsuleYield {
    /// Capsule identifier.
    pub capsule_id: CapsuleId,
    /// Yield score from [`formula::compute_yield`].
    pub yield_score: f64,
    /// Reward multiplier from [`crate::tiers::resolve_multiplier`].
    pub multiplier: f64,
    /// Whole days since the capsule was published.
    pub days_active: u64,
}

impl CapsuleYield {
    /// Evaluate a capsule against the scoring weights.
    pub fn evaluate(capsule: &Capsule, multiplier: f64, weights: &YieldWeights, now: u64) -> Self {
        Self {
            capsule_id: capsule.id.clone(),
            yield_score: formula::compute_yield(capsule, weights),
            multiplier,
            days_active: capsule.days_active(now),
        }
    }
}

/// Per-capsule detail retained for auditability and dashboard display.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct YieldBreakdown {
    /// Capsule identifier.
    pub capsule_id: CapsuleId,
    /// Accrued yield score.
    pub current_yield: f64,
    /// Token reward for the accrued yield.
    pub current_reward: f64,
    /// Yield accrued per day of the capsule's lifetime.
    pub daily_rate: f64,
    /// APY-equivalent percentage for display.
    pub apy: f64,
    /// Whole days since publication.
    pub days_active: u64,
    /// Whether this capsule's yield has reached the claim threshold.
    pub claimable: bool,
}

/// Aggregate claimable summary for one account.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClaimableSummary {
    /// Account the summary belongs to.
    pub account_id: AccountId,
    /// Claimable token amount (capsules at or above the claim threshold).
    pub amount: f64,
    /// Total yield score across all capsules.
    pub total_yield: f64,
    /// Total token reward across all capsules, claimable or not.
    pub total_reward: f64,
    /// Mean APY-equivalent across breakdown entries (0 when empty).
    pub average_apy: f64,
    /// Number of capsules evaluated.
    pub capsule_count: usize,
    /// Per-capsule detail.
    pub breakdown: Vec<YieldBreakdown>,
}

/// Convert a yield score into a token amount.
///
/// # Errors
///
/// - [`YieldError::NonPositiveRate`] if `conversion_rate` is not positive
pub fn to_reward(yield_score: f64, multiplier: f64, conversion_rate: f64) -> Result<f64> {
    if conversion_rate <= 0.0 {
        return Err(YieldError::NonPositiveRate(conversion_rate));
    }
    Ok(yield_score.max(0.0) * multiplier * conversion_rate)
}

/// Aggregate evaluated capsule yields into a claimable summary.
///
/// Summation is plain left-to-right addition over entries whose order
/// does not affect the result beyond [`AMOUNT_EPSILON`]; the breakdown
/// retains every entry so that `sum(breakdown.current_reward)` always
/// reproduces `total_reward`.
///
/// # Errors
///
/// - [`YieldError::NonPositiveRate`] if the configured rate is not positive
pub fn aggregate(
    account_id: &AccountId,
    entries: &[CapsuleYield],
    config: &ConversionConfig,
) -> Result<ClaimableSummary> {
    let mut breakdown = Vec::with_capacity(entries.len());
    let mut amount = 0.0;
    let mut total_yield = 0.0;
    let mut total_reward = 0.0;
    let mut apy_sum = 0.0;

    for entry in entries {
        let current_yield = entry.yield_score.max(0.0);
        let current_reward = to_reward(current_yield, entry.multiplier, config.conversion_rate)?;
        let daily_rate = current_yield / entry.days_active.max(1) as f64;
        let apy = config.base_apy * entry.multiplier * 100.0;
        let claimable = current_yield + AMOUNT_EPSILON >= config.min_claim_yield;

        total_yield += current_yield;
        total_reward += current_reward;
        apy_sum += apy;
        if claimable {
            amount += current_reward;
        }

        breakdown.push(YieldBreakdown {
            capsule_id: entry.capsule_id.clone(),
            current_yield,
            current_reward,
            daily_rate,
            apy,
            days_active: entry.days_active,
            claimable,
        });
    }

    let average_apy = if breakdown.is_empty() {
        0.0
    } else {
        apy_sum / breakdown.len() as f64
    };

    tracing::trace!(
        account = %account_id,
        amount,
        total_yield,
        capsules = breakdown.len(),
        "aggregated claimable summary"
    );

    Ok(ClaimableSummary {
        account_id: account_id.clone(),
        amount,
        total_yield,
        total_reward,
        average_apy,
        capsule_count: breakdown.len(),
        breakdown,
    })
}
