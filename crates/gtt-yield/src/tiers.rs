//! Tier and staking-period reward multiplier resolution.
//!
//! The final multiplier composes a membership-tier bonus and a
//! staking-period bonus additively:
//!
//! ```text
//! multiplier = 1.0 + tier_bonus + period_bonus
//! ```
//!
//! Composition is additive, not multiplicative. Historical payouts were
//! computed with the additive formula, and reproducing them exactly
//! requires preserving it.

use serde::{Deserialize, Serialize};

use gtt_types::Tier;

/// Default additive bonus per tier, lowest tier first.
pub const DEFAULT_TIER_BONUSES: [f64; 4] = [0.0, 0.10, 0.25, 0.50];

/// Default staking-period bonus steps as `(min_days, bonus)` pairs,
/// ascending. Below the lowest threshold the period bonus is 0.
pub const DEFAULT_PERIOD_STEPS: [(u64, f64); 3] = [(90, 0.10), (180, 0.25), (365, 0.50)];

/// Externally configurable bonus schedule.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BonusSchedule {
    /// Additive bonus per tier, indexed by [`Tier::rank`].
    pub tier_bonuses: [f64; 4],
    /// Period bonus steps as `(min_days, bonus)`, ascending by days.
    pub period_steps: Vec<(u64, f64)>,
}

impl Default for BonusSchedule {
    fn default() -> Self {
        Self {
            tier_bonuses: DEFAULT_TIER_BONUSES,
            period_steps: DEFAULT_PERIOD_STEPS.to_vec(),
        }
    }
}

impl BonusSchedule {
    /// Additive bonus for a tier.
    ///
    /// The table is indexed by tier rank; a schedule shorter than the
    /// tier enumeration cannot occur because the array is fixed-size.
    pub fn tier_bonus(&self, tier: Tier) -> f64 {
        self.tier_bonuses[tier.rank()]
    }

    /// Additive bonus for a staking period, as a step function of days.
    ///
    /// Returns the bonus of the highest step whose threshold the period
    /// meets, or 0.0 below the lowest threshold.
    pub fn period_bonus(&self, staking_period_days: u64) -> f64 {
        let mut bonus = 0.0;
        for &(min_days, step_bonus) in &self.period_steps {
            if staking_period_days >= min_days {
                bonus = step_bonus;
            }
        }
        bonus
    }
}

/// Resolve the reward multiplier for a tier and staking period.
///
/// Pure and deterministic: identical inputs always produce the identical
/// multiplier, which past-payout audits rely on. The result is always
/// >= 1.0 for any schedule with non-negative bonuses.
pub fn resolve_multiplier(tier: Tier, staking_period_days: u64, schedule: &BonusSchedule) -> f64 {
    let tier_bonus = schedule.tier_bonus(tier);
    let period_bonus = schedule.period_bonus(staking_period_days);
    let multiplier = 1.0 + tier_bonus + period_bonus;

    tracing::trace!(
        ?tier,
        staking_period_days,
        tier_bonus,
        period_bonus,
        multiplier,
        "resolved reward multiplier"
    );

    multiplier
}
