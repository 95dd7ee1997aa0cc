//! Capsule content-unit structures.

use serde::{Deserialize, Serialize};

use crate::{AccountId, CapsuleId};

/// Neutral quality score assigned when the grading collaborator has not
/// scored a capsule yet (maps to a 1.0 quality multiplier).
pub const NEUTRAL_QUALITY_SCORE: f64 = 50.0;

/// A unit of user-submitted content eligible for engagement-based rewards.
///
/// Engagement counters are fed by an external tracking collaborator and
/// may arrive incomplete or out of order, so they are carried as `i64`
/// with serde defaults; the yield formula normalizes negatives and gaps
/// to zero instead of rejecting the capsule.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Capsule {
    /// Capsule identifier.
    pub id: CapsuleId,
    /// Creating account.
    pub creator: AccountId,
    /// Unix timestamp (seconds) of publication.
    pub created_at: u64,
    /// View counter.
    #[serde(default)]
    pub views: i64,
    /// Share counter.
    #[serde(default)]
    pub shares: i64,
    /// Verification counter.
    #[serde(default)]
    pub verifications: i64,
    /// Whether the capsule has been minted as an NFT.
    #[serde(default)]
    pub minted: bool,
    /// Whether the capsule carries a veritas seal (notarized).
    #[serde(default)]
    pub veritas_sealed: bool,
    /// Quality score in [0, 100] from the grading collaborator.
    #[serde(default = "default_quality_score")]
    pub quality_score: f64,
    /// Free-form category tag.
    #[serde(default)]
    pub category: String,
}

fn default_quality_score() -> f64 {
    NEUTRAL_QUALITY_SCORE
}

impl Capsule {
    /// Whole days elapsed since publication, never less than zero.
    pub fn days_active(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at) / crate::SECONDS_PER_DAY
    }
}
