//! Per-capsule yield scoring.
//!
//! A capsule's raw yield is a weighted sum of its engagement counters
//! plus flat bonuses for minting and notarization:
//!
//! ```text
//! raw = views*0.5 + shares*1.5 + verifications*3.0
//!     + (minted ? 10.0 : 0) + (veritas_sealed ? 5.0 : 0)
//! ```
//!
//! The raw score is then scaled by a quality multiplier derived from the
//! capsule's grading score, clamped to a configurable range so that
//! neither griefed nor gamed capsules can swing rewards to extremes.

use serde::{Deserialize, Serialize};

use gtt_types::Capsule;

use crate::{Result, YieldError};

/// Default weight per view.
pub const DEFAULT_VIEW_WEIGHT: f64 = 0.5;

/// Default weight per share.
pub const DEFAULT_SHARE_WEIGHT: f64 = 1.5;

/// Default weight per verification.
pub const DEFAULT_VERIFICATION_WEIGHT: f64 = 3.0;

/// Default flat bonus for a minted capsule.
pub const DEFAULT_MINT_BONUS: f64 = 10.0;

/// Default flat bonus for a veritas-sealed capsule.
pub const DEFAULT_SEAL_BONUS: f64 = 5.0;

/// Default lower clamp for the quality multiplier.
pub const DEFAULT_QUALITY_FLOOR: f64 = 0.1;

/// Default upper clamp for the quality multiplier.
pub const DEFAULT_QUALITY_CEILING: f64 = 2.0;

/// Externally configurable scoring weights.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct YieldWeights {
    /// Weight per view.
    pub view_weight: f64,
    /// Weight per share.
    pub share_weight: f64,
    /// Weight per verification.
    pub verification_weight: f64,
    /// Flat bonus for minted capsules.
    pub mint_bonus: f64,
    /// Flat bonus for veritas-sealed capsules.
    pub seal_bonus: f64,
    /// Lower clamp for the quality multiplier.
    pub quality_floor: f64,
    /// Upper clamp for the quality multiplier.
    pub quality_ceiling: f64,
}

impl Default for YieldWeights {
    fn default() -> Self {
        Self {
            view_weight: DEFAULT_VIEW_WEIGHT,
            share_weight: DEFAULT_SHARE_WEIGHT,
            verification_weight: DEFAULT_VERIFICATION_WEIGHT,
            mint_bonus: DEFAULT_MINT_BONUS,
            seal_bonus: DEFAULT_SEAL_BONUS,
            quality_floor: DEFAULT_QUALITY_FLOOR,
            quality_ceiling: DEFAULT_QUALITY_CEILING,
        }
    }
}

impl YieldWeights {
    /// Validate clamp bounds.
    ///
    /// # Errors
    ///
    /// - [`YieldError::InvalidClampBounds`] if the floor is non-positive
    ///   or exceeds the ceiling
    pub fn validate(&self) -> Result<()> {
        if self.quality_floor <= 0.0 || self.quality_floor > self.quality_ceiling {
            return Err(YieldError::InvalidClampBounds {
                floor: self.quality_floor,
                ceiling: self.quality_ceiling,
            });
        }
        Ok(())
    }
}

/// Quality multiplier for a grading score in [0, 100].
///
/// A score of 50 is neutral (1.0). The linear mapping `score / 50` is
/// clamped to `[quality_floor, quality_ceiling]`, bounding the effect of
/// both zero-scored and perfectly-scored capsules.
pub fn quality_multiplier(quality_score: f64, weights: &YieldWeights) -> f64 {
    let normalized = if quality_score.is_finite() {
        quality_score.max(0.0)
    } else {
        gtt_types::capsule::NEUTRAL_QUALITY_SCORE
    };
    (normalized / gtt_types::capsule::NEUTRAL_QUALITY_SCORE)
        .clamp(weights.quality_floor, weights.quality_ceiling)
}

/// Compute the yield score for a single capsule.
///
/// Negative counters (corrupt or partial engagement feeds) are
/// normalized to zero rather than rejected: absent data must never crash
/// reward computation. The result is never negative, and a capsule with
/// zero engagement and no flags yields exactly 0.0.
pub fn compute_yield(capsule: &Capsule, weights: &YieldWeights) -> f64 {
    let views = capsule.views.max(0) as f64;
    let shares = capsule.shares.max(0) as f64;
    let verifications = capsule.verifications.max(0) as f64;

    let mut raw = views * weights.view_weight
        + shares * weights.share_weight
        + verifications * weights.verification_weight;
    if capsule.minted {
        raw += weights.mint_bonus;
    }
    if capsule.veritas_sealed {
        raw += weights.seal_bonus;
    }

    let quality = quality_multiplier(capsule.quality_score, weights);
    let score = (raw * quality).max(0.0);

    tracing::trace!(
        capsule = %capsule.id,
        raw,
        quality,
        score,
        "computed capsule yield"
    );

    score
}
