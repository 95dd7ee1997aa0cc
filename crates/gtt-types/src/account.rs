//! Account and membership tier structures.

use serde::{Deserialize, Serialize};

use crate::AccountId;

/// Ordered membership tier.
///
/// Tier is assigned by an external membership/upgrade process; the yield
/// core only reads it. The derived `Ord` follows declaration order, so
/// `Explorer < Seeker < Creator < Sovereign`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Explorer,
    Seeker,
    Creator,
    Sovereign,
}

impl Tier {
    /// Parse a tier from a free-form label.
    ///
    /// Unknown or missing labels map to the lowest tier rather than
    /// erroring: membership data may lag behind account creation, and an
    /// unrecognized tier must never block reward computation.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "seeker" => Tier::Seeker,
            "creator" => Tier::Creator,
            "sovereign" => Tier::Sovereign,
            _ => Tier::Explorer,
        }
    }

    /// Zero-based rank of the tier, lowest first.
    pub fn rank(&self) -> usize {
        *self as usize
    }

    /// All tiers in ascending order.
    pub fn all() -> [Tier; 4] {
        [Tier::Explorer, Tier::Seeker, Tier::Creator, Tier::Sovereign]
    }
}

impl Default for Tier {
    fn default() -> Self {
        Tier::Explorer
    }
}

/// A platform account as seen by the yield core.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    /// Account identifier.
    pub id: AccountId,
    /// Membership tier (read-only here).
    #[serde(default)]
    pub tier: Tier,
    /// Cumulative GTT claimed over the account's lifetime.
    #[serde(default)]
    pub lifetime_claimed: f64,
    /// Current unclaimed (claimable) GTT balance.
    #[serde(default)]
    pub claimable: f64,
}

impl Account {
    /// Create an account with zero balances.
    pub fn new(id: impl Into<AccountId>, tier: Tier) -> Self {
        Self {
            id: id.into(),
            tier,
            lifetime_claimed: 0.0,
            claimable: 0.0,
        }
    }
}
