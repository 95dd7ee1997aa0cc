//! Engine configuration.
//!
//! Financial parameters (base APY, conversion rate, performance fee,
//! bonus schedule) carry NO defaults: a deployment that omits one fails
//! at startup with a [`ConfigError`] instead of silently paying rewards
//! from a guessed constant. Operational parameters (lock timeout,
//! compound interval, scoring weights) default to the documented values.

use std::path::Path;

use serde::{Deserialize, Serialize};

use gtt_claims::coordinator::{ClaimConfig, DEFAULT_LOCK_TIMEOUT_MS};
use gtt_claims::period::DEFAULT_PERIOD_SECS;
use gtt_yield::convert::{ConversionConfig, DEFAULT_MIN_CLAIM_YIELD};
use gtt_yield::formula::YieldWeights;
use gtt_yield::tiers::BonusSchedule;

/// Environment variable naming the config file path.
pub const CONFIG_PATH_ENV: &str = "GTT_CONFIG";

/// Default auto-compound interval (24 hours).
pub const DEFAULT_COMPOUND_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Configuration errors. All fatal: the engine refuses to start.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required financial parameter was not supplied.
    #[error("missing required configuration parameter: {0}")]
    MissingParameter(&'static str),

    /// A parameter was supplied outside its valid range.
    #[error("configuration parameter {name} out of range: {value}")]
    OutOfRange {
        /// Dotted parameter path.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file could not be parsed.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// `[rewards]` section.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RewardsSection {
    /// Base APY as a fraction (e.g. 0.12). Required.
    pub base_apy: Option<f64>,
    /// Tokens per yield point (e.g. 0.1). Required.
    pub conversion_rate: Option<f64>,
    /// Minimum capsule yield before its reward is claimable.
    #[serde(default = "default_min_claim_yield")]
    pub min_claim_yield: f64,
    /// Scoring weights; defaults are the platform formula.
    #[serde(default)]
    pub weights: YieldWeights,
}

fn default_min_claim_yield() -> f64 {
    DEFAULT_MIN_CLAIM_YIELD
}

impl Default for RewardsSection {
    fn default() -> Self {
        Self {
            base_apy: None,
            conversion_rate: None,
            min_claim_yield: default_min_claim_yield(),
            weights: YieldWeights::default(),
        }
    }
}

/// `[tiers]` section.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TiersSection {
    /// Additive bonus per tier, lowest first. Required.
    pub tier_bonuses: Option<[f64; 4]>,
    /// Period bonus steps as `[min_days, bonus]` pairs, ascending. Required.
    pub period_steps: Option<Vec<(u64, f64)>>,
}

/// `[vault]` section.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VaultSection {
    /// Performance fee rate in [0, 1]. Required.
    pub performance_fee_rate: Option<f64>,
    /// Auto-compound interval in seconds.
    #[serde(default = "default_compound_interval")]
    pub compound_interval_secs: u64,
}

fn default_compound_interval() -> u64 {
    DEFAULT_COMPOUND_INTERVAL_SECS
}

impl Default for VaultSection {
    fn default() -> Self {
        Self {
            performance_fee_rate: None,
            compound_interval_secs: default_compound_interval(),
        }
    }
}

/// `[claims]` section.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClaimsSection {
    /// Bound on waiting for an account claim lock, in milliseconds.
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_ms: u64,
    /// Accrual period length in seconds.
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,
}

fn default_lock_timeout() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

fn default_period_secs() -> u64 {
    DEFAULT_PERIOD_SECS
}

impl Default for ClaimsSection {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout(),
            period_secs: default_period_secs(),
        }
    }
}

/// Complete engine configuration as deserialized from TOML.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Reward conversion settings.
    #[serde(default)]
    pub rewards: RewardsSection,
    /// Tier/period bonus schedule.
    #[serde(default)]
    pub tiers: TiersSection,
    /// Vault settings.
    #[serde(default)]
    pub vault: VaultSection,
    /// Claim settings.
    #[serde(default)]
    pub claims: ClaimsSection,
}

/// Validated, fully resolved configuration handed to the engine.
#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    /// Conversion parameters for the yield pipeline.
    pub conversion: ConversionConfig,
    /// Scoring weights.
    pub weights: YieldWeights,
    /// Tier/period bonus schedule.
    pub schedule: BonusSchedule,
    /// Claim coordinator settings.
    pub claim: ClaimConfig,
    /// Vault performance fee rate.
    pub performance_fee_rate: f64,
    /// Auto-compound interval in seconds.
    pub compound_interval_secs: u64,
}

impl EngineConfig {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a file path, or from `GTT_CONFIG` when `path` is `None`.
    ///
    /// Unlike operational daemons, there is no default-config fallback:
    /// an absent file is a startup failure because the financial
    /// parameters have nowhere else to come from.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let owned;
        let path: &Path = match path {
            Some(p) => p,
            None => {
                owned = std::env::var(CONFIG_PATH_ENV).map_err(|_| {
                    ConfigError::MissingParameter("GTT_CONFIG (config file path)")
                })?;
                Path::new(&owned)
            }
        };
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Validate and resolve into the concrete engine parameters.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingParameter`] for any absent financial value
    /// - [`ConfigError::OutOfRange`] for values outside their ranges
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        let base_apy = self
            .rewards
            .base_apy
            .ok_or(ConfigError::MissingParameter("rewards.base_apy"))?;
        let conversion_rate = self
            .rewards
            .conversion_rate
            .ok_or(ConfigError::MissingParameter("rewards.conversion_rate"))?;
        let tier_bonuses = self
            .tiers
            .tier_bonuses
            .ok_or(ConfigError::MissingParameter("tiers.tier_bonuses"))?;
        let period_steps = self
            .tiers
            .period_steps
            .clone()
            .ok_or(ConfigError::MissingParameter("tiers.period_steps"))?;
        let performance_fee_rate = self
            .vault
            .performance_fee_rate
            .ok_or(ConfigError::MissingParameter("vault.performance_fee_rate"))?;

        if base_apy < 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "rewards.base_apy",
                value: base_apy,
            });
        }
        if conversion_rate <= 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "rewards.conversion_rate",
                value: conversion_rate,
            });
        }
        if !(0.0..=1.0).contains(&performance_fee_rate) {
            return Err(ConfigError::OutOfRange {
                name: "vault.performance_fee_rate",
                value: performance_fee_rate,
            });
        }
        if let Some(&bad) = tier_bonuses.iter().find(|b| **b < 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "tiers.tier_bonuses",
                value: bad,
            });
        }
        if let Some(&(_, bad)) = period_steps.iter().find(|(_, b)| *b < 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "tiers.period_steps",
                value: bad,
            });
        }
        if self.rewards.min_claim_yield < 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "rewards.min_claim_yield",
                value: self.rewards.min_claim_yield,
            });
        }
        self.rewards.weights.validate().map_err(|_| {
            ConfigError::OutOfRange {
                name: "rewards.weights.quality_floor",
                value: self.rewards.weights.quality_floor,
            }
        })?;
        if self.vault.compound_interval_secs == 0 {
            return Err(ConfigError::OutOfRange {
                name: "vault.compound_interval_secs",
                value: 0.0,
            });
        }
        if self.claims.period_secs == 0 {
            return Err(ConfigError::OutOfRange {
                name: "claims.period_secs",
                value: 0.0,
            });
        }

        Ok(ResolvedConfig {
            conversion: ConversionConfig {
                conversion_rate,
                base_apy,
                min_claim_yield: self.rewards.min_claim_yield,
            },
            weights: self.rewards.weights.clone(),
            schedule: BonusSchedule {
                tier_bonuses,
                period_steps,
            },
            claim: ClaimConfig {
                lock_timeout_ms: self.claims.lock_timeout_ms,
                period_secs: self.claims.period_secs,
            },
            performance_fee_rate,
            compound_interval_secs: self.vault.compound_interval_secs,
        })
    }
}
