//! # gtt-types
//!
//! Shared domain types used across the GTT yield-core workspace.
//!
//! The core receives already-authenticated account identifiers and
//! already-validated capsule/stake records from the surrounding platform;
//! these are the shapes it consumes and produces.

pub mod account;
pub mod capsule;
pub mod stake;

pub use account::{Account, Tier};
pub use capsule::Capsule;
pub use stake::StakePosition;

/// Opaque account identifier (wallet address or platform user id).
pub type AccountId = String;

/// Opaque capsule identifier.
pub type CapsuleId = String;

/// A 32-byte accrual period identifier.
pub type PeriodId = [u8; 32];

/// The reward token symbol carried on settlement intents.
pub const TOKEN_SYMBOL: &str = "GTT";

/// Seconds per day, used for staking-period and days-active math.
pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Days per year, used for APY-equivalent display math.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Comparison tolerance for token amounts.
///
/// Reward amounts are f64; two amounts within this epsilon are treated
/// as equal by the aggregation and claim-validation paths.
pub const AMOUNT_EPSILON: f64 = 1e-9;
