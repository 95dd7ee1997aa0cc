//! Deterministic accrual-period identifiers.
//!
//! Accrual time is bucketed into fixed-length periods; the identifier a
//! claim is keyed on is a domain-separated hash of the account and the
//! period index. Deriving the id instead of accepting a client-supplied
//! one means a stale retry hashes to the same key and lands on the
//! idempotency ledger instead of opening a second period.

use gtt_types::PeriodId;

/// Default accrual period length (24 hours).
pub const DEFAULT_PERIOD_SECS: u64 = 24 * 60 * 60;

/// Domain-separation context for period-id derivation.
const PERIOD_ID_CONTEXT: &str = "gtt-claims 2024-06-01 accrual period id v1";

/// The period index containing a timestamp.
///
/// A zero period length is treated as one second rather than dividing by
/// zero; configuration validation rejects it upstream.
pub fn period_index(unix_secs: u64, period_secs: u64) -> u64 {
    unix_secs / period_secs.max(1)
}

/// Seconds until the next period boundary.
pub fn seconds_until_next_period(unix_secs: u64, period_secs: u64) -> u64 {
    let period = period_secs.max(1);
    period - (unix_secs % period)
}

/// Derive the accrual-period identifier for an account and period index.
///
/// `id = blake3::derive_key(context, account_id || le_bytes(index))`
pub fn derive_period_id(account_id: &str, index: u64) -> PeriodId {
    let mut material = Vec::with_capacity(account_id.len() + 8);
    material.extend_from_slice(account_id.as_bytes());
    material.extend_from_slice(&index.to_le_bytes());
    blake3::derive_key(PERIOD_ID_CONTEXT, &material)
}

/// Hex rendering of a period id for logs and intents.
pub fn period_id_hex(id: &PeriodId) -> String {
    hex::encode(id)
}
