//! Auto-compound scheduling.
//!
//! The only background work the engine needs: a single task that folds
//! pending yield into the vault once per configured interval. Everything
//! else is request-driven.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::engine::Engine;

/// Current unix time in seconds.
pub fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Seconds until the next compound is due.
///
/// Zero when the interval has already elapsed (or nothing has ever
/// compounded).
pub fn seconds_until_next_compound(now: u64, last_compound_at: u64, interval_secs: u64) -> u64 {
    let due_at = last_compound_at.saturating_add(interval_secs);
    due_at.saturating_sub(now)
}

/// Run the compound scheduler until shutdown.
///
/// Each tick triggers one compound on the shared engine. A compound
/// already in flight (manual trigger racing the schedule) just skips
/// this tick; the next one picks the pending yield up.
pub async fn run(engine: Arc<Engine>, mut shutdown: broadcast::Receiver<()>) {
    let interval_secs = engine.config().compound_interval_secs;
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    // The first tick completes immediately; consume it so compounding
    // starts one full interval after startup.
    interval.tick().await;

    info!(interval_secs, "compound scheduler started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match engine.compound_now(now_unix()).await {
                    Ok(report) => {
                        info!(
                            gross = report.gross_yield,
                            net = report.net_yield,
                            share_price = report.share_price,
                            "scheduled compound complete"
                        );
                    }
                    Err(err) => {
                        warn!(%err, "scheduled compound skipped");
                    }
                }
            }
            _ = shutdown.recv() => {
                info!("compound scheduler stopping");
                break;
            }
        }
    }
}
