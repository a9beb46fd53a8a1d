//! Periodic removal of expired lock records.
//!
//! Expired locks are already invisible to every lock operation; this loop
//! only keeps the table from growing with records nobody released.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::lock_store::LockStore;

/// Run the purge loop until `cancel` is triggered.
pub async fn run(locks: Arc<LockStore>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        "Lock purge job started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Lock purge job stopping");
                break;
            }
            _ = ticker.tick() => {
                let purged = locks.purge_expired().await;
                if purged > 0 {
                    tracing::info!(purged, "Lock purge: dropped expired locks");
                } else {
                    tracing::debug!("Lock purge: nothing expired");
                }
            }
        }
    }
}
