//! Retention purge of expired token records

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use token_revocation::{RevocationStore, StoreResult};
use tracing::{debug, error, info};

/// Delete records that expired before now; returns how many were removed
pub async fn purge_once(store: &dyn RevocationStore) -> StoreResult<u64> {
    let removed = store.purge_expired(Utc::now()).await?;
    if removed > 0 {
        info!(removed, "purged expired token records");
    } else {
        debug!("no expired token records to purge");
    }
    Ok(removed)
}

/// Run [`purge_once`] every `every` until the runtime shuts down
///
/// Only expired records are touched, so this never races with validation.
pub fn spawn_purge_task(store: Arc<dyn RevocationStore>, every: Duration) -> JoinHandle<()> {
    info!(interval_secs = every.as_secs(), "Starting token purge task");

    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = purge_once(store.as_ref()).await {
                error!(error = %err, "token purge failed");
            }
        }
    })
}
