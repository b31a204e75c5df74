use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use takas_db::Database;

/// Background task that prunes long-expired ads and stale one-time tokens.
pub async fn run_cleanup_loop(db: Arc<Database>, retention_days: i64, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let db = db.clone();
        let result =
            tokio::task::spawn_blocking(move || cleanup_expired(&db, retention_days)).await;
        match result {
            Ok(Ok((ads, tokens))) => {
                if ads > 0 || tokens > 0 {
                    info!("Cleanup: pruned {} expired ads and {} tokens", ads, tokens);
                }
            }
            Ok(Err(e)) => warn!("Cleanup error: {}", e),
            Err(e) => warn!("Cleanup task panicked: {}", e),
        }
    }
}

fn cleanup_expired(db: &Database, retention_days: i64) -> anyhow::Result<(usize, usize)> {
    let now = Utc::now();
    let ads = db.delete_ads_expired_before(now - chrono::Duration::days(retention_days))?;
    let tokens = db.delete_expired_tokens(now)?;
    Ok((ads, tokens))
}
