use std::time::Duration;

use tracing::{info, warn};

use crate::state::{AppState, with_db};

/// Background task that removes orphaned media.
///
/// Runs on an interval, finds assets older than `grace_hours` that no section
/// item or page setting references, and deletes their rows and files.
pub async fn run_cleanup_loop(state: AppState, interval_secs: u64, grace_hours: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match cleanup_orphans(&state, grace_hours).await {
            Ok(count) => {
                if count > 0 {
                    info!("Cleanup: removed {} orphaned assets", count);
                }
            }
            Err(e) => {
                warn!("Cleanup error: {}", e);
            }
        }
    }
}

pub async fn cleanup_orphans(state: &AppState, grace_hours: u64) -> anyhow::Result<usize> {
    let orphans = with_db(state, move |db| db.find_orphaned_assets(grace_hours)).await?;

    let mut count = 0;
    for asset in orphans {
        // Row first, so a half-finished pass never leaves a row without a file.
        let id = asset.id.clone();
        if !with_db(state, move |db| db.delete_asset(&id)).await? {
            continue;
        }
        if let Err(e) = state.storage.delete_file(&asset.file_name).await {
            warn!("Cleanup: could not delete {}: {}", asset.file_name, e);
        }
        count += 1;
    }

    Ok(count)
}
