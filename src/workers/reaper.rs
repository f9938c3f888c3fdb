use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::modules::conversion::registry::JobRegistry;

/// Periodically forgets failed jobs once they have been pollable for `ttl`.
pub async fn start_failed_job_reaper(
    jobs: JobRegistry,
    ttl: Duration,
    every: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let pruned = jobs.prune_failed(ttl).await;
        if pruned > 0 {
            info!(
                "Forgot {} failed jobs older than {:?} ({} still tracked)",
                pruned,
                ttl,
                jobs.len().await
            );
        }
    }
}
