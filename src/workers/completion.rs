use crate::modules::conversion::service::ConversionService;
use crate::state::AppState;
use tracing::info;

/// Applies transcode outcomes one at a time: input cleanup, partial-output
/// cleanup and the registry transition. Runs until the outcome queue is
/// closed and drained.
pub async fn start_completion_worker(state: AppState) {
    info!("📬 Starting Completion Worker...");

    let outcomes = state.outcomes.subscribe();

    while let Ok(outcome) = outcomes.recv().await {
        ConversionService::finish(&state, &outcome.job, outcome.succeeded).await;
    }

    info!("📬 Completion Worker stopped");
}
