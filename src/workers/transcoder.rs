use crate::modules::conversion::events::{TranscodeJob, TranscodeOutcome};
use crate::modules::conversion::service::ConversionService;
use crate::state::AppState;
use futures_util::future::BoxFuture;
use std::path::PathBuf;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::ffmpeg::TranscodeProfile;

#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub profile: TranscodeProfile,
}

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("Failed to start transcoder: {0}")]
    Spawn(std::io::Error),
    #[error("Transcoder exited with code {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },
    #[error("Transcoder produced no output at {}", .0.display())]
    MissingOutput(PathBuf),
    #[error("Transcode cancelled by shutdown")]
    Cancelled,
}

/// External encoder contract: given input, output and settings, it eventually
/// succeeds (leaving a file at `output`) or fails.
pub trait Transcoder: Send + Sync {
    fn transcode(&self, request: TranscodeRequest) -> BoxFuture<'static, Result<(), TranscodeError>>;
}

/// Consumes queued jobs, running each conversion on its own task.
///
/// Returns once the job queue is closed and drained, or on shutdown. On
/// shutdown, queued jobs that never started and conversions still running are
/// reported as failed, and this only returns after every one has reported.
pub async fn start_transcoder_worker(state: AppState, shutdown: CancellationToken) {
    info!("🎥 Starting Transcoder Worker...");

    let jobs = state.queue.subscribe();
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    error!("Transcode task aborted: {}", e);
                }
            }
            job = jobs.recv() => match job {
                Ok(job) => {
                    info!("📦 Received transcoding job {}", job.job_id);
                    in_flight.spawn(process_job(state.clone(), job, shutdown.clone()));
                }
                Err(_) => break,
            },
        }
    }

    jobs.close();
    while let Ok(job) = jobs.try_recv() {
        warn!("Job {} never started before shutdown", job.job_id);
        report(&state, TranscodeOutcome::failed(job)).await;
    }

    while in_flight.join_next().await.is_some() {}

    info!("🎥 Transcoder Worker stopped");
}

async fn process_job(state: AppState, job: TranscodeJob, shutdown: CancellationToken) {
    let request = TranscodeRequest {
        input: job.input.clone(),
        output: job.output.clone(),
        profile: state.config.transcode_profile.clone(),
    };

    info!("Converting {} -> {}", request.input.display(), request.output.display());

    // Dropping the transcode future kills ffmpeg (kill_on_drop).
    let result = tokio::select! {
        biased;
        _ = shutdown.cancelled() => Err(TranscodeError::Cancelled),
        result = state.transcoder.transcode(request) => result,
    };

    let outcome = match result {
        Ok(()) => {
            info!("✅ Job completed successfully: {}", job.job_id);
            TranscodeOutcome::succeeded(job)
        }
        Err(e) => {
            error!("❌ Failed to process job {}: {}", job.job_id, e);
            TranscodeOutcome::failed(job)
        }
    };

    report(&state, outcome).await;
}

/// Hands the outcome to the completion worker, or applies it here if that
/// worker has already stopped.
async fn report(state: &AppState, outcome: TranscodeOutcome) {
    if let Err(e) = state.outcomes.publish(outcome.clone()).await {
        warn!("{}; applying outcome for {} inline", e, outcome.job.job_id);
        ConversionService::finish(state, &outcome.job, outcome.succeeded).await;
    }
}
