use super::events::TranscodeJob;
use super::model::{JobId, JobStatus};
use crate::common::upload::StoredUpload;
use crate::state::AppState;
use anyhow::Result;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

pub struct ConversionService;

impl ConversionService {
    /// Registers a pending job for the upload and queues its conversion.
    /// Returns as soon as the job is queued.
    pub async fn submit(state: &AppState, upload: StoredUpload) -> Result<JobId> {
        let job_id = state.jobs.submit().await;
        let job = TranscodeJob {
            output: state.config.video_dir().join(&job_id),
            input: upload.path,
            job_id: job_id.clone(),
        };

        info!(
            "Accepted upload {} ({} bytes) as job {}",
            job.input.display(),
            upload.size,
            job_id
        );

        if let Err(e) = state.queue.publish(job.clone()).await {
            Self::finish(state, &job, false).await;
            return Err(e);
        }

        Ok(job_id)
    }

    pub async fn status(state: &AppState, job_id: &str) -> JobStatus {
        state.jobs.get_status(job_id).await
    }

    /// Applies a transcode outcome: the scratch input goes away either way,
    /// a failed run also loses whatever partial output it left.
    pub async fn finish(state: &AppState, job: &TranscodeJob, succeeded: bool) {
        remove_quietly(&job.input).await;

        if succeeded {
            let location = state.config.video_url(&job.job_id);
            state.jobs.mark_complete(&job.job_id, location).await;
        } else {
            remove_quietly(&job.output).await;
            state.jobs.mark_failed(&job.job_id).await;
        }
    }
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}
