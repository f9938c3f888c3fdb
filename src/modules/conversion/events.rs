use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::model::JobId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeJob {
    pub job_id: JobId,
    pub input: PathBuf,  // scratch upload, removed once the job ends
    pub output: PathBuf, // <public>/<video_subdir>/<job_id>
}

/// Completion signal sent from a transcode task to the completion worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeOutcome {
    pub job: TranscodeJob,
    pub succeeded: bool,
}

impl TranscodeOutcome {
    pub fn succeeded(job: TranscodeJob) -> Self {
        Self { job, succeeded: true }
    }

    pub fn failed(job: TranscodeJob) -> Self {
        Self { job, succeeded: false }
    }
}
