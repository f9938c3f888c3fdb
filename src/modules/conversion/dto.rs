use serde::Serialize;
use utoipa::ToSchema;

use super::model::JobStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatusKind {
    Pending,
    Failed,
    Complete,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: JobStatusKind,
    pub status_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatusKind,
    /// Public location of the finished video, only set once complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl JobStatusResponse {
    /// `None` for `NotFound`.
    pub fn from_status(job_id: String, status: JobStatus) -> Option<Self> {
        let (status, url) = match status {
            JobStatus::NotFound => return None,
            JobStatus::Pending => (JobStatusKind::Pending, None),
            JobStatus::Failed => (JobStatusKind::Failed, None),
            JobStatus::Complete { output_location } => (JobStatusKind::Complete, Some(output_location)),
        };

        Some(Self { job_id, status, url })
    }
}
