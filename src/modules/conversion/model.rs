use time::OffsetDateTime;

/// Job identifier; also the file name of the finished video.
pub type JobId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Complete { output_location: String },
    Failed,
}

#[derive(Debug, Clone)]
pub struct JobEntry {
    pub state: JobState,
    pub submitted_at: OffsetDateTime,
    pub finished_at: Option<OffsetDateTime>,
}

impl JobEntry {
    pub fn pending() -> Self {
        Self {
            state: JobState::Pending,
            submitted_at: OffsetDateTime::now_utc(),
            finished_at: None,
        }
    }
}

/// What a status read observes. `NotFound` covers both never-submitted
/// and already-delivered jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    NotFound,
    Pending,
    Failed,
    Complete { output_location: String },
}
