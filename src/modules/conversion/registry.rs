use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::model::{JobEntry, JobId, JobState, JobStatus};

/// Hands out `video_<n>.mp4` names where `n` tracks wall-clock millis but never repeats.
#[derive(Debug, Default)]
pub struct JobIdGenerator {
    last: AtomicU64,
}

impl JobIdGenerator {
    pub fn next(&self) -> JobId {
        let now = now_millis();
        let prev = match self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
        {
            Ok(prev) | Err(prev) => prev,
        };

        format!("video_{}.mp4", now.max(prev + 1))
    }
}

fn now_millis() -> u64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64
}

/// In-process job table. Every operation takes the lock once, so readers
/// never see a half-applied transition.
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<Mutex<HashMap<JobId, JobEntry>>>,
    ids: Arc<JobIdGenerator>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn submit(&self) -> JobId {
        let id = self.ids.next();
        self.jobs.lock().await.insert(id.clone(), JobEntry::pending());
        id
    }

    /// Unknown ids and jobs already in a terminal state are left alone.
    pub async fn mark_complete(&self, id: &str, output_location: String) {
        let mut jobs = self.jobs.lock().await;
        match jobs.get_mut(id) {
            Some(entry) if entry.state == JobState::Pending => {
                let now = OffsetDateTime::now_utc();
                entry.state = JobState::Complete { output_location };
                entry.finished_at = Some(now);
                debug!(job_id = %id, elapsed = %(now - entry.submitted_at), "Job complete");
            }
            Some(entry) => warn!("Ignoring completion for job {} in state {:?}", id, entry.state),
            None => debug!("Ignoring completion for unknown job {}", id),
        }
    }

    pub async fn mark_failed(&self, id: &str) {
        let mut jobs = self.jobs.lock().await;
        match jobs.get_mut(id) {
            Some(entry) if entry.state == JobState::Pending => {
                let now = OffsetDateTime::now_utc();
                entry.state = JobState::Failed;
                entry.finished_at = Some(now);
                debug!(job_id = %id, elapsed = %(now - entry.submitted_at), "Job failed");
            }
            Some(entry) => warn!("Ignoring failure for job {} in state {:?}", id, entry.state),
            None => debug!("Ignoring failure for unknown job {}", id),
        }
    }

    /// Reading a completed job hands out its location once and forgets the job.
    /// Failed jobs stay readable until [`JobRegistry::prune_failed`] drops them.
    pub async fn get_status(&self, id: &str) -> JobStatus {
        let mut jobs = self.jobs.lock().await;

        let state = match jobs.get(id) {
            Some(entry) => entry.state.clone(),
            None => return JobStatus::NotFound,
        };

        match state {
            JobState::Pending => JobStatus::Pending,
            JobState::Failed => JobStatus::Failed,
            JobState::Complete { output_location } => {
                jobs.remove(id);
                JobStatus::Complete { output_location }
            }
        }
    }

    /// Drops failed entries that have been terminal for longer than `ttl`.
    pub async fn prune_failed(&self, ttl: Duration) -> usize {
        let now = OffsetDateTime::now_utc();
        let mut jobs = self.jobs.lock().await;
        let before = jobs.len();

        jobs.retain(|_, entry| match (&entry.state, entry.finished_at) {
            (JobState::Failed, Some(finished_at)) => now - finished_at <= ttl,
            _ => true,
        });

        before - jobs.len()
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    #[cfg(test)]
    pub async fn states(&self) -> Vec<(JobId, JobState)> {
        let jobs = self.jobs.lock().await;
        jobs.iter().map(|(id, entry)| (id.clone(), entry.state.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let registry = JobRegistry::new();
        assert_eq!(registry.get_status("video_1.mp4").await, JobStatus::NotFound);
    }

    #[tokio::test]
    async fn fresh_job_is_pending() {
        let registry = JobRegistry::new();
        let id = registry.submit().await;

        assert_eq!(registry.get_status(&id).await, JobStatus::Pending);
        assert_eq!(registry.get_status(&id).await, JobStatus::Pending);
    }

    #[tokio::test]
    async fn completed_job_is_delivered_once() {
        let registry = JobRegistry::new();
        let id = registry.submit().await;
        let location = format!("/videos/{}", id);

        registry.mark_complete(&id, location.clone()).await;

        assert_eq!(
            registry.get_status(&id).await,
            JobStatus::Complete { output_location: location }
        );
        assert_eq!(registry.get_status(&id).await, JobStatus::NotFound);
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn failed_job_reads_are_repeatable() {
        let registry = JobRegistry::new();
        let id = registry.submit().await;

        registry.mark_failed(&id).await;

        assert_eq!(registry.get_status(&id).await, JobStatus::Failed);
        assert_eq!(registry.get_status(&id).await, JobStatus::Failed);
    }

    #[tokio::test]
    async fn marking_unknown_ids_has_no_effect() {
        let registry = JobRegistry::new();

        registry.mark_complete("video_100.mp4", "/videos/video_100.mp4".to_string()).await;
        registry.mark_failed("video_101.mp4").await;

        assert_eq!(registry.len().await, 0);
        assert_eq!(registry.get_status("video_100.mp4").await, JobStatus::NotFound);
        assert_eq!(registry.get_status("video_101.mp4").await, JobStatus::NotFound);
    }

    #[tokio::test]
    async fn terminal_states_are_never_left() {
        let registry = JobRegistry::new();

        let failed = registry.submit().await;
        registry.mark_failed(&failed).await;
        registry.mark_complete(&failed, "/videos/x".to_string()).await;
        assert_eq!(registry.get_status(&failed).await, JobStatus::Failed);

        let done = registry.submit().await;
        registry.mark_complete(&done, "/videos/done".to_string()).await;
        registry.mark_failed(&done).await;
        assert_eq!(
            registry.get_status(&done).await,
            JobStatus::Complete { output_location: "/videos/done".to_string() }
        );
    }

    #[tokio::test]
    async fn prune_failed_respects_ttl() {
        let registry = JobRegistry::new();
        let failed = registry.submit().await;
        let pending = registry.submit().await;
        registry.mark_failed(&failed).await;

        assert_eq!(registry.prune_failed(Duration::from_secs(3600)).await, 0);
        assert_eq!(registry.get_status(&failed).await, JobStatus::Failed);

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(registry.prune_failed(Duration::ZERO).await, 1);
        assert_eq!(registry.get_status(&failed).await, JobStatus::NotFound);
        assert_eq!(registry.get_status(&pending).await, JobStatus::Pending);
    }

    #[tokio::test]
    async fn concurrent_submissions_get_distinct_ids() {
        let registry = JobRegistry::new();

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.submit().await })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap());
        }

        assert_eq!(ids.len(), 64);
        assert_eq!(registry.len().await, 64);
    }

    #[test]
    fn ids_are_strictly_increasing() {
        let ids = JobIdGenerator::default();
        let parse = |id: &str| -> u64 {
            id.trim_start_matches("video_")
                .trim_end_matches(".mp4")
                .parse()
                .unwrap()
        };

        let mut last = parse(&ids.next());
        for _ in 0..1000 {
            let next = parse(&ids.next());
            assert!(next > last);
            last = next;
        }
    }
}
