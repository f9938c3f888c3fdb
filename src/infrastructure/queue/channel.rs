use anyhow::{anyhow, Result};
use async_channel::{Receiver, Sender};

use crate::modules::conversion::events::{TranscodeJob, TranscodeOutcome};

/// Jobs waiting for the transcoder worker.
pub type JobQueue = Queue<TranscodeJob>;

/// Finished transcodes waiting for the completion worker.
pub type OutcomeQueue = Queue<TranscodeOutcome>;

/// In-process hand-off between producers and a worker loop.
pub struct Queue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
}

impl<T> Queue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = async_channel::unbounded();
        Self { sender, receiver }
    }

    /// Fails once the queue is closed; the message is dropped.
    pub async fn publish(&self, message: T) -> Result<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| anyhow!("Failed to publish: queue is closed"))
    }

    pub fn subscribe(&self) -> Receiver<T> {
        self.receiver.clone()
    }

    /// Refuses new messages. Subscribers still drain what was already queued.
    pub fn close(&self) {
        self.sender.close();
    }
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            receiver: self.receiver.clone(),
        }
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn job(id: &str) -> TranscodeJob {
        TranscodeJob {
            job_id: id.to_string(),
            input: PathBuf::from("uploads/1.webm"),
            output: PathBuf::from(format!("public/videos/{}", id)),
        }
    }

    #[tokio::test]
    async fn published_jobs_reach_subscribers_in_order() {
        let queue = JobQueue::new();
        let rx = queue.subscribe();

        queue.publish(job("video_1.mp4")).await.unwrap();
        queue.publish(job("video_2.mp4")).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().job_id, "video_1.mp4");
        assert_eq!(rx.recv().await.unwrap().job_id, "video_2.mp4");
    }

    #[tokio::test]
    async fn publish_after_close_fails() {
        let queue = JobQueue::new();
        queue.close();

        assert!(queue.publish(job("video_3.mp4")).await.is_err());
    }

    #[tokio::test]
    async fn closed_queue_still_drains_backlog() {
        let queue = JobQueue::new();
        let rx = queue.subscribe();
        queue.publish(job("video_4.mp4")).await.unwrap();

        queue.close();

        assert_eq!(rx.recv().await.unwrap().job_id, "video_4.mp4");
        assert!(rx.recv().await.is_err());
    }
}
