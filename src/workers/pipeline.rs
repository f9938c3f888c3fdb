use crate::state::AppState;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::completion::start_completion_worker;
use super::transcoder::start_transcoder_worker;

/// The transcoder and completion workers, started and stopped together.
pub struct ConversionWorkers {
    state: AppState,
    shutdown: CancellationToken,
    transcoder: JoinHandle<()>,
    completion: JoinHandle<()>,
}

impl ConversionWorkers {
    pub fn spawn(state: &AppState, shutdown: CancellationToken) -> Self {
        Self {
            transcoder: tokio::spawn(start_transcoder_worker(state.clone(), shutdown.clone())),
            completion: tokio::spawn(start_completion_worker(state.clone())),
            state: state.clone(),
            shutdown,
        }
    }

    /// Refuses new jobs, fails everything unfinished, and returns once every
    /// accepted job has reached a terminal state with its files cleaned up.
    pub async fn shutdown(self) {
        info!("Stopping conversion workers...");

        self.state.queue.close();
        self.shutdown.cancel();
        if let Err(e) = self.transcoder.await {
            error!("Transcoder worker panicked: {}", e);
        }

        // Every outcome is queued by now.
        self.state.outcomes.close();
        if let Err(e) = self.completion.await {
            error!("Completion worker panicked: {}", e);
        }
    }
}
