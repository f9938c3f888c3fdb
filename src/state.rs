use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::infrastructure::queue::channel::{JobQueue, OutcomeQueue};
use crate::modules::conversion::registry::JobRegistry;
use crate::workers::transcoder::Transcoder;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub jobs: JobRegistry,
    pub queue: JobQueue,
    pub outcomes: OutcomeQueue,
    pub transcoder: Arc<dyn Transcoder>,
}

impl AppState {
    pub fn new(config: AppConfig, transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            config,
            jobs: JobRegistry::new(),
            queue: JobQueue::new(),
            outcomes: OutcomeQueue::new(),
            transcoder,
        }
    }
}
