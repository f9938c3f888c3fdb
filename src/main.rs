use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod common;
mod config;
mod docs;
mod infrastructure;
mod modules;
mod routes;
mod state;
mod workers;

use crate::config::settings::AppConfig;
use crate::state::AppState;
use crate::workers::ffmpeg::FfmpegTranscoder;
use crate::workers::pipeline::ConversionWorkers;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting server...");

    let config = AppConfig::new()?;
    config.ensure_dirs().await?;

    let transcoder = FfmpegTranscoder::new(&config.ffmpeg_bin);
    if !transcoder.is_available().await {
        warn!("{} is not runnable; every conversion will fail", config.ffmpeg_bin);
    }

    let state = AppState::new(config.clone(), Arc::new(transcoder));
    let shutdown = CancellationToken::new();

    let conversion = ConversionWorkers::spawn(&state, shutdown.clone());
    let sweeper = tokio::spawn(workers::sweeper::start_retention_sweeper(
        config.video_dir(),
        config.retention,
        config.sweep_interval,
        shutdown.clone(),
    ));
    let reaper = tokio::spawn(workers::reaper::start_failed_job_reaper(
        state.jobs.clone(),
        config.failed_job_ttl,
        config.sweep_interval,
        shutdown.clone(),
    ));

    let app = app::create_app(state.clone());

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server running on http://{}", addr);

    // Submissions still in flight when the signal lands are refused by the closed queue.
    let queue = state.queue.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down...");
            queue.close();
        })
        .await;

    conversion.shutdown().await;
    let _ = tokio::join!(sweeper, reaper);

    served.context("Server error")
}
