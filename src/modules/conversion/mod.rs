use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use crate::state::AppState;

pub mod dto;
pub mod events;
pub mod handler;
pub mod model;
pub mod registry;
pub mod service;


pub fn router(state: AppState) -> axum::Router<AppState> {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/convert", post(handler::submit_conversion).layer(upload_limit))
        .route("/convert/{job_id}", get(handler::get_conversion_status))
}
