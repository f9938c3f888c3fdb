use axum::Router;
use crate::state::AppState;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub fn create_app(state: AppState) -> Router {
    // Anything not routed is a static file: the player page and finished videos.
    let static_files = ServeDir::new(&state.config.public_dir);

    crate::routes::configure_routes(state.clone())
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
