/// Mailsurge API - the HTTP control surface
///
/// Thin layer over the core engine: session creation and control,
/// snapshots, log export, and the live event stream.
pub mod api;
pub mod config;
pub mod context;
pub mod error;

pub use config::ServerConfig;
pub use context::ApiContext;
pub use error::ApiError;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Inline base64 attachments inflate request bodies; leave generous room
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Builds the API router over the shared engine components
pub fn router(ctx: Arc<ApiContext>) -> Router {
    Router::new()
        .route("/api/health", get(api::health::handler))
        .route("/api/test-smtp", post(api::smtp_test::handler))
        .route("/api/start-send", post(api::sessions::start_send))
        .route("/api/pause-send/{session_id}", post(api::sessions::pause))
        .route("/api/resume-send/{session_id}", post(api::sessions::resume))
        .route("/api/cancel-send/{session_id}", post(api::sessions::cancel))
        .route("/api/session/{session_id}", get(api::sessions::snapshot))
        .route("/api/download-logs/{session_id}", get(api::logs::download))
        .route("/api/sessions/{session_id}/events", get(api::events::stream))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(ctx)
}
