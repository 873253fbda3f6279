//! Axum router configuration with middleware.
//!
//! All REST routes live under `/api/v1/`; the streaming WebSocket sits
//! outside the REST namespace. Middleware: CORS and request tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Interview sessions
        .route("/interview/session", post(handlers::interview::create_session))
        .route("/interview/start", post(handlers::interview::start_interview))
        .route("/interview/message", post(handlers::interview::send_message))
        .route("/interview/end", post(handlers::interview::end_interview))
        .route(
            "/interview/final-summary-status",
            get(handlers::interview::final_summary_status),
        )
        .route("/interview/history", get(handlers::interview::get_history))
        .route("/interview/stats", get(handlers::interview::get_stats))
        .route(
            "/interview/per-turn-feedback",
            get(handlers::interview::get_per_turn_feedback),
        )
        .route("/interview/reset", post(handlers::interview::reset_interview))
        // Session lifecycle
        .route(
            "/interview/session/time-remaining",
            get(handlers::session::time_remaining),
        )
        .route("/interview/session/ping", post(handlers::session::ping_session))
        .route(
            "/interview/session/cleanup",
            post(handlers::session::cleanup_session),
        )
        // Speech
        .route("/speech-to-text", post(handlers::speech::submit_transcription))
        .route(
            "/speech-to-text/status/{task_id}",
            get(handlers::speech::transcription_status),
        )
        .route("/speech/tasks", get(handlers::speech::session_tasks))
        .route("/text-to-speech", post(handlers::speech::synthesize_text))
        .route("/speech/usage-stats", get(handlers::speech::usage_stats))
        // Files
        .route("/files/upload-resume", post(handlers::files::upload_resume));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        // WebSocket outside /api/v1: not a REST endpoint.
        .route(
            "/ws/speech-to-text/stream",
            get(handlers::stream::stream_transcription),
        )
        // Audio uploads exceed axum's 2 MB default body limit.
        .layer(axum::extract::DefaultBodyLimit::max(25 * 1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - liveness probe (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
