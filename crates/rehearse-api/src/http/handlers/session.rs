//! Session lifecycle handlers: time remaining, ping, cleanup.

use std::time::Instant;

use axum::extract::State;
use serde::Serialize;
use uuid::Uuid;

use crate::http::error::AppError;
use crate::http::extractors::{AuthUser, SessionIdHeader};
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TimeRemainingResponse {
    pub time_remaining_minutes: i64,
    pub session_active: bool,
    /// Raised by the idle sweeper when ≤ 2 minutes remain.
    pub warning: bool,
}

/// GET /api/v1/interview/session/time-remaining - idle expiry countdown.
pub async fn time_remaining(
    State(state): State<AppState>,
    _auth: AuthUser,
    SessionIdHeader(id): SessionIdHeader,
) -> Result<ApiResponse<TimeRemainingResponse>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let remaining = state.sessions.time_remaining(id).await?;
    Ok(ApiResponse::success(
        TimeRemainingResponse {
            time_remaining_minutes: remaining.minutes,
            session_active: remaining.active,
            warning: remaining.warning,
        },
        request_id,
        start.elapsed().as_millis() as u64,
    ))
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub success: bool,
    pub message: String,
    pub new_expiry_minutes: u64,
}

/// POST /api/v1/interview/session/ping - extend the idle budget.
pub async fn ping_session(
    State(state): State<AppState>,
    _auth: AuthUser,
    SessionIdHeader(id): SessionIdHeader,
) -> Result<ApiResponse<PingResponse>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let new_expiry_minutes = state.sessions.ping(id).await?;
    Ok(ApiResponse::success(
        PingResponse {
            success: true,
            message: "Session extended successfully".to_string(),
            new_expiry_minutes,
        },
        request_id,
        start.elapsed().as_millis() as u64,
    ))
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/v1/interview/session/cleanup - flush and release immediately.
///
/// Idempotent; wired to client unload events.
pub async fn cleanup_session(
    State(state): State<AppState>,
    _auth: AuthUser,
    SessionIdHeader(id): SessionIdHeader,
) -> Result<ApiResponse<CleanupResponse>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    state.sessions.cleanup(id).await?;
    Ok(ApiResponse::success(
        CleanupResponse {
            success: true,
            message: "Session cleaned up successfully".to_string(),
        },
        request_id,
        start.elapsed().as_millis() as u64,
    ))
}
