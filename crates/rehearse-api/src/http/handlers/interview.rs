//! Interview session handlers: create, start, message, end, reads, reset.

use std::time::Instant;

use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rehearse_types::session::{Difficulty, InterviewStyle, SessionConfig};
use rehearse_types::summary::SummaryStatus;
use rehearse_types::turn::{ConversationTurn, FeedbackEntry};

use crate::http::error::AppError;
use crate::http::extractors::{AuthUser, SessionIdHeader};
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for creating or configuring an interview session.
#[derive(Debug, Deserialize)]
pub struct InterviewConfigRequest {
    pub job_role: Option<String>,
    pub job_description: Option<String>,
    pub resume_content: Option<String>,
    pub style: Option<InterviewStyle>,
    pub difficulty: Option<Difficulty>,
    pub target_question_count: Option<u32>,
    pub company_name: Option<String>,
    pub interview_duration_minutes: Option<u32>,
    pub use_time_based_interview: Option<bool>,
}

impl InterviewConfigRequest {
    fn into_config(self) -> SessionConfig {
        let defaults = SessionConfig::default();
        SessionConfig {
            job_role: self.job_role.unwrap_or(defaults.job_role),
            job_description: self.job_description,
            resume_content: self.resume_content,
            style: self.style.unwrap_or(defaults.style),
            difficulty: self.difficulty.unwrap_or(defaults.difficulty),
            target_question_count: self
                .target_question_count
                .unwrap_or(defaults.target_question_count),
            company_name: self.company_name,
            duration_minutes: self
                .interview_duration_minutes
                .unwrap_or(defaults.duration_minutes),
            use_time_based: self
                .use_time_based_interview
                .unwrap_or(defaults.use_time_based),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: String,
    pub message: String,
}

/// POST /api/v1/interview/session - create a new session.
pub async fn create_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<InterviewConfigRequest>,
) -> Result<ApiResponse<SessionCreated>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let config = request.into_config();
    let role = config.job_role.clone();
    let id = state.sessions.create_session(config, auth.user_id()).await?;

    Ok(ApiResponse::success(
        SessionCreated {
            session_id: id.to_string(),
            message: format!("Session created for role: {role}"),
        },
        request_id,
        start.elapsed().as_millis() as u64,
    ))
}

/// POST /api/v1/interview/start - produce the opening interviewer turn.
pub async fn start_interview(
    State(state): State<AppState>,
    _auth: AuthUser,
    SessionIdHeader(id): SessionIdHeader,
    Json(request): Json<InterviewConfigRequest>,
) -> Result<ApiResponse<ConversationTurn>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let turn = state
        .sessions
        .start_interview(id, Some(request.into_config()))
        .await?;
    Ok(ApiResponse::success(
        turn,
        request_id,
        start.elapsed().as_millis() as u64,
    ))
}

/// Request body for sending a user message.
#[derive(Debug, Deserialize)]
pub struct UserInput {
    pub message: String,
}

/// POST /api/v1/interview/message - one interview turn.
pub async fn send_message(
    State(state): State<AppState>,
    _auth: AuthUser,
    SessionIdHeader(id): SessionIdHeader,
    Json(input): Json<UserInput>,
) -> Result<ApiResponse<ConversationTurn>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let turn = state.sessions.send_message(id, &input.message).await?;
    Ok(ApiResponse::success(
        turn,
        request_id,
        start.elapsed().as_millis() as u64,
    ))
}

#[derive(Debug, Serialize)]
pub struct EndResponse {
    pub per_turn_feedback: Vec<FeedbackEntry>,
    pub final_summary_status: &'static str,
    /// Per-turn feedback is available immediately; the summary is polled.
    pub has_immediate_data: bool,
}

/// POST /api/v1/interview/end - end the interview, return interim results.
///
/// The final summary is never inlined here; clients poll
/// `final-summary-status` so loading states stay consistent.
pub async fn end_interview(
    State(state): State<AppState>,
    _auth: AuthUser,
    SessionIdHeader(id): SessionIdHeader,
) -> Result<ApiResponse<EndResponse>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let result = state.sessions.end_interview(id).await?;
    let status = match result.summary_status {
        SummaryStatus::Generating => "generating",
        SummaryStatus::Completed { .. } => "completed",
        SummaryStatus::Error { .. } => "error",
    };
    Ok(ApiResponse::success(
        EndResponse {
            per_turn_feedback: result.per_turn_feedback,
            final_summary_status: status,
            has_immediate_data: true,
        },
        request_id,
        start.elapsed().as_millis() as u64,
    ))
}

#[derive(Debug, Deserialize)]
pub struct SummaryStatusQuery {
    /// Poll attempt count, drives the suggested backoff interval.
    pub poll_count: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SummaryStatusResponse {
    #[serde(flatten)]
    pub status: SummaryStatus,
    /// Milliseconds until the next poll (0 once terminal).
    pub suggested_poll_interval: u64,
}

/// GET /api/v1/interview/final-summary-status - poll summary generation.
pub async fn final_summary_status(
    State(state): State<AppState>,
    _auth: AuthUser,
    SessionIdHeader(id): SessionIdHeader,
    Query(query): Query<SummaryStatusQuery>,
) -> Result<ApiResponse<SummaryStatusResponse>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let status = state.sessions.get_summary_status(id).await?;
    let suggested_poll_interval = match &status {
        // Exponential backoff: 1s -> 2s -> 4s -> 8s, capped at 10s.
        SummaryStatus::Generating => {
            let poll_count = query.poll_count.unwrap_or(1).max(1);
            (1000u64 << (poll_count - 1).min(3)).min(10_000)
        }
        _ => 0,
    };
    Ok(ApiResponse::success(
        SummaryStatusResponse {
            status,
            suggested_poll_interval,
        },
        request_id,
        start.elapsed().as_millis() as u64,
    ))
}

/// GET /api/v1/interview/history - full conversation history.
pub async fn get_history(
    State(state): State<AppState>,
    _auth: AuthUser,
    SessionIdHeader(id): SessionIdHeader,
) -> Result<ApiResponse<Vec<ConversationTurn>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let history = state.sessions.get_history(id).await?;
    Ok(ApiResponse::success(
        history,
        request_id,
        start.elapsed().as_millis() as u64,
    ))
}

/// GET /api/v1/interview/stats - session statistics.
pub async fn get_stats(
    State(state): State<AppState>,
    _auth: AuthUser,
    SessionIdHeader(id): SessionIdHeader,
) -> Result<ApiResponse<rehearse_types::session::SessionStats>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let stats = state.sessions.get_stats(id).await?;
    Ok(ApiResponse::success(
        stats,
        request_id,
        start.elapsed().as_millis() as u64,
    ))
}

/// GET /api/v1/interview/per-turn-feedback - coach feedback so far.
pub async fn get_per_turn_feedback(
    State(state): State<AppState>,
    _auth: AuthUser,
    SessionIdHeader(id): SessionIdHeader,
) -> Result<ApiResponse<Vec<FeedbackEntry>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let feedback = state.sessions.get_per_turn_feedback(id).await?;
    Ok(ApiResponse::success(
        feedback,
        request_id,
        start.elapsed().as_millis() as u64,
    ))
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub message: String,
    pub session_id: String,
}

/// POST /api/v1/interview/reset - clear session state, keep the config.
pub async fn reset_interview(
    State(state): State<AppState>,
    _auth: AuthUser,
    SessionIdHeader(id): SessionIdHeader,
) -> Result<ApiResponse<ResetResponse>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    state.sessions.reset_interview(id).await?;
    Ok(ApiResponse::success(
        ResetResponse {
            message: "Session reset successfully".to_string(),
            session_id: id.to_string(),
        },
        request_id,
        start.elapsed().as_millis() as u64,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_request_defaults() {
        let request: InterviewConfigRequest = serde_json::from_str("{}").unwrap();
        let config = request.into_config();
        assert_eq!(config.job_role, "General Role");
        assert_eq!(config.style, InterviewStyle::Formal);
        assert!(config.use_time_based);
        assert_eq!(config.duration_minutes, 10);
    }

    #[test]
    fn test_config_request_overrides() {
        let request: InterviewConfigRequest = serde_json::from_str(
            r#"{
                "job_role": "Software Engineer",
                "style": "technical",
                "difficulty": "hard",
                "interview_duration_minutes": 5,
                "use_time_based_interview": true
            }"#,
        )
        .unwrap();
        let config = request.into_config();
        assert_eq!(config.job_role, "Software Engineer");
        assert_eq!(config.style, InterviewStyle::Technical);
        assert_eq!(config.difficulty, Difficulty::Hard);
        assert_eq!(config.duration_minutes, 5);
    }
}
