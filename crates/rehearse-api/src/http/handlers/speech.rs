//! Speech handlers: batch transcription submit/status, synthesis, usage
//! stats.

use std::time::Instant;

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rehearse_types::speech::SpeechTask;

use crate::http::error::AppError;
use crate::http::extractors::AuthUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Session id for speech routes comes from the optional header: speech
/// tasks may be anonymous and unattached.
fn optional_session_id(
    headers: &axum::http::HeaderMap,
) -> Result<Option<rehearse_types::session::SessionId>, AppError> {
    match headers.get("x-session-id").and_then(|v| v.to_str().ok()) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| AppError::Validation(format!("Invalid session id: {raw}"))),
        None => Ok(None),
    }
}

#[derive(Debug, Serialize)]
pub struct TranscriptionSubmitted {
    pub task_id: String,
    pub status: &'static str,
    pub message: &'static str,
}

/// POST /api/v1/speech-to-text - submit audio for batch transcription.
pub async fn submit_transcription(
    State(state): State<AppState>,
    _auth: AuthUser,
    headers: axum::http::HeaderMap,
    mut multipart: Multipart,
) -> Result<ApiResponse<TranscriptionSubmitted>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let session_id = optional_session_id(&headers)?;

    let mut audio: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("audio_file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("failed to read audio: {e}")))?;
            audio = Some(bytes.to_vec());
        }
    }
    let audio = audio
        .ok_or_else(|| AppError::Validation("missing 'audio_file' field".to_string()))?;

    let task_id = state.speech.submit_batch(audio, session_id).await?;
    Ok(ApiResponse::success(
        TranscriptionSubmitted {
            task_id: task_id.to_string(),
            status: "processing",
            message: "Transcription started. Use task_id to check status.",
        },
        request_id,
        start.elapsed().as_millis() as u64,
    ))
}

/// GET /api/v1/speech-to-text/status/{task_id} - poll a batch task.
pub async fn transcription_status(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(task_id): Path<String>,
) -> Result<ApiResponse<SpeechTask>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let task_id = Uuid::parse_str(&task_id)
        .map_err(|_| AppError::Validation(format!("Invalid task id: {task_id}")))?;
    let task = state.speech.task_status(task_id).await?;
    Ok(ApiResponse::success(
        task,
        request_id,
        start.elapsed().as_millis() as u64,
    ))
}

/// GET /api/v1/speech/tasks - all tasks for the session in the header.
pub async fn session_tasks(
    State(state): State<AppState>,
    _auth: AuthUser,
    headers: axum::http::HeaderMap,
) -> Result<ApiResponse<Vec<SpeechTask>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let session_id = optional_session_id(&headers)?
        .ok_or_else(|| AppError::Validation("Session ID required".to_string()))?;
    let tasks = state.speech.session_tasks(session_id).await?;
    Ok(ApiResponse::success(
        tasks,
        request_id,
        start.elapsed().as_millis() as u64,
    ))
}

#[derive(Debug, Deserialize)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_id: Option<String>,
    #[serde(default = "default_speed")]
    pub speed: f32,
}

fn default_speed() -> f32 {
    1.0
}

/// POST /api/v1/text-to-speech - synthesize audio, returned as bytes.
pub async fn synthesize_text(
    State(state): State<AppState>,
    _auth: AuthUser,
    headers: axum::http::HeaderMap,
    Json(request): Json<SynthesisRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session_id = optional_session_id(&headers)?;
    let audio = state
        .speech
        .synthesize(
            &request.text,
            request.voice_id.as_deref(),
            request.speed,
            session_id,
        )
        .await?;
    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio))
}

#[derive(Debug, Serialize)]
pub struct UsageStats {
    /// Available slots per provider.
    pub available_slots: Vec<ProviderSlots>,
}

#[derive(Debug, Serialize)]
pub struct ProviderSlots {
    pub provider: String,
    pub available: usize,
}

/// GET /api/v1/speech/usage-stats - fabric availability per provider.
pub async fn usage_stats(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<ApiResponse<UsageStats>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let available_slots = state
        .registry
        .fabric()
        .usage()
        .into_iter()
        .map(|(provider, available)| ProviderSlots {
            provider,
            available,
        })
        .collect();
    Ok(ApiResponse::success(
        UsageStats { available_slots },
        request_id,
        start.elapsed().as_millis() as u64,
    ))
}
