//! Resume upload handler.

use std::time::Instant;

use axum::extract::{Multipart, State};
use serde::Serialize;
use uuid::Uuid;

use rehearse_core::clients::ResumeExtractor;
use rehearse_types::error::ExtractError;

use crate::http::error::AppError;
use crate::http::extractors::AuthUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ResumeUploaded {
    pub filename: String,
    pub extracted_text: String,
}

/// POST /api/v1/files/upload-resume - extract text from an uploaded
/// resume for use in session configuration.
pub async fn upload_resume(
    State(state): State<AppState>,
    _auth: AuthUser,
    mut multipart: Multipart,
) -> Result<ApiResponse<ResumeUploaded>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let mut upload: Option<(String, String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("resume.txt").to_string();
            let mime = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("failed to read file: {e}")))?;
            upload = Some((filename, mime, bytes.to_vec()));
        }
    }
    let (filename, mime, bytes) =
        upload.ok_or_else(|| AppError::Validation("missing 'file' field".to_string()))?;

    let extracted_text = state
        .resume_extractor
        .extract(&bytes, &mime)
        .await
        .map_err(|e| match e {
            ExtractError::UnsupportedMime(_)
            | ExtractError::TooLarge { .. }
            | ExtractError::InvalidEncoding => AppError::Validation(e.to_string()),
        })?;

    Ok(ApiResponse::success(
        ResumeUploaded {
            filename,
            extracted_text,
        },
        request_id,
        start.elapsed().as_millis() as u64,
    ))
}
