//! `X-Session-ID` header extractor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use rehearse_types::session::SessionId;

use crate::http::error::AppError;
use crate::state::AppState;

/// The session a request targets, taken from the `X-Session-ID` header.
pub struct SessionIdHeader(pub SessionId);

impl FromRequestParts<AppState> for SessionIdHeader {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("x-session-id")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                AppError::Validation(
                    "Session ID required. Create a new session first.".to_string(),
                )
            })?;
        let id = raw
            .parse()
            .map_err(|_| AppError::Validation(format!("Invalid session id: {raw}")))?;
        Ok(SessionIdHeader(id))
    }
}
