//! Optional bearer-token authentication extractor.
//!
//! Session endpoints accept anonymous callers: a missing credential
//! extracts as `Anonymous`, while a present-but-invalid credential is
//! rejected with 401.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use rehearse_core::clients::AuthVerifier;
use rehearse_types::auth::AuthOutcome;

use crate::http::error::AppError;
use crate::state::AppState;

/// Verified caller identity (possibly anonymous).
pub struct AuthUser(pub AuthOutcome);

impl AuthUser {
    /// Owner id to bind to created sessions, if authenticated.
    pub fn user_id(&self) -> Option<String> {
        self.0.user_id().map(str::to_string)
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts);
        match state.auth.verify(token.as_deref()).await {
            AuthOutcome::Invalid => Err(AppError::Unauthenticated(
                "Invalid API key".to_string(),
            )),
            outcome => Ok(AuthUser(outcome)),
        }
    }
}

/// Pull a bearer token out of the `Authorization` header, if present.
pub fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}
