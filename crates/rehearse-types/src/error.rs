//! Typed errors shared across the workspace.

use thiserror::Error;

/// Errors surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found")]
    NotFound,

    #[error("invalid session state: {0}")]
    StateInvalid(String),

    #[error("session timed out")]
    Timeout,

    #[error("capacity exhausted for provider '{0}'")]
    CapacityExhausted(String),

    #[error("agent unavailable: {0}")]
    AgentUnavailable(String),

    #[error("persistence degraded: {0}")]
    PersistenceDegraded(String),

    #[error("validation error: {0}")]
    Validation(String),
}

impl From<StoreError> for SessionError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => SessionError::NotFound,
            other => SessionError::PersistenceDegraded(other.to_string()),
        }
    }
}

/// Errors from the session store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("record not found")]
    NotFound,

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors from LLM-backed agent calls.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Network or provider 5xx failure; safe to retry.
    #[error("transient agent error: {0}")]
    Transient(String),

    /// Provider-side 429; retryable after a delay.
    #[error("agent rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Malformed request, auth failure, or other non-retryable error.
    #[error("agent error: {0}")]
    Fatal(String),

    #[error("agent call exceeded its budget")]
    Timeout,
}

impl AgentError {
    /// Whether a retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AgentError::Transient(_) | AgentError::RateLimited { .. }
        )
    }
}

/// Errors from the external search provider.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(String),

    #[error("search response malformed: {0}")]
    Decode(String),
}

/// Errors from speech providers (batch, streaming, synthesis).
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech provider error: {0}")]
    Provider(String),

    #[error("stream capacity exhausted")]
    CapacityExhausted,

    #[error("provider connection failed: {0}")]
    Connection(String),

    #[error("stream closed")]
    Closed,
}

/// Errors from resume extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    UnsupportedMime(String),

    #[error("file too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },

    #[error("file is not valid text")]
    InvalidEncoding,
}
