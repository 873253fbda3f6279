//! Process-wide concurrency caps for external providers.
//!
//! Named counting semaphores keyed by provider identity. Waiters queue in
//! FIFO order (tokio semaphores are fair); acquires carry a timeout, and a
//! timed-out acquire surfaces as capacity exhaustion rather than blocking
//! the caller indefinitely. Permits are owned and release on drop, so a
//! slot is returned exactly once on every exit path.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use rehearse_types::config::ProviderCaps;

/// Provider identities with enforced caps.
pub mod provider {
    pub const BATCH_TRANSCRIPTION: &str = "batch-transcription";
    pub const SYNTHESIS: &str = "synthesis";
    pub const STREAMING_TRANSCRIPTION: &str = "streaming-transcription";
    pub const LLM: &str = "llm";
    pub const SEARCH: &str = "search";
}

/// Errors from fabric acquires.
#[derive(Debug, Error)]
pub enum LimitError {
    /// All slots busy for the duration of the acquire timeout.
    #[error("capacity exhausted for provider '{0}'")]
    CapacityExhausted(String),

    /// Acquire against a provider the fabric was not configured with.
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),
}

/// Named semaphores capping concurrent in-flight calls per provider.
pub struct RateLimitFabric {
    semaphores: DashMap<String, Arc<Semaphore>>,
    acquire_timeout: Duration,
}

impl RateLimitFabric {
    /// Build the fabric from configured caps.
    pub fn new(caps: &ProviderCaps, acquire_timeout: Duration) -> Self {
        let semaphores = DashMap::new();
        semaphores.insert(
            provider::BATCH_TRANSCRIPTION.to_string(),
            Arc::new(Semaphore::new(caps.batch_transcription)),
        );
        semaphores.insert(
            provider::SYNTHESIS.to_string(),
            Arc::new(Semaphore::new(caps.synthesis)),
        );
        semaphores.insert(
            provider::STREAMING_TRANSCRIPTION.to_string(),
            Arc::new(Semaphore::new(caps.streaming_transcription)),
        );
        semaphores.insert(provider::LLM.to_string(), Arc::new(Semaphore::new(caps.llm)));
        semaphores.insert(
            provider::SEARCH.to_string(),
            Arc::new(Semaphore::new(caps.search)),
        );
        Self {
            semaphores,
            acquire_timeout,
        }
    }

    /// Acquire one slot for `name`, waiting up to the configured timeout.
    ///
    /// The returned permit releases its slot when dropped.
    pub async fn acquire(&self, name: &str) -> Result<OwnedSemaphorePermit, LimitError> {
        let semaphore = self
            .semaphores
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LimitError::UnknownProvider(name.to_string()))?;

        match tokio::time::timeout(self.acquire_timeout, semaphore.acquire_owned()).await {
            Ok(Ok(permit)) => Ok(permit),
            // acquire_owned only errs when the semaphore is closed, which
            // the fabric never does; treat it as exhaustion anyway.
            Ok(Err(_)) | Err(_) => {
                tracing::warn!(provider = name, "provider capacity exhausted");
                Err(LimitError::CapacityExhausted(name.to_string()))
            }
        }
    }

    /// Currently available slots for `name` (0 for unknown providers).
    pub fn available(&self, name: &str) -> usize {
        self.semaphores
            .get(name)
            .map(|entry| entry.value().available_permits())
            .unwrap_or(0)
    }

    /// Availability for every configured provider, for the usage-stats
    /// endpoint.
    pub fn usage(&self) -> Vec<(String, usize)> {
        let mut usage: Vec<(String, usize)> = self
            .semaphores
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().available_permits()))
            .collect();
        usage.sort();
        usage
    }
}
