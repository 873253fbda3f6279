//! Session service facade: one method per command on the HTTP surface.
//!
//! The facade owns the cross-cutting choreography around each state
//! transition: the per-session mutation gate (at most one in-flight
//! mutation), activity-clock touches, background-task spawning (grading,
//! summary), and the post-transition snapshot write. HTTP handlers stay
//! thin mappers over these methods.

use std::sync::Arc;

use chrono::Utc;

use rehearse_types::error::SessionError;
use rehearse_types::session::{SessionConfig, SessionId, SessionStats, SessionStatus};
use rehearse_types::summary::SummaryStatus;
use rehearse_types::turn::{ConversationTurn, FeedbackEntry};

use crate::clients::{LlmClient, SearchClient};
use crate::pipeline::CoachPipeline;
use crate::registry::{SessionEntry, SessionRegistry};
use crate::store::SessionStore;

/// Response of `end_interview`: interim per-turn feedback plus the
/// summary generation status (always `Generating` right after the first
/// end).
#[derive(Debug, Clone)]
pub struct EndResult {
    pub per_turn_feedback: Vec<FeedbackEntry>,
    pub summary_status: SummaryStatus,
}

/// Response of `time_remaining`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRemaining {
    pub minutes: i64,
    pub active: bool,
    /// Set by the idle sweeper once ≤ the warning threshold remains.
    pub warning: bool,
}

/// Facade over the registry and coach pipeline.
pub struct SessionService<S, L, W> {
    registry: Arc<SessionRegistry<S, L, W>>,
}

impl<S, L, W> Clone for SessionService<S, L, W> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<S, L, W> SessionService<S, L, W>
where
    S: SessionStore + 'static,
    L: LlmClient + 'static,
    W: SearchClient + 'static,
{
    pub fn new(registry: Arc<SessionRegistry<S, L, W>>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry<S, L, W>> {
        &self.registry
    }

    /// Create a new session owned by `owner_user_id` (or anonymous).
    pub async fn create_session(
        &self,
        config: SessionConfig,
        owner_user_id: Option<String>,
    ) -> Result<SessionId, SessionError> {
        self.registry.create(config, owner_user_id).await
    }

    /// Apply an optional config update and produce the opening turn.
    pub async fn start_interview(
        &self,
        id: SessionId,
        config: Option<SessionConfig>,
    ) -> Result<ConversationTurn, SessionError> {
        let entry = self.registry.acquire(id).await?;
        let _gate = Self::gate(&entry)?;
        let fabric = self.registry.fabric();
        let turn = {
            let mut orchestrator = entry.orchestrator.lock().await;
            if let Some(config) = config {
                orchestrator.set_config(config)?;
            }
            orchestrator.start(&fabric).await?
        };
        self.registry.clock().touch(id, Utc::now());
        self.spawn_persist(id);
        Ok(turn)
    }

    /// Process one user message. Commits two turns, advances the activity
    /// clock, and enqueues per-turn grading.
    pub async fn send_message(
        &self,
        id: SessionId,
        text: &str,
    ) -> Result<ConversationTurn, SessionError> {
        let entry = self.registry.acquire(id).await?;
        let _gate = Self::gate(&entry)?;
        let fabric = self.registry.fabric();
        let (turn, job) = {
            let mut orchestrator = entry.orchestrator.lock().await;
            orchestrator.send_user_message(text, &fabric).await?
        };
        self.registry.clock().touch(id, Utc::now());
        CoachPipeline::spawn_grading(Arc::clone(&self.registry), job);
        self.spawn_persist(id);
        Ok(turn)
    }

    /// End the interview. Returns interim feedback immediately; the final
    /// summary is generated in the background and observed via
    /// `summary_status`. Idempotent.
    pub async fn end_interview(&self, id: SessionId) -> Result<EndResult, SessionError> {
        let entry = self.registry.acquire(id).await?;
        let _gate = Self::gate(&entry)?;
        let (outcome, status) = {
            let mut orchestrator = entry.orchestrator.lock().await;
            let outcome = orchestrator.end()?;
            (outcome, orchestrator.summary_status())
        };
        if outcome.launch_summary {
            CoachPipeline::spawn_summary(Arc::clone(&self.registry), id);
        }
        self.registry.clock().touch(id, Utc::now());
        self.spawn_persist(id);
        Ok(EndResult {
            per_turn_feedback: outcome.feedback,
            summary_status: status,
        })
    }

    /// Clear conversational state, keeping id and config.
    pub async fn reset_interview(&self, id: SessionId) -> Result<(), SessionError> {
        let entry = self.registry.acquire(id).await?;
        let _gate = Self::gate(&entry)?;
        entry.orchestrator.lock().await.reset();
        self.registry.clock().touch(id, Utc::now());
        self.spawn_persist(id);
        Ok(())
    }

    pub async fn get_history(&self, id: SessionId) -> Result<Vec<ConversationTurn>, SessionError> {
        let entry = self.registry.acquire(id).await?;
        let orchestrator = entry.orchestrator.lock().await;
        Ok(orchestrator.history().to_vec())
    }

    pub async fn get_stats(&self, id: SessionId) -> Result<SessionStats, SessionError> {
        let entry = self.registry.acquire(id).await?;
        let orchestrator = entry.orchestrator.lock().await;
        Ok(orchestrator.stats().clone())
    }

    pub async fn get_per_turn_feedback(
        &self,
        id: SessionId,
    ) -> Result<Vec<FeedbackEntry>, SessionError> {
        let entry = self.registry.acquire(id).await?;
        let orchestrator = entry.orchestrator.lock().await;
        Ok(orchestrator.feedback().to_vec())
    }

    pub async fn get_summary_status(&self, id: SessionId) -> Result<SummaryStatus, SessionError> {
        let entry = self.registry.acquire(id).await?;
        let orchestrator = entry.orchestrator.lock().await;
        Ok(orchestrator.summary_status())
    }

    /// Remaining idle time. Sessions no longer tracked by the clock but
    /// still present in the store read as inactive.
    pub async fn time_remaining(&self, id: SessionId) -> Result<TimeRemaining, SessionError> {
        let now = Utc::now();
        let clock = self.registry.clock();
        if let Some(remaining) = clock.time_remaining(id, now) {
            return Ok(TimeRemaining {
                minutes: remaining.num_minutes().max(0),
                active: remaining > chrono::Duration::zero(),
                warning: clock.is_warned(id),
            });
        }
        match self.registry.store().get_session(id).await {
            Ok(Some(_)) => Ok(TimeRemaining {
                minutes: 0,
                active: false,
                warning: false,
            }),
            Ok(None) => Err(SessionError::NotFound),
            Err(e) => Err(SessionError::PersistenceDegraded(e.to_string())),
        }
    }

    /// Extend the session's idle budget. Returns the new expiry in
    /// minutes. Pinging a completed session is a no-op reporting the
    /// effective remaining time; pinging an abandoned session times out.
    pub async fn ping(&self, id: SessionId) -> Result<u64, SessionError> {
        let entry = self.registry.acquire(id).await?;
        let status = entry.orchestrator.lock().await.status();
        let clock = self.registry.clock();
        match status {
            SessionStatus::Abandoned => Err(SessionError::Timeout),
            SessionStatus::Completed => {
                let minutes = clock
                    .time_remaining(id, Utc::now())
                    .map(|d| d.num_minutes().max(0))
                    .unwrap_or(0);
                Ok(minutes as u64)
            }
            SessionStatus::Active => {
                clock.ping(id, Utc::now()).ok_or(SessionError::Timeout)?;
                Ok(clock.idle_budget_minutes())
            }
        }
    }

    /// Flush and evict, marking the session abandoned if still active.
    /// Idempotent; used on client unload.
    pub async fn cleanup(&self, id: SessionId) -> Result<(), SessionError> {
        self.registry.cleanup(id).await
    }

    fn gate(entry: &SessionEntry<L, W>) -> Result<crate::registry::MutationGuard<'_>, SessionError> {
        entry.try_begin_mutation().ok_or_else(|| {
            SessionError::StateInvalid(
                "another request is mutating this session".to_string(),
            )
        })
    }

    fn spawn_persist(&self, id: SessionId) {
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            if let Err(err) = registry.persist(id).await {
                tracing::warn!(session_id = %id, error = %err, "background snapshot failed");
            }
        });
    }
}
