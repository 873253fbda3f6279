//! Background coach workers: per-turn grading and the terminal summary.
//!
//! Both workers follow snapshot-under-lock / call-outside-lock /
//! merge-under-lock: the session mutex is held only to copy inputs and to
//! install results, never across coach LLM or search calls. If the
//! session was evicted in the meantime, `acquire` rehydrates it so the
//! merge still lands.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use rehearse_types::session::SessionId;
use rehearse_types::summary::SummaryOutcome;
use rehearse_types::turn::{FeedbackEntry, GradingJob};

use crate::agents::coach::COACH_FEEDBACK_ERROR;
use crate::clients::{LlmClient, SearchClient};
use crate::registry::SessionRegistry;
use crate::store::SessionStore;

/// Grading attempts before an error entry is recorded. Transient provider
/// retries happen inside the coach; this bounds whole-call repeats
/// (timeouts included).
const GRADING_ATTEMPTS: u32 = 2;

/// Background workers for coach results.
pub struct CoachPipeline;

impl CoachPipeline {
    /// Spawn the per-turn grader for one committed user turn.
    pub fn spawn_grading<S, L, W>(
        registry: Arc<SessionRegistry<S, L, W>>,
        job: GradingJob,
    ) -> JoinHandle<()>
    where
        S: SessionStore + 'static,
        L: LlmClient + 'static,
        W: SearchClient + 'static,
    {
        tokio::spawn(async move { Self::grade_turn(registry, job).await })
    }

    /// Grade one question/answer pair and merge the result at its index.
    ///
    /// After `GRADING_ATTEMPTS` failures an error-marker entry is merged
    /// instead, so the feedback log stays dense and ordered.
    pub async fn grade_turn<S, L, W>(registry: Arc<SessionRegistry<S, L, W>>, job: GradingJob)
    where
        S: SessionStore,
        L: LlmClient,
        W: SearchClient,
    {
        let budget = Duration::from_secs(registry.config().per_turn_grading_budget_seconds);
        let fabric = registry.fabric();

        let mut feedback: Option<String> = None;
        for attempt in 1..=GRADING_ATTEMPTS {
            let entry = match registry.acquire(job.session_id).await {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(
                        session_id = %job.session_id,
                        error = %err,
                        "grading dropped, session unavailable"
                    );
                    return;
                }
            };
            let (coach, history) = {
                let orchestrator = entry.orchestrator.lock().await;
                (orchestrator.coach_handle(), orchestrator.history().to_vec())
            };

            let result = tokio::time::timeout(
                budget,
                coach.evaluate_answer(&job.question, &job.answer, &history, &fabric),
            )
            .await;

            match result {
                Ok(Ok(text)) => {
                    feedback = Some(text);
                    break;
                }
                Ok(Err(err)) => {
                    tracing::warn!(
                        session_id = %job.session_id,
                        turn_index = job.turn_index,
                        attempt,
                        error = %err,
                        "per-turn grading failed"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        session_id = %job.session_id,
                        turn_index = job.turn_index,
                        attempt,
                        budget_secs = budget.as_secs(),
                        "per-turn grading exceeded its budget"
                    );
                }
            }
        }

        let feedback = feedback.unwrap_or_else(|| COACH_FEEDBACK_ERROR.to_string());
        Self::merge_feedback(&registry, &job, feedback).await;
    }

    async fn merge_feedback<S, L, W>(
        registry: &SessionRegistry<S, L, W>,
        job: &GradingJob,
        feedback: String,
    ) where
        S: SessionStore,
        L: LlmClient,
        W: SearchClient,
    {
        let entry = match registry.acquire(job.session_id).await {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(
                    session_id = %job.session_id,
                    error = %err,
                    "feedback merge dropped, session unavailable"
                );
                return;
            }
        };

        let merged = {
            let mut orchestrator = entry.orchestrator.lock().await;
            orchestrator.merge_feedback(FeedbackEntry::new(
                job.turn_index,
                &job.question,
                &job.answer,
                feedback,
            ))
        };
        if let Err(err) = merged {
            tracing::error!(
                session_id = %job.session_id,
                turn_index = job.turn_index,
                error = %err,
                "feedback merge rejected"
            );
            return;
        }

        // The merge was initiated by a user action, so it advances the
        // activity clock.
        registry.clock().touch(job.session_id, Utc::now());
        if let Err(err) = registry.persist(job.session_id).await {
            tracing::warn!(session_id = %job.session_id, error = %err, "post-merge snapshot failed");
        }
    }

    /// Spawn the terminal summarizer. Callers must have set the
    /// summary-in-flight flag (via `end()`) before spawning.
    pub fn spawn_summary<S, L, W>(
        registry: Arc<SessionRegistry<S, L, W>>,
        session_id: SessionId,
    ) -> JoinHandle<()>
    where
        S: SessionStore + 'static,
        L: LlmClient + 'static,
        W: SearchClient + 'static,
    {
        tokio::spawn(async move { Self::run_summary(registry, session_id).await })
    }

    /// Generate and install the final summary for a completed session.
    pub async fn run_summary<S, L, W>(
        registry: Arc<SessionRegistry<S, L, W>>,
        session_id: SessionId,
    ) where
        S: SessionStore,
        L: LlmClient,
        W: SearchClient,
    {
        let budget = Duration::from_secs(registry.config().final_summary_budget_seconds);
        let fabric = registry.fabric();

        let entry = match registry.acquire(session_id).await {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(session_id = %session_id, error = %err, "summary dropped");
                return;
            }
        };
        let (coach, history, in_flight) = {
            let orchestrator = entry.orchestrator.lock().await;
            (
                orchestrator.coach_handle(),
                orchestrator.history().to_vec(),
                orchestrator.is_summary_in_flight(),
            )
        };
        if !in_flight {
            tracing::debug!(session_id = %session_id, "summary not in flight, nothing to do");
            return;
        }

        let outcome = match tokio::time::timeout(budget, coach.finalize(&history, &fabric)).await
        {
            Ok(Ok(summary)) => {
                tracing::info!(
                    session_id = %session_id,
                    resources = summary.recommended_resources.len(),
                    "final summary generated"
                );
                SummaryOutcome::Completed(summary)
            }
            Ok(Err(err)) => {
                tracing::error!(session_id = %session_id, error = %err, "final summary failed");
                SummaryOutcome::Error {
                    message: format!("final summary generation failed: {err}"),
                }
            }
            Err(_) => {
                tracing::error!(
                    session_id = %session_id,
                    budget_secs = budget.as_secs(),
                    "final summary exceeded its budget"
                );
                SummaryOutcome::Error {
                    message: "final summary generation exceeded its budget".to_string(),
                }
            }
        };

        let entry = match registry.acquire(session_id).await {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(session_id = %session_id, error = %err, "summary install dropped");
                return;
            }
        };
        entry.orchestrator.lock().await.install_summary(outcome);
        registry.clock().touch(session_id, Utc::now());
        if let Err(err) = registry.persist(session_id).await {
            tracing::warn!(session_id = %session_id, error = %err, "post-summary snapshot failed");
        }
    }
}
