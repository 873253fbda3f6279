//! Interviewer agent: produces the next assistant turn for a session.
//!
//! The agent is phase-driven: an empty history yields the introduction, a
//! met terminal condition yields the closing, and anything else yields the
//! next question (or a follow-up, when the model leads its reply with the
//! follow-up marker). LLM calls go through the fabric's `llm` cap and the
//! shared retry policy; a retried call is one logical operation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use rehearse_types::error::SessionError;
use rehearse_types::session::{SessionConfig, SessionStats};
use rehearse_types::turn::{ConversationTurn, ResponseType};

use crate::agents::prompts::{self, FOLLOW_UP_MARKER};
use crate::agents::retry::{RetryPolicy, call_with_retry};
use crate::clients::{GenerationRequest, LlmClient, LlmOperation};
use crate::limits::{LimitError, RateLimitFabric, provider};

/// Fixed closing line used when the terminal condition is reached.
pub const INTERVIEW_CONCLUSION: &str =
    "Thank you for your time. This concludes the interview.";

/// One produced interviewer turn.
#[derive(Debug, Clone, PartialEq)]
pub struct InterviewerReply {
    pub content: String,
    pub response_type: ResponseType,
}

/// Per-session interviewer adapter over an [`LlmClient`].
#[derive(Debug)]
pub struct InterviewerAgent<L> {
    llm: Arc<L>,
    config: SessionConfig,
    retry: RetryPolicy,
}

impl<L: LlmClient> InterviewerAgent<L> {
    pub fn new(llm: Arc<L>, config: SessionConfig) -> Self {
        Self {
            llm,
            config,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy (tests, alternate provider agreements).
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Shared handle to the underlying LLM client.
    pub(crate) fn llm_handle(&self) -> Arc<L> {
        Arc::clone(&self.llm)
    }

    /// Produce the next interviewer turn for the given history.
    pub async fn produce_next_turn(
        &self,
        history: &[ConversationTurn],
        stats: &SessionStats,
        fabric: &RateLimitFabric,
        now: DateTime<Utc>,
    ) -> Result<InterviewerReply, SessionError> {
        if history.is_empty() {
            let prompt = prompts::interviewer_introduction(&self.config);
            let content = self.generate(&prompt, fabric).await?;
            return Ok(InterviewerReply {
                content,
                response_type: ResponseType::Introduction,
            });
        }

        if self.terminal_condition_met(history, stats, now) {
            return Ok(InterviewerReply {
                content: INTERVIEW_CONCLUSION.to_string(),
                response_type: ResponseType::Closing,
            });
        }

        let time_context = self.time_context(history, stats, now);
        let prompt = prompts::interviewer_next_question(&self.config, history, &time_context);
        let content = self.generate(&prompt, fabric).await?;

        if let Some(rest) = content.strip_prefix(FOLLOW_UP_MARKER) {
            Ok(InterviewerReply {
                content: rest.trim().to_string(),
                response_type: ResponseType::FollowUp,
            })
        } else {
            Ok(InterviewerReply {
                content,
                response_type: ResponseType::Question,
            })
        }
    }

    /// Count of questions (new or follow-up) asked so far.
    fn questions_asked(history: &[ConversationTurn]) -> u32 {
        history
            .iter()
            .filter(|turn| {
                turn.is_interviewer()
                    && matches!(
                        turn.response_type,
                        ResponseType::Question | ResponseType::FollowUp
                    )
            })
            .count() as u32
    }

    fn terminal_condition_met(
        &self,
        history: &[ConversationTurn],
        stats: &SessionStats,
        now: DateTime<Utc>,
    ) -> bool {
        if self.config.use_time_based {
            let elapsed = now - stats.started_at;
            elapsed >= chrono::Duration::minutes(i64::from(self.config.duration_minutes))
        } else {
            Self::questions_asked(history) >= self.config.target_question_count
        }
    }

    fn time_context(
        &self,
        history: &[ConversationTurn],
        stats: &SessionStats,
        now: DateTime<Utc>,
    ) -> String {
        if self.config.use_time_based {
            let elapsed = (now - stats.started_at).num_minutes().max(0);
            let remaining =
                i64::from(self.config.duration_minutes).saturating_sub(elapsed);
            format!(
                "Interview timing: {elapsed} minutes elapsed, about {remaining} \
                 minutes remain. Pace accordingly; move toward wrap-up topics \
                 when little time is left."
            )
        } else {
            let asked = Self::questions_asked(history);
            format!(
                "Question budget: {asked} of {total} questions asked.",
                total = self.config.target_question_count
            )
        }
    }

    async fn generate(
        &self,
        prompt: &str,
        fabric: &RateLimitFabric,
    ) -> Result<String, SessionError> {
        // Permit held across retries: one logical operation.
        let _permit = fabric.acquire(provider::LLM).await.map_err(|e| match e {
            LimitError::CapacityExhausted(name) => SessionError::CapacityExhausted(name),
            LimitError::UnknownProvider(name) => {
                SessionError::AgentUnavailable(format!("unknown provider '{name}'"))
            }
        })?;

        let request = GenerationRequest::new(LlmOperation::NextTurn, prompt)
            .with_system(prompts::interviewer_system(&self.config));
        let cancel = CancellationToken::new();
        call_with_retry(&self.retry, &cancel, || {
            let request = request.clone();
            let llm = Arc::clone(&self.llm);
            async move { llm.generate(&request).await }
        })
        .await
        .map(|text| text.trim().to_string())
        .map_err(|e| SessionError::AgentUnavailable(e.to_string()))
    }
}
