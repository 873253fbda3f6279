//! The per-session state machine.
//!
//! Every externally visible transition flows through a method on
//! `SessionOrchestrator` while the per-session mutex (owned by the
//! registry) is held. History is append-only; `send_user_message` either
//! commits exactly two turns or rolls back to the pre-call state.
//!
//! The interviewer LLM call runs while the caller holds the session mutex:
//! other sessions are unaffected and the registry mutex is never held
//! here, which keeps the single-committer invariant trivial. Coach
//! results arrive later through `merge_feedback` / `install_summary`
//! under the same mutex.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use rehearse_types::error::SessionError;
use rehearse_types::session::{SessionConfig, SessionId, SessionStats, SessionStatus};
use rehearse_types::summary::{SummaryOutcome, SummaryStatus};
use rehearse_types::turn::{ConversationTurn, FeedbackEntry, GradingJob, TurnRole};

use crate::agents::{CoachAgent, InterviewerAgent};
use crate::clients::{LlmClient, SearchClient};
use crate::limits::RateLimitFabric;
use crate::session::phase::{SessionPhase, TurnPhase};
use crate::store::{ConversationRecord, SessionMetaRecord, SessionSnapshot};

/// Result of `end()`: the interim per-turn feedback plus whether the
/// caller must launch the terminal summary task.
#[derive(Debug, Clone)]
pub struct EndOutcome {
    pub feedback: Vec<FeedbackEntry>,
    pub launch_summary: bool,
}

/// Per-session state machine. See module docs for locking discipline.
#[derive(Debug)]
pub struct SessionOrchestrator<L, W> {
    id: SessionId,
    owner_user_id: Option<String>,
    config: SessionConfig,
    phase: SessionPhase,
    turn_phase: TurnPhase,
    history: Vec<ConversationTurn>,
    /// Sorted by `turn_index`; at most one entry per user turn.
    feedback: Vec<FeedbackEntry>,
    stats: SessionStats,
    summary_in_flight: bool,
    summary: Option<SummaryOutcome>,
    interviewer: InterviewerAgent<L>,
    coach: Arc<CoachAgent<L, W>>,
}

impl<L: LlmClient, W: SearchClient> SessionOrchestrator<L, W> {
    /// Construct a fresh orchestrator in `Configured`.
    pub fn new(
        id: SessionId,
        owner_user_id: Option<String>,
        config: SessionConfig,
        llm: Arc<L>,
        search: Arc<W>,
    ) -> Self {
        let now = Utc::now();
        let interviewer = InterviewerAgent::new(Arc::clone(&llm), config.clone());
        let coach = Arc::new(CoachAgent::new(
            llm,
            search,
            config.resume_content.clone(),
            config.job_description.clone(),
        ));
        Self {
            id,
            owner_user_id,
            config,
            phase: SessionPhase::Configured,
            turn_phase: TurnPhase::AwaitingUser,
            history: Vec::new(),
            feedback: Vec::new(),
            stats: SessionStats::new(now),
            summary_in_flight: false,
            summary: None,
            interviewer,
            coach,
        }
    }

    /// Rebuild an orchestrator from a persisted snapshot.
    pub fn hydrate(snapshot: SessionSnapshot, llm: Arc<L>, search: Arc<W>) -> Self {
        let phase = match snapshot.meta.status {
            SessionStatus::Active if snapshot.conversation.history.is_empty() => {
                SessionPhase::Configured
            }
            SessionStatus::Active => SessionPhase::Running,
            SessionStatus::Completed => SessionPhase::Completed,
            SessionStatus::Abandoned => SessionPhase::Abandoned,
        };
        let config = snapshot.meta.config;
        let interviewer = InterviewerAgent::new(Arc::clone(&llm), config.clone());
        let coach = Arc::new(CoachAgent::new(
            llm,
            search,
            config.resume_content.clone(),
            config.job_description.clone(),
        ));
        Self {
            id: snapshot.meta.id,
            owner_user_id: snapshot.meta.owner_user_id,
            config,
            phase,
            turn_phase: TurnPhase::AwaitingUser,
            history: snapshot.conversation.history,
            feedback: snapshot.conversation.feedback,
            stats: snapshot.meta.stats,
            // Never persisted mid-flight; a crash loses the task and a
            // repeated end() relaunches it.
            summary_in_flight: false,
            summary: snapshot.summary,
            interviewer,
            coach,
        }
    }

    /// Point-in-time snapshot for persistence.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            meta: SessionMetaRecord {
                id: self.id,
                owner_user_id: self.owner_user_id.clone(),
                status: self.phase.status(),
                config: self.config.clone(),
                stats: self.stats.clone(),
            },
            conversation: ConversationRecord {
                history: self.history.clone(),
                feedback: self.feedback.clone(),
            },
            summary: self.summary.clone(),
        }
    }

    /// Replace the configuration. Valid only before the interview starts.
    pub fn set_config(&mut self, config: SessionConfig) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Configured {
            return Err(SessionError::StateInvalid(
                "configuration is immutable after the interview starts".to_string(),
            ));
        }
        config.validate().map_err(SessionError::Validation)?;
        self.interviewer = InterviewerAgent::new_from(&self.interviewer, config.clone());
        self.coach = Arc::new(CoachAgent::rebuilt_from(&self.coach, &config));
        self.config = config;
        Ok(())
    }

    /// Produce the opening assistant turn and enter `Running`.
    ///
    /// On success exactly one assistant turn is appended.
    pub async fn start(
        &mut self,
        fabric: &RateLimitFabric,
    ) -> Result<ConversationTurn, SessionError> {
        match self.phase {
            SessionPhase::Configured => {}
            SessionPhase::Abandoned => return Err(SessionError::Timeout),
            other => {
                return Err(SessionError::StateInvalid(format!(
                    "cannot start an interview in the {other} state"
                )));
            }
        }

        let now = Utc::now();
        self.stats = SessionStats::new(now);
        let reply = self
            .interviewer
            .produce_next_turn(&self.history, &self.stats, fabric, now)
            .await?;

        let turn = ConversationTurn::interviewer(reply.content, reply.response_type, Utc::now());
        self.append(turn.clone());
        self.phase = SessionPhase::Running;
        self.turn_phase = TurnPhase::AwaitingUser;
        self.stats.last_activity_at = Utc::now();
        tracing::info!(session_id = %self.id, "interview started");
        Ok(turn)
    }

    /// Consume a user message, produce the next interviewer turn, and hand
    /// back the grading job for the just-committed user turn.
    ///
    /// History grows by exactly 2 entries on success and 0 on failure.
    pub async fn send_user_message(
        &mut self,
        text: &str,
        fabric: &RateLimitFabric,
    ) -> Result<(ConversationTurn, GradingJob), SessionError> {
        match self.phase {
            SessionPhase::Running => {}
            SessionPhase::Abandoned => return Err(SessionError::Timeout),
            SessionPhase::Configured => {
                return Err(SessionError::StateInvalid(
                    "interview has not started".to_string(),
                ));
            }
            SessionPhase::Completed => {
                return Err(SessionError::StateInvalid(
                    "interview has already ended".to_string(),
                ));
            }
        }
        if text.trim().is_empty() {
            return Err(SessionError::Validation(
                "message must not be empty".to_string(),
            ));
        }

        let question = self
            .last_interviewer_question()
            .unwrap_or_default()
            .to_string();

        // Provisional append; rolled back if the interviewer call fails.
        let now = Utc::now();
        self.turn_phase = TurnPhase::ProcessingUser;
        let user_index = self.history.len() as u32;
        self.history.push(ConversationTurn::user(text, now));
        self.turn_phase = TurnPhase::AwaitingAssistant;

        let started = Instant::now();
        let reply = match self
            .interviewer
            .produce_next_turn(&self.history, &self.stats, fabric, now)
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                self.history.pop();
                self.turn_phase = TurnPhase::AwaitingUser;
                tracing::warn!(session_id = %self.id, error = %err, "turn rolled back");
                return Err(err);
            }
        };

        // Commit: both turns become observable in one step (the mutex is
        // held throughout). The turn cycle completes back to AwaitingUser.
        self.note_role(TurnRole::User);
        let turn =
            ConversationTurn::interviewer(reply.content, reply.response_type, Utc::now());
        self.append(turn.clone());
        self.stats.record_api_call(started.elapsed().as_secs_f64());
        self.stats.last_activity_at = Utc::now();
        self.turn_phase = TurnPhase::AwaitingUser;

        let job = GradingJob {
            session_id: self.id,
            turn_index: user_index,
            question,
            answer: text.to_string(),
        };
        Ok((turn, job))
    }

    /// Transition to `Completed` and return interim results.
    ///
    /// Idempotent: a repeated `end()` returns the current feedback and
    /// never launches a second summary task while one is in flight or a
    /// result is already installed.
    pub fn end(&mut self) -> Result<EndOutcome, SessionError> {
        match self.phase {
            SessionPhase::Running | SessionPhase::Completed => {}
            SessionPhase::Abandoned => return Err(SessionError::Timeout),
            SessionPhase::Configured => {
                return Err(SessionError::StateInvalid(
                    "interview has not started".to_string(),
                ));
            }
        }

        self.phase = SessionPhase::Completed;
        let launch_summary = !self.summary_in_flight && self.summary.is_none();
        if launch_summary {
            self.summary_in_flight = true;
        }
        tracing::info!(session_id = %self.id, launch_summary, "interview ended");
        Ok(EndOutcome {
            feedback: self.feedback.clone(),
            launch_summary,
        })
    }

    /// Clear all conversational state, keeping the id and configuration.
    pub fn reset(&mut self) {
        self.history.clear();
        self.feedback.clear();
        self.summary = None;
        self.summary_in_flight = false;
        self.stats = SessionStats::new(Utc::now());
        self.phase = SessionPhase::Configured;
        self.turn_phase = TurnPhase::AwaitingUser;
        tracing::info!(session_id = %self.id, "session reset");
    }

    /// Mark the session abandoned (idle timeout).
    pub fn mark_abandoned(&mut self) {
        if self.phase != SessionPhase::Completed {
            self.phase = SessionPhase::Abandoned;
        }
    }

    /// Merge a coach feedback entry at its turn index.
    ///
    /// Idempotent: re-merging the same index replaces the entry. An index
    /// that does not reference an existing user turn is an invariant
    /// violation and fails loudly.
    pub fn merge_feedback(&mut self, entry: FeedbackEntry) -> Result<(), SessionError> {
        let idx = entry.turn_index as usize;
        let valid = self
            .history
            .get(idx)
            .map(ConversationTurn::is_user)
            .unwrap_or(false);
        if !valid {
            tracing::error!(
                session_id = %self.id,
                turn_index = entry.turn_index,
                history_len = self.history.len(),
                "feedback merge references a non-user turn"
            );
            return Err(SessionError::Validation(format!(
                "feedback index {} does not reference a user turn",
                entry.turn_index
            )));
        }

        match self
            .feedback
            .binary_search_by_key(&entry.turn_index, |e| e.turn_index)
        {
            Ok(pos) => self.feedback[pos] = entry,
            Err(pos) => self.feedback.insert(pos, entry),
        }
        self.stats.last_activity_at = Utc::now();
        Ok(())
    }

    /// Install the terminal summary outcome and clear the in-flight flag.
    pub fn install_summary(&mut self, outcome: SummaryOutcome) {
        self.summary = Some(outcome);
        self.summary_in_flight = false;
        self.stats.last_activity_at = Utc::now();
    }

    /// Observable summary state. Absent results read as `Generating`,
    /// matching the polling contract.
    pub fn summary_status(&self) -> SummaryStatus {
        match &self.summary {
            Some(outcome) => outcome.to_status(),
            None => SummaryStatus::Generating,
        }
    }

    // ---------------------------------------------------------------
    // Read-only views
    // ---------------------------------------------------------------

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn owner_user_id(&self) -> Option<&str> {
        self.owner_user_id.as_deref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn status(&self) -> SessionStatus {
        self.phase.status()
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn feedback(&self) -> &[FeedbackEntry] {
        &self.feedback
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn is_summary_in_flight(&self) -> bool {
        self.summary_in_flight
    }

    /// Shared handle to this session's coach, for background tasks that
    /// call the coach outside the session mutex.
    pub fn coach_handle(&self) -> Arc<CoachAgent<L, W>> {
        Arc::clone(&self.coach)
    }

    // ---------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------

    fn append(&mut self, turn: ConversationTurn) {
        self.note_role(turn.role);
        self.history.push(turn);
    }

    fn note_role(&mut self, role: TurnRole) {
        self.stats.total_messages += 1;
        match role {
            TurnRole::User => self.stats.user_messages += 1,
            TurnRole::Assistant => self.stats.assistant_messages += 1,
            TurnRole::System => self.stats.system_messages += 1,
        }
    }

    fn last_interviewer_question(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|turn| turn.is_interviewer())
            .map(|turn| turn.content.as_text())
    }
}

impl<L: LlmClient> InterviewerAgent<L> {
    /// Rebuild with a new config, reusing the existing client handle.
    fn new_from(previous: &InterviewerAgent<L>, config: SessionConfig) -> Self {
        InterviewerAgent::new(previous.llm_handle(), config)
    }
}

impl<L: LlmClient, W: SearchClient> CoachAgent<L, W> {
    /// Rebuild with a new config's resume/job-description context.
    fn rebuilt_from(previous: &CoachAgent<L, W>, config: &SessionConfig) -> Self {
        CoachAgent::new(
            previous.llm_handle(),
            previous.search_handle(),
            config.resume_content.clone(),
            config.job_description.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use rehearse_types::config::ProviderCaps;
    use rehearse_types::error::AgentError;
    use rehearse_types::summary::FinalSummary;
    use rehearse_types::turn::ResponseType;

    use crate::clients::{GenerationRequest, SearchHit};

    struct ScriptedLlm {
        replies: Mutex<Vec<Result<String, AgentError>>>,
    }

    impl ScriptedLlm {
        fn with(replies: Vec<Result<String, AgentError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
            })
        }
    }

    impl LlmClient for ScriptedLlm {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, AgentError> {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Ok("Next question?".to_string())
            } else {
                replies.remove(0)
            }
        }
    }

    struct NoSearch;

    impl SearchClient for NoSearch {
        async fn search(
            &self,
            _query: &str,
            _max_results: usize,
        ) -> Result<Vec<SearchHit>, rehearse_types::error::SearchError> {
            Ok(vec![])
        }
    }

    fn fabric() -> RateLimitFabric {
        RateLimitFabric::new(&ProviderCaps::default(), Duration::from_millis(100))
    }

    fn orchestrator(replies: Vec<Result<String, AgentError>>) -> SessionOrchestrator<ScriptedLlm, NoSearch> {
        SessionOrchestrator::new(
            SessionId::new(),
            None,
            SessionConfig::default(),
            ScriptedLlm::with(replies),
            Arc::new(NoSearch),
        )
    }

    async fn running_session(
        replies: Vec<Result<String, AgentError>>,
    ) -> SessionOrchestrator<ScriptedLlm, NoSearch> {
        let mut orch = orchestrator(replies);
        orch.start(&fabric()).await.unwrap();
        orch
    }

    #[tokio::test]
    async fn start_appends_exactly_one_introduction() {
        let mut orch = orchestrator(vec![Ok("Welcome.".to_string())]);
        let turn = orch.start(&fabric()).await.unwrap();
        assert_eq!(turn.response_type, ResponseType::Introduction);
        assert_eq!(orch.history().len(), 1);
        assert_eq!(orch.phase(), SessionPhase::Running);
        assert_eq!(orch.stats().assistant_messages, 1);
    }

    #[tokio::test]
    async fn start_twice_is_state_invalid() {
        let mut orch = running_session(vec![]).await;
        let err = orch.start(&fabric()).await.unwrap_err();
        assert!(matches!(err, SessionError::StateInvalid(_)));
    }

    #[tokio::test]
    async fn send_before_start_is_state_invalid() {
        let mut orch = orchestrator(vec![]);
        let err = orch.send_user_message("hi", &fabric()).await.unwrap_err();
        assert!(matches!(err, SessionError::StateInvalid(_)));
    }

    #[tokio::test]
    async fn send_commits_exactly_two_turns_and_builds_job() {
        let mut orch = running_session(vec![
            Ok("Intro: tell me about yourself.".to_string()),
            Ok("What was your hardest bug?".to_string()),
        ])
        .await;
        let (turn, job) = orch
            .send_user_message("I have five years of backend experience.", &fabric())
            .await
            .unwrap();
        assert_eq!(orch.history().len(), 3);
        assert!(turn.is_interviewer());
        assert_eq!(job.turn_index, 1);
        assert_eq!(job.question, "Intro: tell me about yourself.");
        assert_eq!(job.answer, "I have five years of backend experience.");
        assert_eq!(orch.stats().user_messages, 1);
        assert_eq!(orch.stats().api_call_count, 1);
    }

    #[tokio::test]
    async fn failed_interviewer_call_rolls_back_user_turn() {
        let mut orch = running_session(vec![
            Ok("Intro".to_string()),
            Err(AgentError::Fatal("provider rejected request".to_string())),
        ])
        .await;
        let before = orch.history().len();
        let err = orch.send_user_message("answer", &fabric()).await.unwrap_err();
        assert!(matches!(err, SessionError::AgentUnavailable(_)));
        assert_eq!(orch.history().len(), before, "history must be unchanged");
        assert_eq!(orch.stats().user_messages, 0);
    }

    #[tokio::test]
    async fn empty_message_is_validation_error() {
        let mut orch = running_session(vec![]).await;
        let err = orch.send_user_message("   ", &fabric()).await.unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
    }

    #[tokio::test]
    async fn end_is_idempotent_and_launches_summary_once() {
        let mut orch = running_session(vec![]).await;
        let first = orch.end().unwrap();
        assert!(first.launch_summary);
        assert!(orch.is_summary_in_flight());

        let second = orch.end().unwrap();
        assert!(!second.launch_summary);
        assert_eq!(second.feedback, first.feedback);

        let err = orch.send_user_message("late", &fabric()).await.unwrap_err();
        assert!(matches!(err, SessionError::StateInvalid(_)));
    }

    #[tokio::test]
    async fn end_after_summary_installed_does_not_relaunch() {
        let mut orch = running_session(vec![]).await;
        orch.end().unwrap();
        orch.install_summary(SummaryOutcome::Completed(FinalSummary {
            patterns_tendencies: String::new(),
            strengths: String::new(),
            weaknesses: String::new(),
            improvement_focus_areas: String::new(),
            resource_search_topics: vec![],
            recommended_resources: vec![],
        }));
        let outcome = orch.end().unwrap();
        assert!(!outcome.launch_summary);
        assert!(orch.summary_status().is_completed());
    }

    #[tokio::test]
    async fn merge_feedback_orders_and_replaces() {
        let mut orch = running_session(vec![]).await;
        orch.send_user_message("a1", &fabric()).await.unwrap();
        orch.send_user_message("a2", &fabric()).await.unwrap();
        // History: intro(0), user(1), q(2), user(3), q(4).

        orch.merge_feedback(FeedbackEntry::new(3, "q", "a2", "late entry"))
            .unwrap();
        orch.merge_feedback(FeedbackEntry::new(1, "q", "a1", "early entry"))
            .unwrap();
        let indices: Vec<u32> = orch.feedback().iter().map(|e| e.turn_index).collect();
        assert_eq!(indices, vec![1, 3], "entries ordered by user-turn index");

        // Idempotent re-merge replaces in place.
        orch.merge_feedback(FeedbackEntry::new(1, "q", "a1", "revised"))
            .unwrap();
        assert_eq!(orch.feedback().len(), 2);
        assert_eq!(orch.feedback()[0].feedback, "revised");
    }

    #[tokio::test]
    async fn merge_feedback_rejects_non_user_index() {
        let mut orch = running_session(vec![]).await;
        orch.send_user_message("a1", &fabric()).await.unwrap();

        // Index 0 is the introduction, index 99 does not exist.
        assert!(orch
            .merge_feedback(FeedbackEntry::new(0, "q", "a", "bad"))
            .is_err());
        assert!(orch
            .merge_feedback(FeedbackEntry::new(99, "q", "a", "bad"))
            .is_err());
        assert!(orch.feedback().is_empty());
    }

    #[tokio::test]
    async fn feedback_never_exceeds_user_turns() {
        let mut orch = running_session(vec![]).await;
        orch.send_user_message("a1", &fabric()).await.unwrap();
        orch.send_user_message("a2", &fabric()).await.unwrap();
        orch.merge_feedback(FeedbackEntry::new(1, "q", "a1", "f1")).unwrap();
        orch.merge_feedback(FeedbackEntry::new(3, "q", "a2", "f2")).unwrap();
        // Re-merge both; count must not grow.
        orch.merge_feedback(FeedbackEntry::new(1, "q", "a1", "f1b")).unwrap();
        let user_turns = orch.history().iter().filter(|t| t.is_user()).count();
        assert!(orch.feedback().len() <= user_turns);
    }

    #[tokio::test]
    async fn reset_returns_to_configured_with_config_kept() {
        let mut orch = running_session(vec![]).await;
        orch.send_user_message("a1", &fabric()).await.unwrap();
        orch.end().unwrap();
        let config_before = orch.config().clone();

        orch.reset();
        assert_eq!(orch.phase(), SessionPhase::Configured);
        assert!(orch.history().is_empty());
        assert!(orch.feedback().is_empty());
        assert_eq!(orch.config(), &config_before);
        assert!(!orch.is_summary_in_flight());

        // Reset then start yields an introduction again (same structure as
        // a fresh session).
        let turn = orch.start(&fabric()).await.unwrap();
        assert_eq!(turn.response_type, ResponseType::Introduction);
        assert_eq!(turn.agent, Some(rehearse_types::turn::AgentKind::Interviewer));
    }

    #[tokio::test]
    async fn abandoned_session_times_out_everywhere() {
        let mut orch = running_session(vec![]).await;
        orch.mark_abandoned();
        assert!(matches!(
            orch.send_user_message("x", &fabric()).await.unwrap_err(),
            SessionError::Timeout
        ));
        assert!(matches!(orch.end().unwrap_err(), SessionError::Timeout));
        assert!(matches!(
            orch.start(&fabric()).await.unwrap_err(),
            SessionError::Timeout
        ));
    }

    #[tokio::test]
    async fn set_config_only_before_start() {
        let mut orch = orchestrator(vec![]);
        let mut config = SessionConfig::default();
        config.job_role = "SRE".to_string();
        orch.set_config(config.clone()).unwrap();
        assert_eq!(orch.config().job_role, "SRE");

        orch.start(&fabric()).await.unwrap();
        assert!(orch.set_config(SessionConfig::default()).is_err());
    }

    #[tokio::test]
    async fn snapshot_hydrate_roundtrip() {
        let mut orch = running_session(vec![]).await;
        orch.send_user_message("answer one", &fabric()).await.unwrap();
        orch.merge_feedback(FeedbackEntry::new(1, "q", "answer one", "solid"))
            .unwrap();

        let snapshot = orch.snapshot();
        assert_eq!(snapshot.meta.status, SessionStatus::Active);
        assert_eq!(snapshot.conversation.history.len(), 3);

        let rebuilt = SessionOrchestrator::hydrate(
            snapshot,
            ScriptedLlm::with(vec![]),
            Arc::new(NoSearch),
        );
        assert_eq!(rebuilt.phase(), SessionPhase::Running);
        assert_eq!(rebuilt.history().len(), 3);
        assert_eq!(rebuilt.feedback().len(), 1);
        assert!(!rebuilt.is_summary_in_flight());
    }

    #[tokio::test]
    async fn summary_status_defaults_to_generating() {
        let orch = orchestrator(vec![]);
        assert_eq!(orch.summary_status(), SummaryStatus::Generating);
    }
}
