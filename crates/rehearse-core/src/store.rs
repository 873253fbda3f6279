//! Session persistence capability.
//!
//! Three logical records per session (meta+config+stats, conversation+
//! feedback, summary) plus a side table of speech tasks. `put_session`
//! atomically replaces all three records with a post-transition snapshot;
//! partial snapshots are never written.

use uuid::Uuid;

use rehearse_types::error::StoreError;
use rehearse_types::session::{SessionConfig, SessionId, SessionStats, SessionStatus};
use rehearse_types::speech::SpeechTask;
use rehearse_types::summary::SummaryOutcome;
use rehearse_types::turn::{ConversationTurn, FeedbackEntry};

/// Configuration, ownership, status, and statistics for one session.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionMetaRecord {
    pub id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_user_id: Option<String>,
    pub status: SessionStatus,
    pub config: SessionConfig,
    pub stats: SessionStats,
}

/// Conversation history plus the per-turn feedback log.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConversationRecord {
    pub history: Vec<ConversationTurn>,
    pub feedback: Vec<FeedbackEntry>,
}

/// Point-in-time view of one session after a committed state transition.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionSnapshot {
    pub meta: SessionMetaRecord,
    pub conversation: ConversationRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryOutcome>,
}

/// Persistence capability for sessions and speech tasks.
///
/// Implementations live in rehearse-infra (e.g. `SqliteSessionStore`).
pub trait SessionStore: Send + Sync {
    /// Atomically replace all records for the snapshot's session.
    fn put_session(
        &self,
        snapshot: &SessionSnapshot,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Load a session by id. `Ok(None)` when no record exists.
    fn get_session(
        &self,
        id: SessionId,
    ) -> impl std::future::Future<Output = Result<Option<SessionSnapshot>, StoreError>> + Send;

    /// Insert or replace a speech task record.
    fn put_task(
        &self,
        task: &SpeechTask,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Load a speech task by id.
    fn get_task(
        &self,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<Option<SpeechTask>, StoreError>> + Send;

    /// List all speech tasks attached to a session.
    fn list_tasks(
        &self,
        session_id: SessionId,
    ) -> impl std::future::Future<Output = Result<Vec<SpeechTask>, StoreError>> + Send;
}
