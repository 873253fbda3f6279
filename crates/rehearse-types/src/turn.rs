//! Conversation turns and per-turn coaching feedback.
//!
//! History is an append-only sequence of turns. Assistant turns are tagged
//! with the agent that produced them; turn content is a tagged variant so
//! readers branch on the `kind` discriminator instead of sniffing shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;

use crate::session::SessionId;

/// Question/answer excerpts stored in feedback entries are truncated to
/// this many characters.
pub const FEEDBACK_EXCERPT_LEN: usize = 200;

/// Role of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
            TurnRole::System => write!(f, "system"),
        }
    }
}

/// Which agent produced an assistant turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Interviewer,
    Coach,
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentKind::Interviewer => write!(f, "interviewer"),
            AgentKind::Coach => write!(f, "coach"),
        }
    }
}

/// Semantic marker for what an assistant turn represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Introduction,
    Question,
    FollowUp,
    Closing,
    CoachingFeedback,
    Status,
    Error,
}

/// Turn payload. Interviewer and user turns carry plain text; coach turns
/// carry a structured feedback object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnContent {
    Text {
        text: String,
    },
    Coaching {
        feedback: String,
        /// Index of the user turn this feedback refers to.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        turn_index: Option<u32>,
    },
}

impl TurnContent {
    /// The textual body of the turn, regardless of variant.
    pub fn as_text(&self) -> &str {
        match self {
            TurnContent::Text { text } => text,
            TurnContent::Coaching { feedback, .. } => feedback,
        }
    }
}

/// One committed entry in a session's conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentKind>,
    pub content: TurnContent,
    pub response_type: ResponseType,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    /// A user answer turn.
    pub fn user(text: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            role: TurnRole::User,
            agent: None,
            content: TurnContent::Text { text: text.into() },
            response_type: ResponseType::Status,
            created_at: now,
        }
    }

    /// An interviewer turn with the given response type.
    pub fn interviewer(
        text: impl Into<String>,
        response_type: ResponseType,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            role: TurnRole::Assistant,
            agent: Some(AgentKind::Interviewer),
            content: TurnContent::Text { text: text.into() },
            response_type,
            created_at: now,
        }
    }

    /// True for user turns (the turns coaching feedback attaches to).
    pub fn is_user(&self) -> bool {
        self.role == TurnRole::User
    }

    /// True for assistant turns produced by the interviewer.
    pub fn is_interviewer(&self) -> bool {
        self.role == TurnRole::Assistant && self.agent == Some(AgentKind::Interviewer)
    }
}

/// Coach feedback tied to one specific user turn.
///
/// Entries are keyed by the index of the user turn in the conversation
/// history; at most one entry exists per user turn and entries are stored
/// in index order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub turn_index: u32,
    pub question: String,
    pub answer: String,
    pub feedback: String,
}

impl FeedbackEntry {
    /// Build an entry, truncating question/answer excerpts.
    pub fn new(
        turn_index: u32,
        question: &str,
        answer: &str,
        feedback: impl Into<String>,
    ) -> Self {
        Self {
            turn_index,
            question: truncate_chars(question, FEEDBACK_EXCERPT_LEN),
            answer: truncate_chars(answer, FEEDBACK_EXCERPT_LEN),
            feedback: feedback.into(),
        }
    }
}

/// A grading job handed to the coach pipeline when a user turn commits.
#[derive(Debug, Clone, PartialEq)]
pub struct GradingJob {
    pub session_id: SessionId,
    pub turn_index: u32,
    pub question: String,
    pub answer: String,
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
