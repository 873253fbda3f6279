//! Session identity, lifecycle status, configuration, and statistics.
//!
//! A session is a single long-lived interview conversation. Its
//! configuration is immutable after the interview starts; its statistics
//! accumulate across turns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Unique identifier of an interview session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Allocate a fresh (time-ordered) session id.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle status of an interview session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Abandoned,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Abandoned => write!(f, "abandoned"),
        }
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(SessionStatus::Active),
            "completed" => Ok(SessionStatus::Completed),
            "abandoned" => Ok(SessionStatus::Abandoned),
            other => Err(format!("invalid session status: '{other}'")),
        }
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Active
    }
}

/// How the interviewer conducts the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewStyle {
    Formal,
    Casual,
    Aggressive,
    Technical,
}

impl fmt::Display for InterviewStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterviewStyle::Formal => write!(f, "formal"),
            InterviewStyle::Casual => write!(f, "casual"),
            InterviewStyle::Aggressive => write!(f, "aggressive"),
            InterviewStyle::Technical => write!(f, "technical"),
        }
    }
}

impl FromStr for InterviewStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "formal" => Ok(InterviewStyle::Formal),
            "casual" => Ok(InterviewStyle::Casual),
            "aggressive" => Ok(InterviewStyle::Aggressive),
            "technical" => Ok(InterviewStyle::Technical),
            other => Err(format!("invalid interview style: '{other}'")),
        }
    }
}

impl Default for InterviewStyle {
    fn default() -> Self {
        InterviewStyle::Formal
    }
}

/// Question difficulty for the interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("invalid difficulty: '{other}'")),
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}

/// Immutable configuration of an interview session.
///
/// Set when the session is created; a `reset` keeps the config and only
/// clears conversational state. When `use_time_based` is true the
/// interview terminates on elapsed time, otherwise on question count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub job_role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_content: Option<String>,
    #[serde(default)]
    pub style: InterviewStyle,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_question_count")]
    pub target_question_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u32,
    #[serde(default = "default_use_time_based")]
    pub use_time_based: bool,
}

fn default_question_count() -> u32 {
    15
}

fn default_duration_minutes() -> u32 {
    10
}

fn default_use_time_based() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            job_role: "General Role".to_string(),
            job_description: None,
            resume_content: None,
            style: InterviewStyle::default(),
            difficulty: Difficulty::default(),
            target_question_count: default_question_count(),
            company_name: None,
            duration_minutes: default_duration_minutes(),
            use_time_based: default_use_time_based(),
        }
    }
}

impl SessionConfig {
    /// Validate constraints that cannot be expressed in the type system.
    pub fn validate(&self) -> Result<(), String> {
        if self.job_role.trim().is_empty() {
            return Err("job_role must not be empty".to_string());
        }
        if self.use_time_based && !(5..=30).contains(&self.duration_minutes) {
            return Err(format!(
                "duration_minutes must be between 5 and 30, got {}",
                self.duration_minutes
            ));
        }
        if !self.use_time_based && self.target_question_count == 0 {
            return Err("target_question_count must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Performance and usage statistics for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_messages: u32,
    pub user_messages: u32,
    pub assistant_messages: u32,
    pub system_messages: u32,
    /// Cumulative wall-clock seconds spent answering (interviewer calls).
    pub total_response_seconds: f64,
    pub average_response_seconds: f64,
    pub api_call_count: u32,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl SessionStats {
    /// Fresh stats record anchored at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            total_messages: 0,
            user_messages: 0,
            assistant_messages: 0,
            system_messages: 0,
            total_response_seconds: 0.0,
            average_response_seconds: 0.0,
            api_call_count: 0,
            started_at: now,
            last_activity_at: now,
        }
    }

    /// Record one completed interviewer exchange.
    pub fn record_api_call(&mut self, response_seconds: f64) {
        self.api_call_count += 1;
        self.total_response_seconds += response_seconds;
        self.average_response_seconds =
            self.total_response_seconds / f64::from(self.api_call_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_status_roundtrip() {
        for status in [
            SessionStatus::Active,
            SessionStatus::Completed,
            SessionStatus::Abandoned,
        ] {
            let s = status.to_string();
            let parsed: SessionStatus = s.parse().unwrap();
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn test_session_status_serde() {
        let json = serde_json::to_string(&SessionStatus::Abandoned).unwrap();
        assert_eq!(json, "\"abandoned\"");
        let parsed: SessionStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, SessionStatus::Abandoned);
    }

    #[test]
    fn test_style_and_difficulty_parse() {
        assert_eq!(
            "technical".parse::<InterviewStyle>().unwrap(),
            InterviewStyle::Technical
        );
        assert_eq!("Hard".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("brutal".parse::<InterviewStyle>().is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.job_role, "General Role");
        assert_eq!(config.style, InterviewStyle::Formal);
        assert_eq!(config.difficulty, Difficulty::Medium);
        assert_eq!(config.target_question_count, 15);
        assert_eq!(config.duration_minutes, 10);
        assert!(config.use_time_based);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_duration_bounds() {
        let mut config = SessionConfig::default();
        config.duration_minutes = 4;
        assert!(config.validate().is_err());
        config.duration_minutes = 31;
        assert!(config.validate().is_err());
        config.duration_minutes = 5;
        assert!(config.validate().is_ok());

        // Question-count mode ignores duration bounds.
        config.use_time_based = false;
        config.duration_minutes = 90;
        assert!(config.validate().is_ok());
        config.target_question_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_deserialize_with_partial_fields() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"job_role":"Software Engineer","style":"formal"}"#).unwrap();
        assert_eq!(config.job_role, "Software Engineer");
        assert_eq!(config.target_question_count, 15);
        assert!(config.use_time_based);
    }

    #[test]
    fn test_stats_average() {
        let mut stats = SessionStats::new(Utc::now());
        stats.record_api_call(2.0);
        stats.record_api_call(4.0);
        assert_eq!(stats.api_call_count, 2);
        assert!((stats.average_response_seconds - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_session_id_display_parse() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
