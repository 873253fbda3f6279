//! Speech task records and streaming transcription event vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::session::SessionId;

/// Kind of speech work a task tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechTaskType {
    BatchTranscription,
    StreamingTranscription,
    Synthesis,
}

impl fmt::Display for SpeechTaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeechTaskType::BatchTranscription => write!(f, "batch_transcription"),
            SpeechTaskType::StreamingTranscription => write!(f, "streaming_transcription"),
            SpeechTaskType::Synthesis => write!(f, "synthesis"),
        }
    }
}

impl FromStr for SpeechTaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "batch_transcription" => Ok(SpeechTaskType::BatchTranscription),
            "streaming_transcription" => Ok(SpeechTaskType::StreamingTranscription),
            "synthesis" => Ok(SpeechTaskType::Synthesis),
            other => Err(format!("invalid speech task type: '{other}'")),
        }
    }
}

/// Processing status of a speech task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechTaskStatus {
    Processing,
    Completed,
    Error,
}

impl fmt::Display for SpeechTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeechTaskStatus::Processing => write!(f, "processing"),
            SpeechTaskStatus::Completed => write!(f, "completed"),
            SpeechTaskStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for SpeechTaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processing" => Ok(SpeechTaskStatus::Processing),
            "completed" => Ok(SpeechTaskStatus::Completed),
            "error" => Ok(SpeechTaskStatus::Error),
            other => Err(format!("invalid speech task status: '{other}'")),
        }
    }
}

/// Batch transcription output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResult {
    pub text: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

/// Result payload of a finished speech task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpeechTaskResult {
    Transcript(TranscriptResult),
    /// Synthesis output handle: the byte length of the produced audio.
    Synthesis { audio_bytes: u64 },
    /// Streaming sessions record only a closing note.
    StreamClosed { note: String },
}

/// Tracked record for one unit of speech work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechTask {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    pub task_type: SpeechTaskType,
    pub status: SpeechTaskStatus,
    /// Opaque progress blob (stage, percent, message).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<SpeechTaskResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SpeechTask {
    /// Create a new task in `Processing` state.
    pub fn new(session_id: Option<SessionId>, task_type: SpeechTaskType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            session_id,
            task_type,
            status: SpeechTaskStatus::Processing,
            progress: None,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Outbound event on a streaming transcription connection.
///
/// This is the wire vocabulary the coordinator emits to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Connected,
    Transcript { is_final: bool, text: String },
    SpeechStarted { timestamp: f64 },
    UtteranceEnd { last_spoken_at: f64 },
    Error { message: String },
}

/// Event produced by the streaming transcription provider, before
/// translation into the outbound [`StreamEvent`] vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub enum SttProviderEvent {
    Ready,
    Transcript { is_final: bool, text: String },
    SpeechStarted { timestamp: f64 },
    UtteranceEnd { last_spoken_at: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_type_roundtrip() {
        for t in [
            SpeechTaskType::BatchTranscription,
            SpeechTaskType::StreamingTranscription,
            SpeechTaskType::Synthesis,
        ] {
            let parsed: SpeechTaskType = t.to_string().parse().unwrap();
            assert_eq!(t, parsed);
        }
    }

    #[test]
    fn test_new_task_is_processing() {
        let task = SpeechTask::new(None, SpeechTaskType::BatchTranscription);
        assert_eq!(task.status, SpeechTaskStatus::Processing);
        assert!(task.result.is_none());
        assert!(task.error.is_none());
    }

    #[test]
    fn test_stream_event_wire_format() {
        let json = serde_json::to_string(&StreamEvent::Connected).unwrap();
        assert_eq!(json, r#"{"type":"connected"}"#);

        let json = serde_json::to_string(&StreamEvent::Transcript {
            is_final: true,
            text: "hello".to_string(),
        })
        .unwrap();
        assert!(json.contains("\"type\":\"transcript\""));
        assert!(json.contains("\"is_final\":true"));

        let json = serde_json::to_string(&StreamEvent::UtteranceEnd {
            last_spoken_at: 12.5,
        })
        .unwrap();
        assert!(json.contains("\"type\":\"utterance_end\""));
    }

    #[test]
    fn test_task_result_tagged() {
        let result = SpeechTaskResult::Transcript(TranscriptResult {
            text: "hi".to_string(),
            confidence: 0.97,
            duration_secs: Some(1.5),
        });
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"kind\":\"transcript\""));

        let parsed: SpeechTaskResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
    }
}
