//! Capability traits for external collaborators.
//!
//! All traits use native async fn in traits (RPITIT) with `Send` futures,
//! except where object safety forces a boxed stream. Implementations live
//! in rehearse-infra; tests use channel-backed mocks.

use std::pin::Pin;

use futures_util::Stream;
use tokio::sync::mpsc;

use rehearse_types::auth::AuthOutcome;
use rehearse_types::error::{AgentError, ExtractError, SearchError, SpeechError};
use rehearse_types::speech::{SttProviderEvent, TranscriptResult};

/// Which logical agent call a generation request serves.
///
/// Carried on every request so the provider client can tag trace spans;
/// without it, interviewer turns and coach calls are indistinguishable
/// in telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmOperation {
    /// Interviewer producing the next turn.
    NextTurn,
    /// Coach grading one question/answer pair.
    EvaluateAnswer,
    /// Coach writing the terminal session summary.
    FinalSummary,
}

impl LlmOperation {
    /// The logical agent role issuing this operation.
    pub fn agent_name(self) -> &'static str {
        match self {
            LlmOperation::NextTurn => "interviewer",
            LlmOperation::EvaluateAnswer | LlmOperation::FinalSummary => "coach",
        }
    }
}

/// A single text-generation request to the LLM provider.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Which agent call this request serves (drives span attributes).
    pub operation: LlmOperation,
    /// System prompt establishing the agent persona.
    pub system: Option<String>,
    /// The user-visible prompt body.
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(operation: LlmOperation, prompt: impl Into<String>) -> Self {
        Self {
            operation,
            system: None,
            prompt: prompt.into(),
            max_tokens: 1024,
            temperature: 0.7,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Text-in/text-out LLM capability. The client performs its own transport;
/// concurrency caps are enforced by the fabric, retries by the agents.
pub trait LlmClient: Send + Sync {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl std::future::Future<Output = Result<String, AgentError>> + Send;
}

/// One result row from the external search provider.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub resource_type: Option<String>,
}

/// Web search capability used for resource recommendations.
pub trait SearchClient: Send + Sync {
    fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> impl std::future::Future<Output = Result<Vec<SearchHit>, SearchError>> + Send;
}

/// Batch (whole-file) transcription capability.
pub trait TranscriptionClient: Send + Sync {
    fn transcribe(
        &self,
        audio: &[u8],
    ) -> impl std::future::Future<Output = Result<TranscriptResult, SpeechError>> + Send;
}

/// An open bidirectional streaming transcription connection.
///
/// Audio frames go in via `audio_tx`; provider events come out of
/// `events`. Dropping `audio_tx` signals end-of-audio to the provider.
pub struct SttStream {
    pub audio_tx: mpsc::Sender<Vec<u8>>,
    pub events: Pin<Box<dyn Stream<Item = Result<SttProviderEvent, SpeechError>> + Send>>,
}

/// Streaming transcription capability: opens provider connections.
pub trait StreamingTranscriber: Send + Sync {
    fn open(&self)
    -> impl std::future::Future<Output = Result<SttStream, SpeechError>> + Send;
}

/// Text-to-speech capability.
pub trait SynthesisClient: Send + Sync {
    fn synthesize(
        &self,
        text: &str,
        voice: Option<&str>,
        speed: f32,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, SpeechError>> + Send;
}

/// Credential verification for HTTP requests and WS handshakes.
///
/// A missing credential is `Anonymous`, never an error: session endpoints
/// accept anonymous callers.
pub trait AuthVerifier: Send + Sync {
    fn verify(
        &self,
        token: Option<&str>,
    ) -> impl std::future::Future<Output = AuthOutcome> + Send;
}

/// Resume text extraction from an uploaded file.
pub trait ResumeExtractor: Send + Sync {
    fn extract(
        &self,
        bytes: &[u8],
        mime: &str,
    ) -> impl std::future::Future<Output = Result<String, ExtractError>> + Send;
}
