//! Scripted capability fakes for the end-to-end session tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use rehearse_types::error::{AgentError, SearchError, SpeechError, StoreError};
use rehearse_types::session::SessionId;
use rehearse_types::speech::{SpeechTask, SttProviderEvent};

use rehearse_core::clients::{
    GenerationRequest, LlmClient, SearchClient, SearchHit, StreamingTranscriber, SttStream,
};
use rehearse_core::store::{SessionSnapshot, SessionStore};

pub const INTRO_TEXT: &str =
    "Welcome to your interview. To start, tell me about yourself and your background.";
pub const QUESTION_TEXT: &str = "What was your most challenging project?";
pub const FEEDBACK_TEXT: &str = "Good answer; quantify your impact next time.";

pub const SUMMARY_JSON: &str = r#"{
    "patterns_tendencies": "Consistently clear context setting.",
    "strengths": "Strong backend fundamentals.",
    "weaknesses": "Few concrete metrics.",
    "improvement_focus_areas": "Quantify outcomes.",
    "resource_search_topics": ["quantify achievements in interviews"]
}"#;

/// LLM fake that routes on prompt content, with an injectable failure
/// queue consumed before any reply and an optional per-call delay for
/// question turns (used to force request overlap).
pub struct RoutedLlm {
    failures: Mutex<VecDeque<AgentError>>,
    pub question_delay: Mutex<Duration>,
    pub calls: AtomicU32,
}

impl RoutedLlm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            failures: Mutex::new(VecDeque::new()),
            question_delay: Mutex::new(Duration::ZERO),
            calls: AtomicU32::new(0),
        })
    }

    pub fn inject_failure(&self, error: AgentError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn set_question_delay(&self, delay: Duration) {
        *self.question_delay.lock().unwrap() = delay;
    }
}

impl LlmClient for RoutedLlm {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        let prompt = &request.prompt;
        if prompt.contains("Open the interview") {
            Ok(INTRO_TEXT.to_string())
        } else if prompt.contains("coaching feedback on this answer") {
            Ok(FEEDBACK_TEXT.to_string())
        } else if prompt.contains("final coaching summary") {
            Ok(SUMMARY_JSON.to_string())
        } else {
            let delay = *self.question_delay.lock().unwrap();
            if delay > Duration::ZERO {
                tokio::time::sleep(delay).await;
            }
            Ok(QUESTION_TEXT.to_string())
        }
    }
}

/// Search fake returning one hit per query.
pub struct StubSearch;

impl SearchClient for StubSearch {
    async fn search(
        &self,
        query: &str,
        _max_results: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        Ok(vec![SearchHit {
            title: format!("Resource for {query}"),
            url: "https://example.com/resource".to_string(),
            snippet: "Practical preparation material.".to_string(),
            resource_type: Some("article".to_string()),
        }])
    }
}

/// Streaming transcriber fake: every audio frame echoes back as one
/// final transcript event.
pub struct EchoTranscriber;

impl StreamingTranscriber for EchoTranscriber {
    async fn open(&self) -> Result<SttStream, SpeechError> {
        let (audio_tx, mut audio_rx) = mpsc::channel::<Vec<u8>>(16);
        let (event_tx, event_rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let _ = event_tx.send(Ok(SttProviderEvent::Ready)).await;
            while let Some(frame) = audio_rx.recv().await {
                let _ = event_tx
                    .send(Ok(SttProviderEvent::Transcript {
                        is_final: true,
                        text: format!("{} bytes", frame.len()),
                    }))
                    .await;
            }
        });
        let events = Box::pin(futures_util::stream::unfold(event_rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        }));
        Ok(SttStream { audio_tx, events })
    }
}

/// In-memory store with failure injection.
#[derive(Default)]
pub struct MemoryStore {
    pub sessions: DashMap<SessionId, SessionSnapshot>,
    pub tasks: DashMap<Uuid, SpeechTask>,
    pub fail_writes: AtomicBool,
}

impl SessionStore for MemoryStore {
    async fn put_session(&self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        self.sessions.insert(snapshot.meta.id, snapshot.clone());
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<SessionSnapshot>, StoreError> {
        Ok(self.sessions.get(&id).map(|s| s.clone()))
    }

    async fn put_task(&self, task: &SpeechTask) -> Result<(), StoreError> {
        self.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<SpeechTask>, StoreError> {
        Ok(self.tasks.get(&id).map(|t| t.clone()))
    }

    async fn list_tasks(&self, session_id: SessionId) -> Result<Vec<SpeechTask>, StoreError> {
        Ok(self
            .tasks
            .iter()
            .filter(|t| t.session_id == Some(session_id))
            .map(|t| t.clone())
            .collect())
    }
}
