//! Shared in-memory capability fakes for unit tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use dashmap::DashMap;
use uuid::Uuid;

use rehearse_types::error::{AgentError, SearchError, StoreError};
use rehearse_types::session::SessionId;
use rehearse_types::speech::SpeechTask;

use crate::clients::{GenerationRequest, LlmClient, SearchClient, SearchHit};
use crate::store::{SessionSnapshot, SessionStore};

/// LLM fake: scripted replies first, then a fixed default.
#[derive(Debug)]
pub struct ScriptedLlm {
    replies: Mutex<Vec<Result<String, AgentError>>>,
    pub default_reply: String,
    pub calls: AtomicU32,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<Result<String, AgentError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies),
            default_reply: "What is your next answer?".to_string(),
            calls: AtomicU32::new(0),
        })
    }

    pub fn push(&self, reply: Result<String, AgentError>) {
        self.replies.lock().unwrap().push(reply);
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LlmClient for ScriptedLlm {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            Ok(self.default_reply.clone())
        } else {
            replies.remove(0)
        }
    }
}

/// Search fake returning one fixed hit per query.
#[derive(Debug)]
pub struct FixedSearch;

impl SearchClient for FixedSearch {
    async fn search(
        &self,
        query: &str,
        _max_results: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        Ok(vec![SearchHit {
            title: format!("Guide: {query}"),
            url: "https://example.com/guide".to_string(),
            snippet: "A useful resource.".to_string(),
            resource_type: Some("article".to_string()),
        }])
    }
}

/// In-memory session store with failure injection.
#[derive(Default)]
pub struct MemoryStore {
    pub sessions: DashMap<SessionId, SessionSnapshot>,
    pub tasks: DashMap<Uuid, SpeechTask>,
    pub fail_writes: AtomicBool,
    pub write_count: AtomicU32,
}

impl SessionStore for MemoryStore {
    async fn put_session(&self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        self.write_count.fetch_add(1, Ordering::SeqCst);
        self.sessions.insert(snapshot.meta.id, snapshot.clone());
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<SessionSnapshot>, StoreError> {
        Ok(self.sessions.get(&id).map(|s| s.clone()))
    }

    async fn put_task(&self, task: &SpeechTask) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
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
