//! Batch transcription and synthesis under the provider caps.
//!
//! Batch jobs are tracked as speech-task records: the endpoint returns a
//! task id immediately and a background worker acquires a provider slot,
//! transcribes with bounded retries, and writes the result or error back
//! to the task record.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use rehearse_types::error::{SessionError, SpeechError};
use rehearse_types::session::SessionId;
use rehearse_types::speech::{SpeechTask, SpeechTaskResult, SpeechTaskStatus, SpeechTaskType};

use crate::clients::{SynthesisClient, TranscriptionClient};
use crate::limits::{LimitError, RateLimitFabric, provider};
use crate::store::SessionStore;

/// Provider attempts per batch job.
const BATCH_ATTEMPTS: u32 = 3;

/// Batch speech operations over the store, fabric, and provider clients.
pub struct SpeechService<S, T, Y> {
    store: Arc<S>,
    fabric: Arc<RateLimitFabric>,
    transcription: Arc<T>,
    synthesis: Arc<Y>,
}

impl<S, T, Y> Clone for SpeechService<S, T, Y> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            fabric: Arc::clone(&self.fabric),
            transcription: Arc::clone(&self.transcription),
            synthesis: Arc::clone(&self.synthesis),
        }
    }
}

impl<S, T, Y> SpeechService<S, T, Y>
where
    S: SessionStore + 'static,
    T: TranscriptionClient + 'static,
    Y: SynthesisClient + 'static,
{
    pub fn new(
        store: Arc<S>,
        fabric: Arc<RateLimitFabric>,
        transcription: Arc<T>,
        synthesis: Arc<Y>,
    ) -> Self {
        Self {
            store,
            fabric,
            transcription,
            synthesis,
        }
    }

    pub fn store(&self) -> Arc<S> {
        Arc::clone(&self.store)
    }

    pub fn fabric(&self) -> Arc<RateLimitFabric> {
        Arc::clone(&self.fabric)
    }

    /// Create a batch transcription task and start the background worker.
    /// Returns the task id for status polling.
    pub async fn submit_batch(
        &self,
        audio: Vec<u8>,
        session_id: Option<SessionId>,
    ) -> Result<Uuid, SessionError> {
        if audio.is_empty() {
            return Err(SessionError::Validation(
                "audio payload must not be empty".to_string(),
            ));
        }
        let task = SpeechTask::new(session_id, SpeechTaskType::BatchTranscription);
        self.store
            .put_task(&task)
            .await
            .map_err(|e| SessionError::PersistenceDegraded(e.to_string()))?;

        let service = self.clone();
        let task_id = task.id;
        tokio::spawn(async move {
            service.run_batch(task_id, audio).await;
        });
        Ok(task_id)
    }

    /// The batch worker: slot, retried provider call, task update.
    pub async fn run_batch(&self, task_id: Uuid, audio: Vec<u8>) {
        self.update_task(task_id, |task| {
            task.progress = Some(serde_json::json!({"stage": "uploading"}));
        })
        .await;

        let permit = match self.fabric.acquire(provider::BATCH_TRANSCRIPTION).await {
            Ok(permit) => permit,
            Err(err) => {
                tracing::warn!(task_id = %task_id, error = %err, "batch slot unavailable");
                self.update_task(task_id, |task| {
                    task.status = SpeechTaskStatus::Error;
                    task.error = Some(
                        "transcription temporarily unavailable due to rate limiting".to_string(),
                    );
                })
                .await;
                return;
            }
        };

        let mut last_error: Option<SpeechError> = None;
        let mut result = None;
        for attempt in 1..=BATCH_ATTEMPTS {
            match self.transcription.transcribe(&audio).await {
                Ok(transcript) => {
                    result = Some(transcript);
                    break;
                }
                Err(err) => {
                    tracing::warn!(
                        task_id = %task_id,
                        attempt,
                        error = %err,
                        "batch transcription attempt failed"
                    );
                    last_error = Some(err);
                    if attempt < BATCH_ATTEMPTS {
                        let base = 1u64 << (attempt - 1);
                        let jitter_ms = rand::rng().random_range(0..1000);
                        tokio::time::sleep(Duration::from_millis(base * 1000 + jitter_ms)).await;
                    }
                }
            }
        }
        drop(permit);

        match result {
            Some(transcript) => {
                self.update_task(task_id, |task| {
                    task.status = SpeechTaskStatus::Completed;
                    task.progress = None;
                    task.result = Some(SpeechTaskResult::Transcript(transcript.clone()));
                })
                .await;
                tracing::info!(task_id = %task_id, "batch transcription completed");
            }
            None => {
                let message = match last_error {
                    Some(err) => format!(
                        "transcription failed after {BATCH_ATTEMPTS} attempts: {err}"
                    ),
                    None => format!("transcription failed after {BATCH_ATTEMPTS} attempts"),
                };
                self.update_task(task_id, |task| {
                    task.status = SpeechTaskStatus::Error;
                    task.error = Some(message.clone());
                })
                .await;
            }
        }
    }

    /// Synthesize audio for `text` under the synthesis cap. Records a
    /// completed task when the call is session-tagged.
    pub async fn synthesize(
        &self,
        text: &str,
        voice: Option<&str>,
        speed: f32,
        session_id: Option<SessionId>,
    ) -> Result<Vec<u8>, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::Validation(
                "text must not be empty".to_string(),
            ));
        }
        if !(0.5..=2.0).contains(&speed) {
            return Err(SessionError::Validation(format!(
                "speed must be between 0.5 and 2.0, got {speed}"
            )));
        }

        let _permit = self
            .fabric
            .acquire(provider::SYNTHESIS)
            .await
            .map_err(|e| match e {
                LimitError::CapacityExhausted(name) => SessionError::CapacityExhausted(name),
                LimitError::UnknownProvider(name) => {
                    SessionError::AgentUnavailable(format!("unknown provider '{name}'"))
                }
            })?;

        let audio = self
            .synthesis
            .synthesize(text, voice, speed)
            .await
            .map_err(|e| SessionError::AgentUnavailable(format!("synthesis failed: {e}")))?;

        if session_id.is_some() {
            let mut task = SpeechTask::new(session_id, SpeechTaskType::Synthesis);
            task.status = SpeechTaskStatus::Completed;
            task.result = Some(SpeechTaskResult::Synthesis {
                audio_bytes: audio.len() as u64,
            });
            if let Err(err) = self.store.put_task(&task).await {
                tracing::warn!(error = %err, "failed to record synthesis task");
            }
        }
        Ok(audio)
    }

    /// Look up a task for status polling.
    pub async fn task_status(&self, task_id: Uuid) -> Result<SpeechTask, SessionError> {
        self.store
            .get_task(task_id)
            .await
            .map_err(|e| SessionError::PersistenceDegraded(e.to_string()))?
            .ok_or(SessionError::NotFound)
    }

    /// All tasks attached to a session.
    pub async fn session_tasks(&self, session_id: SessionId) -> Result<Vec<SpeechTask>, SessionError> {
        self.store
            .list_tasks(session_id)
            .await
            .map_err(|e| SessionError::PersistenceDegraded(e.to_string()))
    }

    async fn update_task(&self, task_id: Uuid, mutate: impl FnOnce(&mut SpeechTask)) {
        let task = match self.store.get_task(task_id).await {
            Ok(Some(mut task)) => {
                mutate(&mut task);
                task.updated_at = Utc::now();
                task
            }
            Ok(None) => {
                tracing::warn!(task_id = %task_id, "speech task vanished");
                return;
            }
            Err(err) => {
                tracing::warn!(task_id = %task_id, error = %err, "task read failed");
                return;
            }
        };
        if let Err(err) = self.store.put_task(&task).await {
            tracing::warn!(task_id = %task_id, error = %err, "task update failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use rehearse_types::config::ProviderCaps;
    use rehearse_types::speech::TranscriptResult;

    use crate::test_support::MemoryStore;

    struct ScriptedTranscriber {
        outcomes: Mutex<Vec<Result<TranscriptResult, SpeechError>>>,
    }

    impl TranscriptionClient for ScriptedTranscriber {
        async fn transcribe(&self, audio: &[u8]) -> Result<TranscriptResult, SpeechError> {
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                Ok(TranscriptResult {
                    text: format!("{} bytes transcribed", audio.len()),
                    confidence: 0.9,
                    duration_secs: Some(1.0),
                })
            } else {
                outcomes.remove(0)
            }
        }
    }

    struct FixedSynthesizer;

    impl SynthesisClient for FixedSynthesizer {
        async fn synthesize(
            &self,
            text: &str,
            _voice: Option<&str>,
            _speed: f32,
        ) -> Result<Vec<u8>, SpeechError> {
            Ok(text.as_bytes().to_vec())
        }
    }

    fn service(
        outcomes: Vec<Result<TranscriptResult, SpeechError>>,
    ) -> (
        Arc<MemoryStore>,
        SpeechService<MemoryStore, ScriptedTranscriber, FixedSynthesizer>,
    ) {
        let store = Arc::new(MemoryStore::default());
        let fabric = Arc::new(RateLimitFabric::new(
            &ProviderCaps::default(),
            Duration::from_millis(50),
        ));
        let service = SpeechService::new(
            Arc::clone(&store),
            fabric,
            Arc::new(ScriptedTranscriber {
                outcomes: Mutex::new(outcomes),
            }),
            Arc::new(FixedSynthesizer),
        );
        (store, service)
    }

    #[tokio::test]
    async fn batch_job_completes_with_transcript() {
        let (_store, service) = service(vec![]);
        let session = SessionId::new();
        let task_id = service
            .submit_batch(vec![1, 2, 3], Some(session))
            .await
            .unwrap();

        // The worker runs in the background; poll until terminal.
        let task = poll_terminal(&service, task_id).await;
        assert_eq!(task.status, SpeechTaskStatus::Completed);
        match task.result.unwrap() {
            SpeechTaskResult::Transcript(t) => assert_eq!(t.text, "3 bytes transcribed"),
            other => panic!("unexpected result: {other:?}"),
        }

        let tasks = service.session_tasks(session).await.unwrap();
        assert_eq!(tasks.len(), 1);
    }

    #[tokio::test]
    async fn empty_audio_is_rejected() {
        let (_store, service) = service(vec![]);
        let err = service.submit_batch(vec![], None).await.unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
    }

    #[tokio::test]
    async fn provider_errors_become_task_error_after_retries() {
        let (_store, service) = service(vec![
            Err(SpeechError::Provider("upload failed".to_string())),
            Err(SpeechError::Provider("upload failed".to_string())),
            Err(SpeechError::Provider("upload failed".to_string())),
        ]);
        let task_id = service.submit_batch(vec![0u8; 8], None).await.unwrap();

        let task = poll_terminal(&service, task_id).await;
        assert_eq!(task.status, SpeechTaskStatus::Error);
        assert!(task.error.unwrap().contains("after 3 attempts"));
    }

    #[tokio::test]
    async fn transient_failure_then_success() {
        let (_store, service) = service(vec![Err(SpeechError::Connection(
            "reset".to_string(),
        ))]);
        let task_id = service.submit_batch(vec![0u8; 4], None).await.unwrap();

        let task = poll_terminal(&service, task_id).await;
        assert_eq!(task.status, SpeechTaskStatus::Completed);
    }

    #[tokio::test]
    async fn synthesize_returns_audio_and_records_task() {
        let (_store, service) = service(vec![]);
        let session = SessionId::new();
        let audio = service
            .synthesize("hello there", Some("joanna"), 1.0, Some(session))
            .await
            .unwrap();
        assert_eq!(audio, b"hello there");

        let tasks = service.session_tasks(session).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task_type, SpeechTaskType::Synthesis);
        assert_eq!(tasks[0].status, SpeechTaskStatus::Completed);
    }

    #[tokio::test]
    async fn synthesize_validates_inputs() {
        let (_store, service) = service(vec![]);
        assert!(matches!(
            service.synthesize(" ", None, 1.0, None).await.unwrap_err(),
            SessionError::Validation(_)
        ));
        assert!(matches!(
            service.synthesize("hi", None, 3.0, None).await.unwrap_err(),
            SessionError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let (_store, service) = service(vec![]);
        let err = service.task_status(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound));
    }

    async fn poll_terminal(
        service: &SpeechService<MemoryStore, ScriptedTranscriber, FixedSynthesizer>,
        task_id: Uuid,
    ) -> SpeechTask {
        for _ in 0..200 {
            let task = service.task_status(task_id).await.unwrap();
            if task.status != SpeechTaskStatus::Processing {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("task never reached a terminal status");
    }
}
