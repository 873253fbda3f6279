//! Streaming transcription coordinator.
//!
//! Drives one bidirectional audio stream through the external provider
//! under the process-wide streaming cap. The semaphore permit is a local
//! owned value for the whole connection, so it is released exactly once
//! on every exit path: normal close, client drop, provider error, or the
//! stream idle limit.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use uuid::Uuid;

use rehearse_types::session::SessionId;
use rehearse_types::speech::{
    SpeechTask, SpeechTaskResult, SpeechTaskStatus, SpeechTaskType, SttProviderEvent, StreamEvent,
};

use crate::clients::StreamingTranscriber;
use crate::limits::{RateLimitFabric, provider};
use crate::store::SessionStore;

/// Default idle limit: a stream with no audio and no provider events for
/// this long is torn down.
const DEFAULT_STREAM_IDLE_LIMIT: Duration = Duration::from_secs(120);

/// Coordinates streaming transcription connections.
pub struct StreamingTranscriptionCoordinator<S, T> {
    store: Arc<S>,
    fabric: Arc<RateLimitFabric>,
    transcriber: Arc<T>,
    idle_limit: Duration,
}

impl<S, T> StreamingTranscriptionCoordinator<S, T>
where
    S: SessionStore,
    T: StreamingTranscriber,
{
    pub fn new(store: Arc<S>, fabric: Arc<RateLimitFabric>, transcriber: Arc<T>) -> Self {
        Self {
            store,
            fabric,
            transcriber,
            idle_limit: DEFAULT_STREAM_IDLE_LIMIT,
        }
    }

    /// Override the stream idle limit.
    pub fn with_idle_limit(mut self, idle_limit: Duration) -> Self {
        self.idle_limit = idle_limit;
        self
    }

    /// Run one connection to completion.
    ///
    /// `audio_rx` carries opaque audio frames from the client; translated
    /// events are emitted on `events_tx`. Returns when either side closes,
    /// the provider fails, or the idle limit fires.
    pub async fn run(
        &self,
        mut audio_rx: mpsc::Receiver<Vec<u8>>,
        events_tx: mpsc::Sender<StreamEvent>,
        session_id: Option<SessionId>,
    ) {
        let task_id = self.create_task(session_id).await;

        // Step 1: capacity. Denied connections emit an error and close
        // without touching the provider.
        let permit = match self.fabric.acquire(provider::STREAMING_TRANSCRIPTION).await {
            Ok(permit) => permit,
            Err(err) => {
                tracing::warn!(error = %err, "streaming slot denied");
                let _ = events_tx
                    .send(StreamEvent::Error {
                        message: "stream-capacity-exhausted".to_string(),
                    })
                    .await;
                self.finish_task(task_id, Err("stream capacity exhausted".to_string()))
                    .await;
                return;
            }
        };

        // Step 2: provider connection.
        let stream = match self.transcriber.open().await {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!(error = %err, "provider connection failed");
                let _ = events_tx
                    .send(StreamEvent::Error {
                        message: format!("provider connection failed: {err}"),
                    })
                    .await;
                self.finish_task(task_id, Err(format!("provider connection failed: {err}")))
                    .await;
                drop(permit);
                return;
            }
        };
        let audio_tx = stream.audio_tx;
        let mut events = stream.events;

        // Step 3: pump until either side closes. `permit` stays owned by
        // this scope; every break below releases it exactly once.
        let mut outcome: Result<String, String> = Ok("stream closed by client".to_string());
        let mut deadline = tokio::time::Instant::now() + self.idle_limit;
        loop {
            tokio::select! {
                frame = audio_rx.recv() => match frame {
                    Some(frame) => {
                        deadline = tokio::time::Instant::now() + self.idle_limit;
                        if audio_tx.send(frame).await.is_err() {
                            outcome = Err("provider closed the audio channel".to_string());
                            let _ = events_tx.send(StreamEvent::Error {
                                message: "provider closed the audio channel".to_string(),
                            }).await;
                            break;
                        }
                    }
                    None => break,
                },
                event = events.next() => match event {
                    Some(Ok(event)) => {
                        deadline = tokio::time::Instant::now() + self.idle_limit;
                        if events_tx.send(translate(event)).await.is_err() {
                            // Consumer dropped the outbound channel.
                            break;
                        }
                    }
                    Some(Err(err)) => {
                        outcome = Err(format!("provider error: {err}"));
                        let _ = events_tx.send(StreamEvent::Error {
                            message: format!("provider error: {err}"),
                        }).await;
                        break;
                    }
                    None => {
                        outcome = Ok("provider finished the stream".to_string());
                        break;
                    }
                },
                _ = tokio::time::sleep_until(deadline) => {
                    outcome = Err("stream idle limit reached".to_string());
                    let _ = events_tx.send(StreamEvent::Error {
                        message: "stream idle limit reached".to_string(),
                    }).await;
                    break;
                }
            }
        }

        // Step 4: teardown order: stop forwarding, close the provider,
        // release the slot, finalize the task record.
        drop(audio_tx);
        drop(events);
        drop(permit);
        self.finish_task(task_id, outcome).await;
    }

    async fn create_task(&self, session_id: Option<SessionId>) -> Option<Uuid> {
        let task = SpeechTask::new(session_id, SpeechTaskType::StreamingTranscription);
        match self.store.put_task(&task).await {
            Ok(()) => Some(task.id),
            Err(err) => {
                tracing::warn!(error = %err, "streaming task record not created");
                None
            }
        }
    }

    async fn finish_task(&self, task_id: Option<Uuid>, outcome: Result<String, String>) {
        let Some(task_id) = task_id else { return };
        let task = match self.store.get_task(task_id).await {
            Ok(Some(mut task)) => {
                match outcome {
                    Ok(note) => {
                        task.status = SpeechTaskStatus::Completed;
                        task.result = Some(SpeechTaskResult::StreamClosed { note });
                    }
                    Err(message) => {
                        task.status = SpeechTaskStatus::Error;
                        task.error = Some(message);
                    }
                }
                task.updated_at = Utc::now();
                task
            }
            _ => return,
        };
        if let Err(err) = self.store.put_task(&task).await {
            tracing::warn!(task_id = %task_id, error = %err, "streaming task update failed");
        }
    }
}

fn translate(event: SttProviderEvent) -> StreamEvent {
    match event {
        SttProviderEvent::Ready => StreamEvent::Connected,
        SttProviderEvent::Transcript { is_final, text } => {
            StreamEvent::Transcript { is_final, text }
        }
        SttProviderEvent::SpeechStarted { timestamp } => StreamEvent::SpeechStarted { timestamp },
        SttProviderEvent::UtteranceEnd { last_spoken_at } => {
            StreamEvent::UtteranceEnd { last_spoken_at }
        }
    }
}
