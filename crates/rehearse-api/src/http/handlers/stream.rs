//! WebSocket endpoint for streaming transcription.
//!
//! Upgrades the connection, bridges WS frames to the coordinator's
//! channels, and multiplexes both directions with `tokio::select!` in a
//! single task. Binary frames are audio in; text frames out are the
//! typed stream-event vocabulary as JSON.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use rehearse_core::clients::AuthVerifier;
use rehearse_types::auth::AuthOutcome;
use rehearse_types::session::SessionId;
use rehearse_types::speech::StreamEvent;

use crate::state::AppState;

/// Handshake query parameters.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Optional bearer token (WS clients cannot set headers reliably).
    pub token: Option<String>,
    /// Optional session to tag the speech task with.
    pub session_id: Option<String>,
}

/// GET /ws/speech-to-text/stream - upgrade to a streaming transcription
/// connection.
pub async fn stream_transcription(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_stream(socket, state, query))
}

async fn handle_stream(socket: WebSocket, state: AppState, query: StreamQuery) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Reject present-but-invalid credentials before spending a slot.
    let outcome = state.auth.verify(query.token.as_deref()).await;
    if outcome == AuthOutcome::Invalid {
        let event = StreamEvent::Error {
            message: "unauthenticated".to_string(),
        };
        if let Ok(json) = serde_json::to_string(&event) {
            let _ = ws_sender.send(Message::Text(json.into())).await;
        }
        let _ = ws_sender.close().await;
        return;
    }

    let session_id: Option<SessionId> = match query.session_id.as_deref() {
        Some(raw) => match raw.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!(raw, "ignoring malformed session id on stream handshake");
                None
            }
        },
        None => None,
    };

    let (audio_tx, audio_rx) = mpsc::channel::<Vec<u8>>(32);
    let (events_tx, mut events_rx) = mpsc::channel::<StreamEvent>(32);

    let coordinator = state.stream_coordinator.clone();
    let pump = tokio::spawn(async move {
        coordinator.run(audio_rx, events_tx, session_id).await;
    });

    loop {
        tokio::select! {
            // --- Branch 1: translated events back to the client ---
            event = events_rx.recv() => match event {
                Some(event) => {
                    match serde_json::to_string(&event) {
                        Ok(json) => {
                            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "failed to serialize stream event");
                        }
                    }
                }
                // Coordinator finished (teardown complete).
                None => break,
            },

            // --- Branch 2: client frames into the coordinator ---
            message = ws_receiver.next() => match message {
                Some(Ok(Message::Binary(frame))) => {
                    if audio_tx.send(frame.to_vec()).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(err)) => {
                    tracing::debug!(error = %err, "websocket receive error");
                    break;
                }
                // Text, ping, pong frames carry no audio.
                Some(Ok(_)) => {}
            },
        }
    }

    // Dropping the audio sender tells the coordinator the client is gone;
    // it tears down the provider connection and releases the slot.
    drop(audio_tx);
    // Drain any final events (e.g. the error that caused the close).
    while let Some(event) = events_rx.recv().await {
        if let Ok(json) = serde_json::to_string(&event) {
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    }
    let _ = pump.await;
    let _ = ws_sender.close().await;
    tracing::debug!("streaming transcription connection closed");
}
