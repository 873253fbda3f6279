//! Deepgram clients: live streaming transcription and speech synthesis.
//!
//! Streaming uses the `/v1/listen` WebSocket. The connection is split
//! into a writer task (audio frames in, `CloseStream` on end) and a
//! reader task that parses provider messages into [`SttProviderEvent`]s.
//! Synthesis uses the `/v1/speak` REST endpoint.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::Message;

use rehearse_core::clients::{StreamingTranscriber, SttStream, SynthesisClient};
use rehearse_types::error::SpeechError;
use rehearse_types::speech::SttProviderEvent;

const LISTEN_URL: &str = "wss://api.deepgram.com/v1/listen\
    ?model=nova-2&smart_format=true&interim_results=true\
    &vad_events=true&utterance_end_ms=2000";
const SPEAK_BASE_URL: &str = "https://api.deepgram.com";
const DEFAULT_VOICE: &str = "aura-asteria-en";

/// Live transcription over the Deepgram listen WebSocket.
pub struct DeepgramTranscriber {
    api_key: SecretString,
    listen_url: String,
}

impl DeepgramTranscriber {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            listen_url: LISTEN_URL.to_string(),
        }
    }

    /// Override the listen URL (tests, proxies).
    pub fn with_listen_url(mut self, listen_url: String) -> Self {
        self.listen_url = listen_url;
        self
    }
}

impl StreamingTranscriber for DeepgramTranscriber {
    async fn open(&self) -> Result<SttStream, SpeechError> {
        let mut request = self
            .listen_url
            .as_str()
            .into_client_request()
            .map_err(|e| SpeechError::Connection(e.to_string()))?;
        let auth = format!("Token {}", self.api_key.expose_secret());
        request.headers_mut().insert(
            "Authorization",
            auth.parse()
                .map_err(|_| SpeechError::Connection("invalid api key header".to_string()))?,
        );

        let (ws, _) = connect_async(request)
            .await
            .map_err(|e| SpeechError::Connection(e.to_string()))?;
        let (mut writer, mut reader) = ws.split();

        let (audio_tx, mut audio_rx) = mpsc::channel::<Vec<u8>>(32);
        let (event_tx, event_rx) = mpsc::channel::<Result<SttProviderEvent, SpeechError>>(32);

        // Writer: forward audio frames; tell the provider we are done
        // when the audio channel closes.
        tokio::spawn(async move {
            while let Some(frame) = audio_rx.recv().await {
                if writer.send(Message::Binary(frame.into())).await.is_err() {
                    break;
                }
            }
            let _ = writer
                .send(Message::Text(r#"{"type":"CloseStream"}"#.into()))
                .await;
            let _ = writer.close().await;
        });

        // Reader: the connection is live, so the consumer sees `Ready`
        // first, then parsed provider messages.
        tokio::spawn(async move {
            if event_tx.send(Ok(SttProviderEvent::Ready)).await.is_err() {
                return;
            }
            while let Some(message) = reader.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if let Some(event) = parse_listen_message(&text) {
                            if event_tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        let _ = event_tx
                            .send(Err(SpeechError::Provider(e.to_string())))
                            .await;
                        break;
                    }
                }
            }
        });

        let events = Box::pin(futures_util::stream::unfold(event_rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        }));
        Ok(SttStream { audio_tx, events })
    }
}

#[derive(Debug, Deserialize)]
struct ListenMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    is_final: bool,
    #[serde(default)]
    channel: Option<Channel>,
    #[serde(default)]
    timestamp: Option<f64>,
    #[serde(default)]
    last_word_end: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

/// Parse one listen-socket message. Unknown or empty messages map to
/// `None` and are dropped.
fn parse_listen_message(raw: &str) -> Option<SttProviderEvent> {
    let message: ListenMessage = serde_json::from_str(raw).ok()?;
    match message.kind.as_str() {
        "Results" => {
            let text = message
                .channel?
                .alternatives
                .into_iter()
                .next()?
                .transcript;
            if text.is_empty() {
                return None;
            }
            Some(SttProviderEvent::Transcript {
                is_final: message.is_final,
                text,
            })
        }
        "SpeechStarted" => Some(SttProviderEvent::SpeechStarted {
            timestamp: message.timestamp.unwrap_or(0.0),
        }),
        "UtteranceEnd" => Some(SttProviderEvent::UtteranceEnd {
            last_spoken_at: message.last_word_end.unwrap_or(0.0),
        }),
        _ => None,
    }
}

/// Text-to-speech over the Deepgram speak endpoint.
pub struct DeepgramSynthesis {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl DeepgramSynthesis {
    pub fn new(api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to create reqwest client");
        Self {
            client,
            api_key,
            base_url: SPEAK_BASE_URL.to_string(),
        }
    }

    /// Override the base URL (tests, proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

impl SynthesisClient for DeepgramSynthesis {
    async fn synthesize(
        &self,
        text: &str,
        voice: Option<&str>,
        speed: f32,
    ) -> Result<Vec<u8>, SpeechError> {
        if (speed - 1.0).abs() > f32::EPSILON {
            tracing::debug!(speed, "speak endpoint has no rate control, using 1.0");
        }
        let model = voice.unwrap_or(DEFAULT_VOICE);
        let url = format!("{}/v1/speak?model={model}", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Token {}", self.api_key.expose_secret()),
            )
            .header("content-type", "application/json")
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| SpeechError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SpeechError::Provider(format!(
                "speak returned {}",
                response.status()
            )));
        }
        let audio = response
            .bytes()
            .await
            .map_err(|e| SpeechError::Provider(e.to_string()))?;
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_final_transcript() {
        let raw = r#"{
            "type": "Results",
            "is_final": true,
            "channel": {"alternatives": [{"transcript": "hello world"}]}
        }"#;
        match parse_listen_message(raw).unwrap() {
            SttProviderEvent::Transcript { is_final, text } => {
                assert!(is_final);
                assert_eq!(text, "hello world");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_empty_transcript_is_dropped() {
        let raw = r#"{
            "type": "Results",
            "is_final": false,
            "channel": {"alternatives": [{"transcript": ""}]}
        }"#;
        assert!(parse_listen_message(raw).is_none());
    }

    #[test]
    fn test_parse_vad_events() {
        let raw = r#"{"type":"SpeechStarted","timestamp":3.25}"#;
        assert_eq!(
            parse_listen_message(raw).unwrap(),
            SttProviderEvent::SpeechStarted { timestamp: 3.25 }
        );

        let raw = r#"{"type":"UtteranceEnd","last_word_end":7.5}"#;
        assert_eq!(
            parse_listen_message(raw).unwrap(),
            SttProviderEvent::UtteranceEnd { last_spoken_at: 7.5 }
        );
    }

    #[test]
    fn test_unknown_messages_are_dropped() {
        assert!(parse_listen_message(r#"{"type":"Metadata"}"#).is_none());
        assert!(parse_listen_message("not json").is_none());
    }
}
