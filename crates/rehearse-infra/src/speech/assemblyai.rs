//! AssemblyAI batch transcription client.
//!
//! Three-step flow: upload the audio, request a transcript, poll until
//! the provider reports `completed` or `error`.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use rehearse_core::clients::TranscriptionClient;
use rehearse_types::error::SpeechError;
use rehearse_types::speech::TranscriptResult;

const DEFAULT_BASE_URL: &str = "https://api.assemblyai.com";
const POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_POLL_ATTEMPTS: u32 = 60;

/// AssemblyAI client for whole-file transcription.
pub struct AssemblyAiClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl AssemblyAiClient {
    pub fn new(api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("failed to create reqwest client");
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the base URL (tests, proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn upload(&self, audio: &[u8]) -> Result<String, SpeechError> {
        let response = self
            .client
            .post(format!("{}/v2/upload", self.base_url))
            .header("authorization", self.api_key.expose_secret())
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| SpeechError::Connection(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SpeechError::Provider(format!(
                "upload returned {}",
                response.status()
            )));
        }
        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| SpeechError::Provider(e.to_string()))?;
        Ok(parsed.upload_url)
    }

    async fn request_transcript(&self, upload_url: &str) -> Result<String, SpeechError> {
        let body = serde_json::json!({
            "audio_url": upload_url,
            "language_detection": true,
            "punctuate": true,
            "format_text": true,
        });
        let response = self
            .client
            .post(format!("{}/v2/transcript", self.base_url))
            .header("authorization", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| SpeechError::Connection(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SpeechError::Provider(format!(
                "transcript request returned {}",
                response.status()
            )));
        }
        let parsed: TranscriptCreated = response
            .json()
            .await
            .map_err(|e| SpeechError::Provider(e.to_string()))?;
        Ok(parsed.id)
    }

    async fn poll(&self, transcript_id: &str) -> Result<TranscriptResult, SpeechError> {
        for _ in 0..MAX_POLL_ATTEMPTS {
            let response = self
                .client
                .get(format!("{}/v2/transcript/{transcript_id}", self.base_url))
                .header("authorization", self.api_key.expose_secret())
                .send()
                .await
                .map_err(|e| SpeechError::Connection(e.to_string()))?;
            if !response.status().is_success() {
                return Err(SpeechError::Provider(format!(
                    "status check returned {}",
                    response.status()
                )));
            }
            let status: TranscriptStatus = response
                .json()
                .await
                .map_err(|e| SpeechError::Provider(e.to_string()))?;

            match try_finish(status)? {
                Some(result) => return Ok(result),
                None => tokio::time::sleep(POLL_INTERVAL).await,
            }
        }
        Err(SpeechError::Provider(
            "transcription timed out after 5 minutes".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptCreated {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptStatus {
    status: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    audio_duration: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

/// `Ok(Some)` when finished, `Ok(None)` while still processing.
fn try_finish(status: TranscriptStatus) -> Result<Option<TranscriptResult>, SpeechError> {
    match status.status.as_str() {
        "completed" => Ok(Some(TranscriptResult {
            text: status.text.unwrap_or_default(),
            confidence: status.confidence.unwrap_or(0.0),
            duration_secs: status.audio_duration,
        })),
        "error" => Err(SpeechError::Provider(
            status
                .error
                .unwrap_or_else(|| "transcription failed".to_string()),
        )),
        _ => Ok(None),
    }
}

impl TranscriptionClient for AssemblyAiClient {
    async fn transcribe(&self, audio: &[u8]) -> Result<TranscriptResult, SpeechError> {
        let upload_url = self.upload(audio).await?;
        let transcript_id = self.request_transcript(&upload_url).await?;
        self.poll(&transcript_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_status_maps_to_result() {
        let status: TranscriptStatus = serde_json::from_str(
            r#"{"status":"completed","text":"hello world","confidence":0.94,"audio_duration":2.5}"#,
        )
        .unwrap();
        let result = try_finish(status).unwrap().unwrap();
        assert_eq!(result.text, "hello world");
        assert!((result.confidence - 0.94).abs() < f64::EPSILON);
        assert_eq!(result.duration_secs, Some(2.5));
    }

    #[test]
    fn test_processing_status_keeps_polling() {
        let status: TranscriptStatus =
            serde_json::from_str(r#"{"status":"processing"}"#).unwrap();
        assert!(try_finish(status).unwrap().is_none());
    }

    #[test]
    fn test_error_status_surfaces_message() {
        let status: TranscriptStatus =
            serde_json::from_str(r#"{"status":"error","error":"bad audio"}"#).unwrap();
        match try_finish(status).unwrap_err() {
            SpeechError::Provider(message) => assert_eq!(message, "bad audio"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
