//! Anthropic Messages API client.
//!
//! Implements [`LlmClient`] over `/v1/messages`. The API key lives in a
//! [`SecretString`] and is only exposed while building request headers;
//! the type deliberately has no `Debug` impl.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use rehearse_core::clients::{GenerationRequest, LlmClient, LlmOperation};
use rehearse_types::error::AgentError;

const API_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic Claude client.
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(api_key: SecretString, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to create reqwest client");
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
        }
    }

    /// Override the base URL (tests, proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn to_request(&self, request: &GenerationRequest) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            system: request.system.clone(),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            temperature: request.temperature,
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ApiMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl MessagesResponse {
    fn text(self) -> String {
        self.content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Map an HTTP status to the agent error taxonomy.
fn classify_status(status: u16, retry_after: Option<u64>, body: &str) -> AgentError {
    match status {
        429 => AgentError::RateLimited {
            retry_after_secs: retry_after,
        },
        500..=599 => AgentError::Transient(format!("provider returned {status}: {body}")),
        _ => AgentError::Fatal(format!("provider returned {status}: {body}")),
    }
}

/// GenAI operation-name attribute value for a request.
fn operation_name(operation: LlmOperation) -> &'static str {
    use rehearse_observe::genai_attrs as genai;
    match operation {
        LlmOperation::NextTurn => genai::OP_NEXT_TURN,
        LlmOperation::EvaluateAnswer => genai::OP_EVALUATE_ANSWER,
        LlmOperation::FinalSummary => genai::OP_FINAL_SUMMARY,
    }
}

impl LlmClient for AnthropicClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, AgentError> {
        use rehearse_observe::genai_attrs as genai;
        use tracing::Instrument;

        let span = tracing::info_span!(
            "generate",
            { genai::GEN_AI_OPERATION_NAME } = operation_name(request.operation),
            { genai::GEN_AI_AGENT_NAME } = request.operation.agent_name(),
            { genai::GEN_AI_PROVIDER_NAME } = genai::PROVIDER_ANTHROPIC,
            { genai::GEN_AI_REQUEST_MODEL } = %self.model,
            { genai::GEN_AI_REQUEST_TEMPERATURE } = request.temperature,
            { genai::GEN_AI_REQUEST_MAX_TOKENS } = request.max_tokens,
        );
        self.generate_inner(request).instrument(span).await
    }
}

impl AnthropicClient {
    async fn generate_inner(&self, request: &GenerationRequest) -> Result<String, AgentError> {
        let body = self.to_request(request);
        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Transient(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), retry_after, &body));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Fatal(format!("malformed provider response: {e}")))?;
        Ok(parsed.text())
    }
}
