//! Coach agent: per-turn answer evaluation, terminal summary, and
//! resource recommendations.
//!
//! The summary call asks the LLM for strict JSON; replies are parsed
//! leniently (code fences stripped, missing keys defaulted) and fall back
//! to a minimal summary when unparsable. Resource search runs one query
//! per derived topic under the `search` cap; when every search comes back
//! empty the candidate still gets a curated fallback list.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use rehearse_types::error::AgentError;
use rehearse_types::summary::{FinalSummary, RecommendedResource};
use rehearse_types::turn::ConversationTurn;

use crate::agents::prompts;
use crate::agents::retry::{RetryPolicy, call_with_retry};
use crate::clients::{GenerationRequest, LlmClient, LlmOperation, SearchClient};
use crate::limits::{RateLimitFabric, provider};

/// Feedback recorded when grading fails terminally for a turn.
pub const COACH_FEEDBACK_ERROR: &str =
    "An error occurred while generating coach feedback for this turn.";

/// Results fetched per search topic.
const RESULTS_PER_TOPIC: usize = 3;

/// Per-session coach adapter over an [`LlmClient`] and a [`SearchClient`].
#[derive(Debug)]
pub struct CoachAgent<L, W> {
    llm: Arc<L>,
    search: Arc<W>,
    resume_content: Option<String>,
    job_description: Option<String>,
    retry: RetryPolicy,
}

impl<L: LlmClient, W: SearchClient> CoachAgent<L, W> {
    pub fn new(
        llm: Arc<L>,
        search: Arc<W>,
        resume_content: Option<String>,
        job_description: Option<String>,
    ) -> Self {
        Self {
            llm,
            search,
            resume_content,
            job_description,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy (tests, alternate provider agreements).
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Shared handle to the underlying LLM client.
    pub(crate) fn llm_handle(&self) -> Arc<L> {
        Arc::clone(&self.llm)
    }

    /// Shared handle to the underlying search client.
    pub(crate) fn search_handle(&self) -> Arc<W> {
        Arc::clone(&self.search)
    }

    /// Evaluate one question/answer pair; returns conversational feedback.
    pub async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
        history: &[ConversationTurn],
        fabric: &RateLimitFabric,
    ) -> Result<String, AgentError> {
        let prompt = prompts::coach_evaluate(
            self.resume_content.as_deref(),
            self.job_description.as_deref(),
            history,
            question,
            answer,
        );
        let text = self
            .generate(LlmOperation::EvaluateAnswer, &prompt, fabric)
            .await?;
        Ok(text.trim().to_string())
    }

    /// Generate the terminal summary and attach recommended resources.
    pub async fn finalize(
        &self,
        history: &[ConversationTurn],
        fabric: &RateLimitFabric,
    ) -> Result<FinalSummary, AgentError> {
        let mut summary = self.generate_summary(history, fabric).await?;

        let resources = self
            .recommend_resources(&summary.resource_search_topics, &summary, fabric)
            .await;
        summary.recommended_resources = if resources.is_empty() {
            fallback_resources()
        } else {
            resources
        };
        Ok(summary)
    }

    /// Summarize the whole session into a [`FinalSummary`] (no resources).
    pub async fn generate_summary(
        &self,
        history: &[ConversationTurn],
        fabric: &RateLimitFabric,
    ) -> Result<FinalSummary, AgentError> {
        if history.is_empty() {
            return Err(AgentError::Fatal(
                "no conversation history to summarize".to_string(),
            ));
        }
        let prompt = prompts::coach_final_summary(
            self.resume_content.as_deref(),
            self.job_description.as_deref(),
            history,
        );
        let text = self
            .generate(LlmOperation::FinalSummary, &prompt, fabric)
            .await?;
        Ok(parse_summary_with_fallback(&text))
    }

    /// Search for learning resources per topic, attaching reasoning drawn
    /// from the summary's weaknesses. Failed queries are skipped.
    pub async fn recommend_resources(
        &self,
        topics: &[String],
        summary: &FinalSummary,
        fabric: &RateLimitFabric,
    ) -> Vec<RecommendedResource> {
        let mut resources = Vec::new();
        for topic in topics {
            let permit = match fabric.acquire(provider::SEARCH).await {
                Ok(permit) => permit,
                Err(err) => {
                    tracing::warn!(topic = %topic, error = %err, "skipping resource search");
                    continue;
                }
            };
            let query = format!("{topic} interview preparation");
            match self.search.search(&query, RESULTS_PER_TOPIC).await {
                Ok(hits) => {
                    for hit in hits {
                        resources.push(RecommendedResource {
                            title: hit.title,
                            url: hit.url,
                            description: hit.snippet,
                            resource_type: hit
                                .resource_type
                                .unwrap_or_else(|| "article".to_string()),
                            reasoning: resource_reasoning(topic, summary),
                        });
                    }
                }
                Err(err) => {
                    tracing::warn!(topic = %topic, error = %err, "resource search failed");
                }
            }
            drop(permit);
        }
        resources
    }

    async fn generate(
        &self,
        operation: LlmOperation,
        prompt: &str,
        fabric: &RateLimitFabric,
    ) -> Result<String, AgentError> {
        let _permit = fabric
            .acquire(provider::LLM)
            .await
            .map_err(|e| AgentError::Transient(e.to_string()))?;

        let request =
            GenerationRequest::new(operation, prompt).with_system(prompts::coach_system());
        let cancel = CancellationToken::new();
        call_with_retry(&self.retry, &cancel, || {
            let request = request.clone();
            let llm = Arc::clone(&self.llm);
            async move { llm.generate(&request).await }
        })
        .await
    }
}

/// Why a resource was recommended, tied back to the observed weaknesses.
fn resource_reasoning(topic: &str, summary: &FinalSummary) -> String {
    if summary.weaknesses.is_empty() {
        format!("Recommended to deepen your preparation on: {topic}")
    } else {
        format!(
            "Targets an observed development area ({}) via: {topic}",
            first_sentence(&summary.weaknesses)
        )
    }
}

fn first_sentence(text: &str) -> &str {
    match text.find(['.', '\n']) {
        Some(idx) => text[..idx].trim(),
        None => text.trim(),
    }
}

/// Parse the coach's summary JSON, tolerating markdown code fences and
/// missing keys. Unparsable replies produce a minimal summary that keeps
/// the raw text as the improvement-areas section.
pub fn parse_summary_with_fallback(text: &str) -> FinalSummary {
    let trimmed = strip_code_fences(text);
    match serde_json::from_str::<FinalSummary>(trimmed) {
        Ok(summary) => summary,
        Err(err) => {
            tracing::warn!(error = %err, "coach summary was not valid JSON, using fallback");
            FinalSummary {
                patterns_tendencies: String::new(),
                strengths: String::new(),
                weaknesses: String::new(),
                improvement_focus_areas: text.trim().to_string(),
                resource_search_topics: Vec::new(),
                recommended_resources: Vec::new(),
            }
        }
    }
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

/// Curated resources used when search yields nothing.
pub fn fallback_resources() -> Vec<RecommendedResource> {
    vec![
        RecommendedResource {
            title: "STAR Method: The Complete Guide".to_string(),
            url: "https://www.themuse.com/advice/star-interview-method".to_string(),
            description: "How to structure behavioral answers with situation, task, action, result."
                .to_string(),
            resource_type: "article".to_string(),
            reasoning: "Structuring answers is the highest-leverage general improvement."
                .to_string(),
        },
        RecommendedResource {
            title: "Mock Interview Practice Questions".to_string(),
            url: "https://www.pramp.com/".to_string(),
            description: "Free peer-to-peer mock interview practice.".to_string(),
            resource_type: "tool".to_string(),
            reasoning: "Deliberate practice with live feedback.".to_string(),
        },
    ]
}
