//! Final coaching summary produced when a session completes.

use serde::{Deserialize, Serialize};

/// One recommended external learning resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedResource {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    /// Coarse tag such as "course", "article", or "video".
    #[serde(default)]
    pub resource_type: String,
    /// Why this resource was recommended for this candidate.
    #[serde(default)]
    pub reasoning: String,
}

/// Terminal coach artifact: observed patterns, strengths/weaknesses,
/// prioritized improvement areas, and recommended resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalSummary {
    #[serde(default)]
    pub patterns_tendencies: String,
    #[serde(default)]
    pub strengths: String,
    #[serde(default)]
    pub weaknesses: String,
    #[serde(default)]
    pub improvement_focus_areas: String,
    /// Search topics derived from the weaknesses; drives resource search.
    #[serde(default)]
    pub resource_search_topics: Vec<String>,
    #[serde(default)]
    pub recommended_resources: Vec<RecommendedResource>,
}

/// Observable state of final-summary generation for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SummaryStatus {
    /// Generation is in flight (or the session just completed).
    Generating,
    /// Generation finished; results are available.
    Completed { results: Box<FinalSummary> },
    /// Generation failed terminally.
    Error { error: String },
}

impl SummaryStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, SummaryStatus::Completed { .. })
    }
}

/// Persisted terminal result of summary generation.
///
/// Distinct from [`SummaryStatus`]: an in-flight generation is never
/// persisted, so this enum has no "generating" variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum SummaryOutcome {
    Completed(FinalSummary),
    Error { message: String },
}

impl SummaryOutcome {
    /// Project the outcome into the observable status vocabulary.
    pub fn to_status(&self) -> SummaryStatus {
        match self {
            SummaryOutcome::Completed(summary) => SummaryStatus::Completed {
                results: Box::new(summary.clone()),
            },
            SummaryOutcome::Error { message } => SummaryStatus::Error {
                error: message.clone(),
            },
        }
    }
}
