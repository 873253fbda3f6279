//! Serper.dev web search client.
//!
//! Implements [`SearchClient`] over the Serper JSON API; used by the
//! coach for learning-resource recommendations.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use rehearse_core::clients::{SearchClient, SearchHit};
use rehearse_types::error::SearchError;

const DEFAULT_BASE_URL: &str = "https://google.serper.dev";

/// Serper search client.
pub struct SerperClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl SerperClient {
    pub fn new(api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
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
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    num: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

fn to_hits(response: SearchResponse, max_results: usize) -> Vec<SearchHit> {
    response
        .organic
        .into_iter()
        .take(max_results)
        .map(|result| SearchHit {
            resource_type: Some(classify_url(&result.link)),
            title: result.title,
            url: result.link,
            snippet: result.snippet,
        })
        .collect()
}

/// Coarse resource-type tag from the URL host.
fn classify_url(url: &str) -> String {
    if url.contains("youtube.com") || url.contains("youtu.be") {
        "video".to_string()
    } else if url.contains("coursera.org")
        || url.contains("udemy.com")
        || url.contains("edx.org")
    {
        "course".to_string()
    } else {
        "article".to_string()
    }
}

impl SearchClient for SerperClient {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("X-API-KEY", self.api_key.expose_secret())
            .header("content-type", "application/json")
            .json(&SearchRequest {
                q: query,
                num: max_results,
            })
            .send()
            .await
            .map_err(|e| SearchError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SearchError::Http(format!(
                "search returned {}",
                response.status()
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;
        Ok(to_hits(parsed, max_results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_map_results() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"organic":[
                {"title":"STAR guide","link":"https://example.com/star","snippet":"How to"},
                {"title":"Video walkthrough","link":"https://youtube.com/watch?v=1","snippet":"Watch"},
                {"title":"Course","link":"https://coursera.org/x","snippet":"Learn"}
            ]}"#,
        )
        .unwrap();
        let hits = to_hits(response, 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].resource_type.as_deref(), Some("article"));
        assert_eq!(hits[1].resource_type.as_deref(), Some("video"));
    }

    #[test]
    fn test_missing_organic_is_empty() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(to_hits(response, 5).is_empty());
    }

    #[test]
    fn test_classify_url() {
        assert_eq!(classify_url("https://udemy.com/course"), "course");
        assert_eq!(classify_url("https://youtu.be/abc"), "video");
        assert_eq!(classify_url("https://blog.example.com"), "article");
    }
}
