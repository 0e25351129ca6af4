//! Web search clients.
//!
//! The research node calls a [`SearchClient`] once per round.
//! [`SearxClient`] speaks the SearXNG JSON API (`?q=…&format=json`) and
//! maps each hit to a `{title, url, snippet}` result.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::engine::state::SearchResult;
use crate::error::{EngineError, EngineResult};

/// Default timeout for a search call, in seconds.
pub const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 10;

/// A client that returns a ranked list of results for a query.
#[async_trait]
pub trait SearchClient: Send + Sync + fmt::Debug {
    /// Run one search and return ranked results, best first.
    async fn search(&self, query: &str) -> EngineResult<Vec<SearchResult>>;
}

/// SearXNG-style JSON search client.
#[derive(Debug, Clone)]
pub struct SearxClient {
    endpoint: String,
    max_results: usize,
    http: reqwest::Client,
}

impl SearxClient {
    /// Build a client for the given `/search` endpoint.
    pub fn new(endpoint: impl Into<String>, max_results: usize) -> EngineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_SEARCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| EngineError::Search {
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            endpoint: endpoint.into(),
            max_results,
            http,
        })
    }

    fn parse_results(&self, body: &Value) -> Vec<SearchResult> {
        body.get("results")
            .and_then(Value::as_array)
            .map(|results| {
                results
                    .iter()
                    .take(self.max_results)
                    .map(|hit| SearchResult {
                        title: hit
                            .get("title")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        url: hit
                            .get("url")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        snippet: hit
                            .get("content")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl SearchClient for SearxClient {
    async fn search(&self, query: &str) -> EngineResult<Vec<SearchResult>> {
        let url = format!(
            "{}?q={}&format=json",
            self.endpoint.trim_end_matches('/'),
            urlencoding::encode(query)
        );
        log::debug!("SearxClient.search: {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| EngineError::Search {
                message: format!("transport error: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Search {
                message: format!("search backend returned {}", status),
            });
        }

        let body: Value = response.json().await.map_err(|e| EngineError::Search {
            message: format!("invalid JSON response: {}", e),
        })?;

        Ok(self.parse_results(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_results_maps_fields_and_truncates() {
        let client = SearxClient::new("http://localhost:8888/search", 2).unwrap();
        let body = json!({
            "results": [
                {"title": "One", "url": "https://a.test", "content": "first"},
                {"title": "Two", "url": "https://b.test", "content": "second"},
                {"title": "Three", "url": "https://c.test", "content": "third"},
            ]
        });
        let results = client.parse_results(&body);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "One");
        assert_eq!(results[1].snippet, "second");
    }

    #[test]
    fn test_parse_results_tolerates_missing_fields() {
        let client = SearxClient::new("http://localhost:8888/search", 5).unwrap();
        let body = json!({"results": [{"url": "https://a.test"}]});
        let results = client.parse_results(&body);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "");
        assert_eq!(results[0].url, "https://a.test");
    }

    #[test]
    fn test_parse_results_without_results_key() {
        let client = SearxClient::new("http://localhost:8888/search", 5).unwrap();
        assert!(client.parse_results(&json!({})).is_empty());
    }
}
