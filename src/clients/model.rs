//! Model completion clients.
//!
//! [`ModelClient`] is the trait the engine fans work out against;
//! [`OpenAiClient`] is the production implementation, speaking the
//! OpenAI-compatible chat-completions protocol over `reqwest`.
//!
//! Retry with exponential backoff on rate limits, server errors, and
//! transport failures lives here, inside the client — the engine core
//! never retries.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{EngineError, EngineResult};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default number of retries on transient failures.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// The `(model, credential, endpoint)` tuple that identifies one client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model identifier, e.g. `gpt-4o-mini`.
    pub model: String,
    /// Bearer credential for the endpoint.
    pub api_key: String,
    /// OpenAI-compatible base URL, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
}

/// One completion request: a system prompt plus a user prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// System prompt (the expert's perspective or the synthesis charter).
    pub system: String,
    /// User prompt carrying the query and accumulated context.
    pub prompt: String,
    /// Optional sampling temperature.
    pub temperature: Option<f64>,
    /// Optional completion token cap.
    pub max_tokens: Option<u32>,
}

/// A client capable of one model completion call.
///
/// Implementations must be cheap to clone behind an `Arc` and safe to
/// call concurrently; the fan-out coordinator invokes several at once.
#[async_trait]
pub trait ModelClient: Send + Sync + fmt::Debug {
    /// The model identifier this client is bound to.
    fn model(&self) -> &str;

    /// Perform one completion call and return the assistant text.
    async fn complete(&self, request: CompletionRequest) -> EngineResult<String>;
}

/// OpenAI-compatible chat-completions client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    spec: ModelSpec,
    http: reqwest::Client,
    max_retries: u32,
}

impl OpenAiClient {
    /// Build a client for the given spec.
    ///
    /// Fails eagerly with [`EngineError::MissingCredential`] when no API
    /// key is present, so a misconfigured run never starts.
    pub fn new(spec: ModelSpec) -> EngineResult<Self> {
        if spec.api_key.is_empty() {
            return Err(EngineError::MissingCredential {
                model: spec.model.clone(),
            });
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| EngineError::Model {
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            spec,
            http,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Override the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.spec.base_url.trim_end_matches('/')
        )
    }

    fn build_request_body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": self.spec.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.prompt},
            ],
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }

    fn extract_content(response: &Value) -> EngineResult<String> {
        response["choices"]
            .get(0)
            .and_then(|choice| choice["message"]["content"].as_str())
            .map(str::to_string)
            .ok_or_else(|| EngineError::Model {
                message: format!("response missing choices[0].message.content: {}", response),
            })
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.spec.model
    }

    async fn complete(&self, request: CompletionRequest) -> EngineResult<String> {
        log::debug!(
            "OpenAiClient.complete: model={}, prompt_chars={}",
            self.spec.model,
            request.prompt.len(),
        );

        let body = self.build_request_body(&request);
        let endpoint = self.endpoint();

        let mut last_error = String::from("no attempts made");
        let mut retry_delay = Duration::from_secs(1);

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                log::warn!(
                    "model call retry attempt {} after {:?}: {}",
                    attempt,
                    retry_delay,
                    last_error
                );
                tokio::time::sleep(retry_delay).await;
                retry_delay *= 2;
            }

            let response = match self
                .http
                .post(&endpoint)
                .header("Content-Type", "application/json")
                .header("Authorization", format!("Bearer {}", self.spec.api_key))
                .json(&body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    last_error = format!("transport error: {}", e);
                    continue;
                }
            };

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                last_error = "rate limited (429)".to_string();
                continue;
            }
            if status.is_server_error() {
                last_error = format!("server error: {}", status);
                continue;
            }

            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    last_error = format!("failed to read response body: {}", e);
                    continue;
                }
            };

            if status.is_client_error() {
                // 4xx is not retryable: bad request, bad credential, etc.
                return Err(EngineError::Model {
                    message: format!("API error {}: {}", status, text),
                });
            }

            let parsed: Value = serde_json::from_str(&text).map_err(|e| EngineError::Model {
                message: format!("invalid JSON response: {}", e),
            })?;
            return Self::extract_content(&parsed);
        }

        Err(EngineError::Model {
            message: format!(
                "exhausted {} retries: {}",
                self.max_retries, last_error
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ModelSpec {
        ModelSpec {
            model: "gpt-4o-mini".to_string(),
            api_key: "sk-test".to_string(),
            base_url: "https://api.openai.com/v1/".to_string(),
        }
    }

    #[test]
    fn test_missing_credential_fails_eagerly() {
        let result = OpenAiClient::new(ModelSpec {
            api_key: String::new(),
            ..spec()
        });
        assert!(matches!(
            result,
            Err(EngineError::MissingCredential { .. })
        ));
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let client = OpenAiClient::new(spec()).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let client = OpenAiClient::new(spec()).unwrap();
        let body = client.build_request_body(&CompletionRequest {
            system: "be brief".to_string(),
            prompt: "What is 2+2?".to_string(),
            temperature: Some(0.2),
            max_tokens: None,
        });
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "What is 2+2?");
        assert_eq!(body["temperature"], 0.2);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_extract_content() {
        let response = json!({
            "choices": [{"message": {"role": "assistant", "content": "4"}}]
        });
        assert_eq!(OpenAiClient::extract_content(&response).unwrap(), "4");

        let empty = json!({"choices": []});
        assert!(OpenAiClient::extract_content(&empty).is_err());
    }
}
