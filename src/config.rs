//! Engine and per-run configuration.
//!
//! Two layers: [`EngineConfig`] holds process-wide defaults (model,
//! credential, endpoints, expert roster, limits) and is normally loaded
//! from the environment once at startup; [`RunConfig`] carries per-run
//! overrides supplied by the caller. Overrides take precedence for the
//! lifetime of one run only, and absent fields never shadow a configured
//! default — a `None` (or empty string) in the request must not overwrite
//! a process-wide value.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clients::model::ModelSpec;

/// Default upper bound on query length, in characters.
pub const DEFAULT_MAX_QUERY_CHARS: usize = 4_000;

/// Default capacity of the model-client cache.
pub const DEFAULT_CLIENT_CACHE_CAPACITY: usize = 8;

/// Default number of search results requested per research call.
pub const DEFAULT_SEARCH_MAX_RESULTS: usize = 5;

/// Per-run configuration supplied by the caller.
///
/// Field names follow the wire protocol (`maxRounds`, `defaultModel`,
/// `apiKey`, `baseUrl`, `fileContext`). Every field is optional; merge
/// semantics live in [`EngineConfig::resolve_model_spec`] and
/// [`RunConfig::max_rounds`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RunConfig {
    /// Maximum number of reasoning rounds. Absent or zero means one round.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<u32>,
    /// Model identifier overriding the process default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    /// Credential overriding the process default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// API endpoint overriding the process default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Opaque caller-supplied context blob, forwarded into expert prompts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_context: Option<Value>,
}

impl RunConfig {
    /// Effective round limit: at least one round, even when the caller
    /// omitted the field or sent a falsy value.
    pub fn max_rounds(&self) -> u32 {
        match self.max_rounds {
            Some(n) if n >= 1 => n,
            _ => 1,
        }
    }
}

/// One expert strategy within the fan-out roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpertSpec {
    /// Stable identity of the expert, used in events and results.
    pub name: String,
    /// System-prompt perspective the expert reasons from.
    pub perspective: String,
    /// Optional model override for this expert; defaults to the run's model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Process-wide engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Default model identifier for experts and synthesis.
    pub default_model: String,
    /// Default API credential. May be empty; resolution fails with a
    /// configuration error at run start if no credential is available.
    pub api_key: String,
    /// Default API endpoint (OpenAI-compatible).
    pub base_url: String,
    /// The fixed expert roster used for every round's fan-out.
    pub experts: Vec<ExpertSpec>,
    /// Upper bound on query length, enforced at the transport boundary.
    pub max_query_chars: usize,
    /// Capacity of the model-client cache.
    pub client_cache_capacity: usize,
    /// Search backend endpoint (SearXNG-style JSON API).
    pub search_endpoint: String,
    /// Number of search results requested per research call.
    pub search_max_results: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_model: "gpt-4o-mini".to_string(),
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            experts: default_experts(),
            max_query_chars: DEFAULT_MAX_QUERY_CHARS,
            client_cache_capacity: DEFAULT_CLIENT_CACHE_CAPACITY,
            search_endpoint: "http://localhost:8888/search".to_string(),
            search_max_results: DEFAULT_SEARCH_MAX_RESULTS,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment, falling back to defaults.
    ///
    /// Recognized variables: `DEEPCOUNCIL_MODEL`, `DEEPCOUNCIL_API_KEY`
    /// (falling back to `OPENAI_API_KEY`), `DEEPCOUNCIL_BASE_URL`,
    /// `DEEPCOUNCIL_SEARCH_URL`, `DEEPCOUNCIL_MAX_QUERY_CHARS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(model) = std::env::var("DEEPCOUNCIL_MODEL") {
            if !model.is_empty() {
                config.default_model = model;
            }
        }
        if let Ok(key) = std::env::var("DEEPCOUNCIL_API_KEY") {
            config.api_key = key;
        } else if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.api_key = key;
        }
        if let Ok(url) = std::env::var("DEEPCOUNCIL_BASE_URL") {
            if !url.is_empty() {
                config.base_url = url;
            }
        }
        if let Ok(url) = std::env::var("DEEPCOUNCIL_SEARCH_URL") {
            if !url.is_empty() {
                config.search_endpoint = url;
            }
        }
        if let Ok(limit) = std::env::var("DEEPCOUNCIL_MAX_QUERY_CHARS") {
            if let Ok(limit) = limit.parse() {
                config.max_query_chars = limit;
            }
        }
        config
    }

    /// Resolve the model spec for one client, applying override precedence:
    /// expert-level model override, then run-level override, then the
    /// process default. Empty strings count as absent.
    pub fn resolve_model_spec(&self, run: &RunConfig, expert_model: Option<&str>) -> ModelSpec {
        let model = expert_model
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .or_else(|| run.default_model.clone().filter(|m| !m.is_empty()))
            .unwrap_or_else(|| self.default_model.clone());
        let api_key = run
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| self.api_key.clone());
        let base_url = run
            .base_url
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.base_url.clone());
        ModelSpec {
            model,
            api_key,
            base_url,
        }
    }
}

/// The default three-perspective expert roster.
fn default_experts() -> Vec<ExpertSpec> {
    vec![
        ExpertSpec {
            name: "first_principles".to_string(),
            perspective: "You reason strictly from first principles. Decompose the question \
                          into its fundamental parts, reason about each part independently, \
                          and build the answer back up from those foundations."
                .to_string(),
            model: None,
        },
        ExpertSpec {
            name: "devils_advocate".to_string(),
            perspective: "You are a rigorous devil's advocate. Identify the obvious answer, \
                          then attack it: surface hidden assumptions, edge cases, and the \
                          strongest counter-arguments before stating your own conclusion."
                .to_string(),
            model: None,
        },
        ExpertSpec {
            name: "empiricist".to_string(),
            perspective: "You are a strict empiricist. Ground every claim in the evidence \
                          provided (search results and supplied context), cite which piece \
                          of evidence supports each step, and flag anything unsupported."
                .to_string(),
            model: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_rounds_defaults_to_one() {
        assert_eq!(RunConfig::default().max_rounds(), 1);
        let zero = RunConfig {
            max_rounds: Some(0),
            ..Default::default()
        };
        assert_eq!(zero.max_rounds(), 1);
        let three = RunConfig {
            max_rounds: Some(3),
            ..Default::default()
        };
        assert_eq!(three.max_rounds(), 3);
    }

    #[test]
    fn test_run_config_wire_names() {
        let json = serde_json::json!({
            "maxRounds": 2,
            "defaultModel": "gpt-4o",
            "apiKey": "sk-test",
            "baseUrl": "https://example.test/v1",
            "fileContext": {"name": "notes.txt"},
        });
        let config: RunConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.max_rounds, Some(2));
        assert_eq!(config.default_model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.base_url.as_deref(), Some("https://example.test/v1"));
        assert!(config.file_context.is_some());
    }

    #[test]
    fn test_absent_overrides_do_not_shadow_defaults() {
        let engine = EngineConfig {
            default_model: "default-model".to_string(),
            api_key: "default-key".to_string(),
            base_url: "https://default.test/v1".to_string(),
            ..Default::default()
        };
        let spec = engine.resolve_model_spec(&RunConfig::default(), None);
        assert_eq!(spec.model, "default-model");
        assert_eq!(spec.api_key, "default-key");
        assert_eq!(spec.base_url, "https://default.test/v1");

        // Empty strings count as absent too.
        let run = RunConfig {
            api_key: Some(String::new()),
            ..Default::default()
        };
        let spec = engine.resolve_model_spec(&run, None);
        assert_eq!(spec.api_key, "default-key");
    }

    #[test]
    fn test_override_precedence() {
        let engine = EngineConfig {
            default_model: "default-model".to_string(),
            ..Default::default()
        };
        let run = RunConfig {
            default_model: Some("run-model".to_string()),
            ..Default::default()
        };
        assert_eq!(engine.resolve_model_spec(&run, None).model, "run-model");
        assert_eq!(
            engine.resolve_model_spec(&run, Some("expert-model")).model,
            "expert-model"
        );
    }

    #[test]
    fn test_default_roster_has_three_distinct_experts() {
        let config = EngineConfig::default();
        assert_eq!(config.experts.len(), 3);
        let names: Vec<_> = config.experts.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["first_principles", "devils_advocate", "empiricist"]
        );
    }
}
