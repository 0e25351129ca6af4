//! Run state: the single mutable accumulator for one reasoning run.
//!
//! The state is exclusively owned by the orchestrator's driver task.
//! Nodes receive read access and hand results back by value; nothing else
//! ever holds a mutable handle, so fan-out completions cannot race.

use serde::{Deserialize, Serialize};

/// One ranked web search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Page title.
    pub title: String,
    /// Page URL.
    pub url: String,
    /// Short excerpt of the page content.
    pub snippet: String,
}

/// The outcome of one expert invocation.
///
/// A failed expert still produces an entry — with `output: null` and an
/// `error` message — so the fan-out's result set always has one entry per
/// configured expert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpertResult {
    /// Expert identity from the roster.
    pub name: String,
    /// Model the expert ran on.
    pub model: String,
    /// The expert's answer, or `None` when the call failed.
    pub output: Option<String>,
    /// Failure message for a failed expert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExpertResult {
    /// A successful expert result.
    pub fn ok(name: impl Into<String>, model: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            output: Some(output.into()),
            error: None,
        }
    }

    /// A placeholder entry for a failed expert.
    pub fn failed(
        name: impl Into<String>,
        model: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            output: None,
            error: Some(error.into()),
        }
    }

    /// Whether this entry records a failure.
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Accumulated state for one run.
#[derive(Debug, Default)]
pub struct RunState {
    /// Results from the most recently completed research node, if any.
    pub search_results: Option<Vec<SearchResult>>,
    /// Expert results for the current round, in completion order.
    pub experts_output: Vec<ExpertResult>,
    /// The final synthesized answer; assigned exactly once, on the path
    /// to the `complete` event.
    pub final_output: Option<String>,
}

impl RunState {
    /// Reset per-round state. Expert output from a previous round must not
    /// leak into the next round's aggregation; search results carry over
    /// until the next research node replaces them.
    pub fn begin_round(&mut self) {
        self.experts_output.clear();
    }

    /// Append one expert result in completion order.
    pub fn record_expert(&mut self, result: ExpertResult) {
        self.experts_output.push(result);
    }
}
