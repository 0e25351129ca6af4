//! Typed progress events.
//!
//! Events are the only channel through which the engine's internal state
//! becomes observable. They are immutable, emitted in order, and their
//! serialized shapes are part of the wire protocol consumed by clients —
//! the rename attributes below are load-bearing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::state::{ExpertResult, RunState, SearchResult};

/// Identity of a pipeline node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeId {
    /// The research node.
    Search,
    /// The expert fan-out.
    Experts,
    /// The synthesis node.
    Synthesis,
}

/// Lifecycle status of a node within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// The node has started.
    Started,
    /// The node has completed.
    Completed,
}

/// Payload of the terminal `complete` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteData {
    /// The final synthesized answer.
    pub final_output: String,
    /// Expert results from the last round, in completion order.
    pub experts: Vec<ExpertResult>,
    /// Results from the last completed research node.
    #[serde(rename = "searchResults")]
    pub search_results: Vec<SearchResult>,
}

/// One unit of observable progress.
///
/// Wire shapes:
///
/// ```json
/// { "type": "state_update", "node": "search", "status": "started", "data": {…} }
/// { "type": "state_update", "node": "search", "status": "completed", "searchResults": […] }
/// { "type": "expert_complete", "data": {…} }
/// { "type": "complete", "data": { "final_output": …, "experts": […], "searchResults": […] } }
/// { "type": "error", "message": "…" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A node started or completed.
    StateUpdate {
        /// Which node.
        node: NodeId,
        /// Started or completed.
        status: NodeStatus,
        /// Start payload; absent on completion.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        /// Search results, present only on research completion with results.
        #[serde(
            rename = "searchResults",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        search_results: Option<Vec<SearchResult>>,
    },
    /// One expert finished; carries that expert's result.
    ExpertComplete {
        /// The expert's result (or failure placeholder).
        data: ExpertResult,
    },
    /// Terminal success event; exactly one per successful run.
    Complete {
        /// Accumulated run output.
        data: CompleteData,
    },
    /// Terminal failure event; exactly one per failed run.
    Error {
        /// Human-readable failure description.
        message: String,
    },
}

impl EngineEvent {
    /// A `NodeStart` event.
    pub fn node_started(node: NodeId, data: Value) -> Self {
        EngineEvent::StateUpdate {
            node,
            status: NodeStatus::Started,
            data: Some(data),
            search_results: None,
        }
    }

    /// A `NodeComplete` event without a results payload.
    pub fn node_completed(node: NodeId) -> Self {
        EngineEvent::StateUpdate {
            node,
            status: NodeStatus::Completed,
            data: None,
            search_results: None,
        }
    }

    /// A `NodeComplete` event for the research node carrying its results.
    pub fn node_completed_with_results(node: NodeId, results: Vec<SearchResult>) -> Self {
        EngineEvent::StateUpdate {
            node,
            status: NodeStatus::Completed,
            data: None,
            search_results: Some(results),
        }
    }

    /// An `ExpertComplete` event.
    pub fn expert_complete(result: ExpertResult) -> Self {
        EngineEvent::ExpertComplete { data: result }
    }

    /// The terminal `complete` event, snapshotting the run state.
    pub fn complete(state: &RunState) -> Self {
        EngineEvent::Complete {
            data: CompleteData {
                final_output: state.final_output.clone().unwrap_or_default(),
                experts: state.experts_output.clone(),
                search_results: state.search_results.clone().unwrap_or_default(),
            },
        }
    }

    /// A terminal `error` event.
    pub fn error(message: impl Into<String>) -> Self {
        EngineEvent::Error {
            message: message.into(),
        }
    }

    /// Whether this event terminates the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineEvent::Complete { .. } | EngineEvent::Error { .. })
    }
}
