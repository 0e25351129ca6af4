//! Round controller: drives Research → Fan-out → Synthesis for one round.
//!
//! Ordering within a round is strict: research fully completes (including
//! its completion event) before the fan-out starts, and the fan-out's
//! completion event precedes the synthesis start event. The cancellation
//! token is checked between every stage.

use std::sync::Arc;

use serde_json::json;

use crate::clients::model::ModelClient;
use crate::clients::search::SearchClient;
use crate::engine::cancellation::CancellationToken;
use crate::engine::events::{EngineEvent, NodeId};
use crate::engine::fanout::{self, ResolvedExpert};
use crate::engine::research;
use crate::engine::state::RunState;
use crate::engine::stream::EventSender;
use crate::engine::synthesis;
use crate::error::{EngineError, EngineResult};
use crate::prompts;

/// Whether the orchestrator should run another round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RoundDecision {
    /// Synthesis judged its output provisional and rounds remain.
    Continue,
    /// Synthesis converged (or the round budget is exhausted).
    Stop,
}

/// Everything one round produces for the orchestrator.
pub(crate) struct RoundOutcome {
    pub decision: RoundDecision,
    /// The round's synthesized answer, fed to the next round as the prior
    /// draft or promoted to the final output.
    pub draft: String,
}

/// Executes rounds against a fixed set of resolved clients.
pub(crate) struct RoundController {
    pub experts: Vec<ResolvedExpert>,
    pub synthesis_client: Arc<dyn ModelClient>,
    pub search: Arc<dyn SearchClient>,
    pub file_context: Option<serde_json::Value>,
}

impl RoundController {
    /// Run one round, emitting start/complete events around each stage.
    pub(crate) async fn run_round(
        &self,
        round: u32,
        last_round: bool,
        query: &str,
        prior_draft: Option<&str>,
        state: &mut RunState,
        events: &EventSender,
        token: &CancellationToken,
    ) -> EngineResult<RoundOutcome> {
        state.begin_round();

        // --- Research ---
        if token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        events
            .send(EngineEvent::node_started(
                NodeId::Search,
                json!({"query": query, "round": round}),
            ))
            .await?;
        match research::run(self.search.as_ref(), query, token).await? {
            Some(results) => {
                state.search_results = Some(results.clone());
                events
                    .send(EngineEvent::node_completed_with_results(
                        NodeId::Search,
                        results,
                    ))
                    .await?;
            }
            None => {
                // Search failed; the round proceeds without fresh evidence.
                events.send(EngineEvent::node_completed(NodeId::Search)).await?;
            }
        }

        // --- Expert fan-out ---
        if token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        events
            .send(EngineEvent::node_started(
                NodeId::Experts,
                json!({"round": round, "count": self.experts.len()}),
            ))
            .await?;
        let expert_prompt = prompts::expert_prompt(
            query,
            state.search_results.as_deref(),
            self.file_context.as_ref(),
            prior_draft,
        );
        fanout::run(&self.experts, &expert_prompt, state, events, token).await?;
        events.send(EngineEvent::node_completed(NodeId::Experts)).await?;

        // --- Synthesis ---
        if token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        events
            .send(EngineEvent::node_started(
                NodeId::Synthesis,
                json!({"round": round}),
            ))
            .await?;
        let outcome =
            synthesis::run(self.synthesis_client.as_ref(), query, state, last_round, token).await?;
        events
            .send(EngineEvent::node_completed(NodeId::Synthesis))
            .await?;

        tracing::debug!(round, is_final = outcome.is_final, "round finished");
        Ok(RoundOutcome {
            decision: if outcome.is_final {
                RoundDecision::Stop
            } else {
                RoundDecision::Continue
            },
            draft: outcome.output,
        })
    }
}
