//! Expert fan-out coordinator.
//!
//! Launches every configured expert concurrently and forwards each
//! completion the moment it settles — delivery order is completion order,
//! not launch order. A single expert's failure is isolated as a
//! placeholder entry; only the whole roster failing fails the node.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};

use crate::clients::model::{CompletionRequest, ModelClient};
use crate::config::ExpertSpec;
use crate::engine::cancellation::CancellationToken;
use crate::engine::events::EngineEvent;
use crate::engine::state::{ExpertResult, RunState};
use crate::engine::stream::EventSender;
use crate::error::{EngineError, EngineResult};

/// One resolved expert: its roster entry plus the client it runs on.
pub(crate) struct ResolvedExpert {
    pub spec: ExpertSpec,
    pub client: Arc<dyn ModelClient>,
}

/// Run the fan-out for one round.
///
/// Appends each expert's result to `state.experts_output` in completion
/// order and emits an `expert_complete` event per expert. Returns
/// [`EngineError::AllExpertsFailed`] when no expert produced output, and
/// [`EngineError::Cancelled`] when the token is set mid-flight (dropping
/// the remaining futures aborts their in-flight calls).
pub(crate) async fn run(
    experts: &[ResolvedExpert],
    prompt: &str,
    state: &mut RunState,
    events: &EventSender,
    token: &CancellationToken,
) -> EngineResult<()> {
    if token.is_cancelled() {
        return Err(EngineError::Cancelled);
    }

    let mut in_flight: FuturesUnordered<_> = experts
        .iter()
        .map(|expert| {
            let client = Arc::clone(&expert.client);
            let name = expert.spec.name.clone();
            let request = CompletionRequest {
                system: expert.spec.perspective.clone(),
                prompt: prompt.to_string(),
                temperature: None,
                max_tokens: None,
            };
            async move {
                let model = client.model().to_string();
                match client.complete(request).await {
                    Ok(output) => ExpertResult::ok(name, model, output),
                    Err(e) => {
                        tracing::warn!(expert = %name, error = %e, "expert failed");
                        ExpertResult::failed(name, model, e.to_string())
                    }
                }
            }
        })
        .collect();

    let mut failures = 0usize;
    while !in_flight.is_empty() {
        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(EngineError::Cancelled),
            Some(result) = in_flight.next() => {
                if result.is_failure() {
                    failures += 1;
                }
                state.record_expert(result.clone());
                events.send(EngineEvent::expert_complete(result)).await?;
            }
        }
    }

    if !experts.is_empty() && failures == experts.len() {
        return Err(EngineError::AllExpertsFailed { count: failures });
    }
    Ok(())
}
