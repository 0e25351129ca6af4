//! Synthesis node: fold expert answers and evidence into one output and
//! decide whether another round is warranted.

use crate::clients::model::{CompletionRequest, ModelClient};
use crate::engine::cancellation::CancellationToken;
use crate::engine::state::RunState;
use crate::error::{EngineError, EngineResult};
use crate::prompts;

/// What synthesis produced for one round.
pub(crate) struct SynthesisOutcome {
    /// The (draft or final) answer, with any verdict trailer stripped.
    pub output: String,
    /// Whether the run should stop after this round. Always true on the
    /// last permitted round, regardless of the model's own verdict.
    pub is_final: bool,
}

/// Run the synthesis node. A model failure here fails the round and the
/// run; cancellation aborts the in-flight call.
pub(crate) async fn run(
    client: &dyn ModelClient,
    query: &str,
    state: &RunState,
    last_round: bool,
    token: &CancellationToken,
) -> EngineResult<SynthesisOutcome> {
    if token.is_cancelled() {
        return Err(EngineError::Cancelled);
    }

    let request = CompletionRequest {
        system: prompts::synthesis_system(),
        prompt: prompts::synthesis_prompt(
            query,
            &state.experts_output,
            state.search_results.as_deref(),
            last_round,
        ),
        temperature: None,
        max_tokens: None,
    };

    let raw = tokio::select! {
        biased;
        _ = token.cancelled() => return Err(EngineError::Cancelled),
        result = client.complete(request) => result?,
    };

    let (output, verdict_final) = prompts::parse_verdict(&raw);
    Ok(SynthesisOutcome {
        output,
        is_final: last_round || verdict_final,
    })
}
