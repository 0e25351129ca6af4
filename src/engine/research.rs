//! Research node: one search call per round.

use crate::clients::search::SearchClient;
use crate::engine::cancellation::CancellationToken;
use crate::engine::state::SearchResult;
use crate::error::{EngineError, EngineResult};

/// Run the research node.
///
/// Returns the new search results on success. A search failure degrades
/// gracefully: the round proceeds with no results, the failure is logged,
/// and `Ok(None)` is returned so the caller leaves the previous state
/// untouched. Cancellation aborts the in-flight call.
pub(crate) async fn run(
    search: &dyn SearchClient,
    query: &str,
    token: &CancellationToken,
) -> EngineResult<Option<Vec<SearchResult>>> {
    if token.is_cancelled() {
        return Err(EngineError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(EngineError::Cancelled),
        result = search.search(query) => match result {
            Ok(results) => {
                tracing::debug!(count = results.len(), "research completed");
                Ok(Some(results))
            }
            Err(e) => {
                tracing::warn!(error = %e, "search failed; continuing without results");
                Ok(None)
            }
        },
    }
}
