//! Error types for the deepcouncil engine.
//!
//! The taxonomy mirrors the failure classes the engine distinguishes at
//! runtime: input problems caught before any work starts, configuration
//! problems raised while resolving model clients, per-node failures, and
//! cooperative cancellation (which is not an error from the caller's point
//! of view but uses the same unwinding path internally).

use thiserror::Error;

/// Errors produced while driving a reasoning run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The query was empty after trimming.
    #[error("query must not be empty")]
    EmptyQuery,

    /// The query exceeded the configured character limit.
    #[error("query exceeds the maximum length of {limit} characters")]
    QueryTooLong { limit: usize },

    /// No API key was available when constructing a model client.
    #[error("no API key configured for model '{model}'; set DEEPCOUNCIL_API_KEY or pass apiKey with the request")]
    MissingCredential { model: String },

    /// A model completion call failed after the client exhausted its retries.
    #[error("model call failed: {message}")]
    Model { message: String },

    /// The search backend call failed.
    #[error("search call failed: {message}")]
    Search { message: String },

    /// Every expert in a round's fan-out failed.
    #[error("all {count} experts failed this round")]
    AllExpertsFailed { count: usize },

    /// The run was cancelled via `Engine::abort` or by the consumer
    /// dropping the event stream.
    #[error("run cancelled")]
    Cancelled,

    /// `stream()` was called on an engine that already ran.
    #[error("engine already consumed; create a fresh engine per run")]
    AlreadyStarted,
}

impl EngineError {
    /// Whether this error represents cooperative cancellation rather than
    /// a real failure. Cancellation ends the stream silently instead of
    /// producing a terminal error event.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }
}

/// Convenience alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;
