//! # deepcouncil
//!
//! A streaming multi-expert reasoning engine. A client submits a
//! natural-language query; the engine runs up to a configured number of
//! rounds of research, parallel "expert" model invocations, and
//! synthesis, emitting typed progress events through a lazy, pull-based
//! stream. Runs are cancellable mid-flight without leaking in-flight
//! work.
//!
//! The orchestration core lives in [`engine`]; model and search backends
//! are injected through the traits in [`clients`]; [`server`] adapts the
//! event stream onto a WebSocket transport.

pub mod clients;
pub mod config;
pub mod engine;
pub mod error;
pub mod prompts;
pub mod server;

pub use clients::{
    CachingClientFactory, CompletionRequest, ModelClient, ModelClientFactory, ModelSpec,
    OpenAiClient, SearchClient, SearxClient,
};
pub use config::{EngineConfig, ExpertSpec, RunConfig};
pub use engine::cancellation::CancellationToken;
pub use engine::events::{CompleteData, EngineEvent, NodeId, NodeStatus};
pub use engine::state::{ExpertResult, RunState, SearchResult};
pub use engine::stream::EventStream;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
