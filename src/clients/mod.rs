//! External client collaborators: model completion, client caching, and
//! web search. The engine core only sees the traits defined here; the
//! concrete HTTP implementations own timeouts and retry policy.

pub mod cache;
pub mod model;
pub mod search;

pub use cache::{CachingClientFactory, ModelClientFactory};
pub use model::{CompletionRequest, ModelClient, ModelSpec, OpenAiClient};
pub use search::{SearchClient, SearxClient};
