//! HTTP/WebSocket transport for the deepcouncil engine.
//!
//! The transport is deliberately thin glue: it guards input (empty or
//! oversized queries, one run at a time per session), constructs a fresh
//! [`Engine`](crate::engine::Engine) per query, adapts the engine's
//! pull-based event stream onto WebSocket frames, and forwards `cancel`
//! messages to `abort()`.
//!
//! # Endpoints
//!
//! - `GET /health` — liveness probe
//! - `GET /ws`     — WebSocket query session

pub mod routes;

pub use routes::{app_router, AppState};
