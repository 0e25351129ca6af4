//! Axum route handlers for the deepcouncil server.
//!
//! # Routes
//!
//! - `GET /health` — Returns `{"status": "ok", "version": …}`
//! - `GET /ws`     — WebSocket session: accepts `{"type":"query", …}` and
//!   `{"type":"cancel"}` messages, streams engine events back as JSON
//!   text frames

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::clients::cache::ModelClientFactory;
use crate::clients::search::SearchClient;
use crate::config::{EngineConfig, RunConfig};
use crate::engine::events::EngineEvent;
use crate::engine::stream::EventStream;
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};

/// Upper bound on one inbound WebSocket frame. Anything larger is
/// rejected by the socket layer before it reaches the session handler.
const MAX_WS_MESSAGE_BYTES: usize = 64 * 1024;

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// Process-wide engine configuration.
    pub config: EngineConfig,
    /// Injected model-client factory/cache.
    pub clients: Arc<dyn ModelClientFactory>,
    /// Injected search client.
    pub search: Arc<dyn SearchClient>,
    /// When this server process came up, for the health probe.
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        config: EngineConfig,
        clients: Arc<dyn ModelClientFactory>,
        search: Arc<dyn SearchClient>,
    ) -> Self {
        Self {
            config,
            clients,
            search,
            started_at: chrono::Utc::now(),
        }
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /health — liveness probe.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = chrono::Utc::now() - state.started_at;
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "deepcouncil",
        "uptime_secs": uptime.num_seconds().max(0),
    }))
}

/// GET /ws — upgrade to a query session.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.max_message_size(MAX_WS_MESSAGE_BYTES)
        .on_upgrade(move |socket| handle_session(socket, state))
}

/// Messages a client may send over the WebSocket.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ClientMessage {
    /// Start a run. Per-run config fields ride alongside the query.
    Query {
        query: String,
        #[serde(flatten)]
        config: RunConfig,
    },
    /// Abort the active run, if any.
    Cancel,
}

/// Validate a query before it reaches the engine. Primary validation
/// happens here, at the transport boundary; the engine re-checks
/// emptiness as a backstop.
fn validate_query(config: &EngineConfig, query: &str) -> EngineResult<()> {
    if query.trim().is_empty() {
        return Err(EngineError::EmptyQuery);
    }
    if query.chars().count() > config.max_query_chars {
        return Err(EngineError::QueryTooLong {
            limit: config.max_query_chars,
        });
    }
    Ok(())
}

async fn handle_session(socket: WebSocket, state: AppState) {
    let (sink, receiver) = socket.split();
    run_session(sink, receiver, state).await;
}

/// Drive one session over any frame transport.
///
/// At most one run is active per session: a `query` while a run is in
/// flight is rejected with an `error` frame, matching the engine's own
/// one-run-per-instance rule. Client disconnect aborts the active run so
/// no in-flight work is leaked.
///
/// Generic over the sink/stream pair so the loop can be exercised with
/// in-memory channels as well as a real socket.
async fn run_session<S, R, E>(mut sink: S, mut receiver: R, state: AppState)
where
    S: Sink<WsMessage> + Unpin,
    R: Stream<Item = Result<WsMessage, E>> + Unpin,
{
    let mut engine: Option<Arc<Engine>> = None;
    let mut events: Option<EventStream> = None;

    loop {
        if let Some(stream) = events.as_mut() {
            let mut run_done = false;
            tokio::select! {
                event = stream.next_event() => match event {
                    Some(event) => {
                        if !forward_event(&mut sink, &event).await {
                            abort_active(&engine);
                            return;
                        }
                    }
                    None => run_done = true,
                },
                incoming = receiver.next() => match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Cancel) => abort_active(&engine),
                            Ok(ClientMessage::Query { .. }) => {
                                if !send_error(&mut sink, "a run is already in progress").await {
                                    abort_active(&engine);
                                    return;
                                }
                            }
                            Err(e) => {
                                if !send_error(&mut sink, format!("invalid message: {}", e)).await {
                                    abort_active(&engine);
                                    return;
                                }
                            }
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => {
                        abort_active(&engine);
                        return;
                    }
                    Some(Ok(_)) => {}
                },
            }
            if run_done {
                events = None;
                engine = None;
            }
        } else {
            match receiver.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(ClientMessage::Query { query, config }) => {
                            if let Err(e) = validate_query(&state.config, &query) {
                                if !send_error(&mut sink, e.to_string()).await {
                                    return;
                                }
                                continue;
                            }
                            tracing::info!(chars = query.len(), "starting run");
                            let fresh = Arc::new(Engine::new(
                                state.config.clone(),
                                Arc::clone(&state.clients),
                                Arc::clone(&state.search),
                            ));
                            events = Some(fresh.stream(query, config));
                            engine = Some(fresh);
                        }
                        // Cancel with no active run is a no-op.
                        Ok(ClientMessage::Cancel) => {}
                        Err(e) => {
                            if !send_error(&mut sink, format!("invalid message: {}", e)).await {
                                return;
                            }
                        }
                    }
                }
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => {}
            }
        }
    }
}

fn abort_active(engine: &Option<Arc<Engine>>) {
    if let Some(engine) = engine {
        engine.abort();
    }
}

/// Serialize and push one event frame. Returns false when the socket is
/// gone and the session should end.
async fn forward_event<S>(sink: &mut S, event: &EngineEvent) -> bool
where
    S: Sink<WsMessage> + Unpin,
{
    match serde_json::to_string(event) {
        Ok(json) => sink.send(WsMessage::Text(json)).await.is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize event");
            true
        }
    }
}

async fn send_error<S>(sink: &mut S, message: impl Into<String>) -> bool
where
    S: Sink<WsMessage> + Unpin,
{
    forward_event(sink, &EngineEvent::error(message)).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
