//! The reasoning engine.
//!
//! An [`Engine`] owns one run: it drives up to `max_rounds` rounds of
//! Research → Expert fan-out → Synthesis, accumulating into a single
//! [`RunState`](state::RunState) and emitting [`EngineEvent`]s through a
//! pull-based [`EventStream`]. Exactly one terminal event is emitted per
//! run — `complete` on success, `error` on failure — and cancellation
//! ends the stream with neither.
//!
//! Engines are single-use: one `stream()` call per instance, a fresh
//! engine per run.

pub mod cancellation;
pub mod events;
pub mod state;
pub mod stream;

mod fanout;
mod research;
mod round;
mod synthesis;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::clients::cache::ModelClientFactory;
use crate::clients::search::SearchClient;
use crate::config::{EngineConfig, RunConfig};
use crate::error::{EngineError, EngineResult};

use cancellation::CancellationToken;
use events::EngineEvent;
use fanout::ResolvedExpert;
use round::{RoundController, RoundDecision};
use state::RunState;
use stream::{EventSender, EventStream};

/// Terminal status of a run. `Completed` is the only status that carries
/// a `complete` event; `Aborted` ends the stream silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunStatus {
    Completed,
    Aborted,
    Failed,
}

/// A single-run, cancellable reasoning engine.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    clients: Arc<dyn ModelClientFactory>,
    search: Arc<dyn SearchClient>,
    token: CancellationToken,
    started: AtomicBool,
    run_id: uuid::Uuid,
}

impl Engine {
    /// Build an engine from process configuration and injected client
    /// collaborators.
    pub fn new(
        config: EngineConfig,
        clients: Arc<dyn ModelClientFactory>,
        search: Arc<dyn SearchClient>,
    ) -> Self {
        Self {
            config,
            clients,
            search,
            token: CancellationToken::new(),
            started: AtomicBool::new(false),
            run_id: uuid::Uuid::new_v4(),
        }
    }

    /// Unique identifier for this engine's run, for log correlation.
    pub fn run_id(&self) -> uuid::Uuid {
        self.run_id
    }

    /// Request cancellation of the run.
    ///
    /// Idempotent and safe at any time: before the run starts, mid-flight,
    /// or after it has ended. After cancellation takes effect the stream
    /// ends without a `complete` event.
    pub fn abort(&self) {
        self.token.cancel();
    }

    /// Start the run and return its event stream.
    ///
    /// The stream is lazy and pull-based: the driver suspends between
    /// events, so the consumer's pace bounds the engine's. Calling
    /// `stream` a second time on the same engine yields a stream with a
    /// single terminal `error` event.
    pub fn stream(&self, query: impl Into<String>, run_config: RunConfig) -> EventStream {
        let (events, event_stream) = stream::channel();

        if self.started.swap(true, Ordering::SeqCst) {
            tokio::spawn(async move {
                let _ = events
                    .send(EngineEvent::error(EngineError::AlreadyStarted.to_string()))
                    .await;
            });
            return event_stream;
        }

        let config = self.config.clone();
        let clients = Arc::clone(&self.clients);
        let search = Arc::clone(&self.search);
        let token = self.token.clone();
        let query = query.into();
        let run_id = self.run_id;

        tokio::spawn(async move {
            drive(
                run_id, config, clients, search, token, events, query, run_config,
            )
            .await;
        });

        event_stream
    }
}

/// Top-level driver: runs the pipeline and enforces the terminal-event
/// invariant (exactly one `complete` or `error`, nothing on cancellation).
#[allow(clippy::too_many_arguments)]
async fn drive(
    run_id: uuid::Uuid,
    config: EngineConfig,
    clients: Arc<dyn ModelClientFactory>,
    search: Arc<dyn SearchClient>,
    token: CancellationToken,
    events: EventSender,
    query: String,
    run_config: RunConfig,
) {
    let status = match run_to_completion(
        &config,
        clients.as_ref(),
        search,
        &token,
        &events,
        &query,
        &run_config,
    )
    .await
    {
        Ok(()) => RunStatus::Completed,
        Err(e) if e.is_cancellation() => RunStatus::Aborted,
        Err(e) => {
            // The consumer may already be gone; nothing to do if so.
            let _ = events.send(EngineEvent::error(e.to_string())).await;
            RunStatus::Failed
        }
    };
    tracing::info!(run_id = %run_id, ?status, "run ended");
}

/// Run the pipeline to its natural end.
///
/// Returns `Ok(())` only after the `complete` event has been delivered;
/// every other outcome is an error, with [`EngineError::Cancelled`]
/// marking the silent-termination path.
async fn run_to_completion(
    config: &EngineConfig,
    clients: &dyn ModelClientFactory,
    search: Arc<dyn SearchClient>,
    token: &CancellationToken,
    events: &EventSender,
    query: &str,
    run_config: &RunConfig,
) -> EngineResult<()> {
    let query = query.trim();
    if query.is_empty() {
        return Err(EngineError::EmptyQuery);
    }

    // Resolve every model client up front so configuration errors surface
    // before any node starts.
    let experts = config
        .experts
        .iter()
        .map(|spec| {
            let model_spec = config.resolve_model_spec(run_config, spec.model.as_deref());
            Ok(ResolvedExpert {
                spec: spec.clone(),
                client: clients.client(&model_spec)?,
            })
        })
        .collect::<EngineResult<Vec<_>>>()?;
    let synthesis_client = clients.client(&config.resolve_model_spec(run_config, None))?;

    let controller = RoundController {
        experts,
        synthesis_client,
        search,
        file_context: run_config.file_context.clone(),
    };

    let max_rounds = run_config.max_rounds();
    let mut state = RunState::default();
    let mut draft: Option<String> = None;

    for round in 1..=max_rounds {
        if token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let last_round = round == max_rounds;
        tracing::debug!(round, max_rounds, "starting round");

        let outcome = controller
            .run_round(
                round,
                last_round,
                query,
                draft.as_deref(),
                &mut state,
                events,
                token,
            )
            .await?;
        draft = Some(outcome.draft);

        if outcome.decision == RoundDecision::Stop {
            break;
        }
    }

    if token.is_cancelled() {
        return Err(EngineError::Cancelled);
    }

    tracing::debug!("finalizing run");
    state.final_output = draft;
    events.send(EngineEvent::complete(&state)).await?;
    Ok(())
}
