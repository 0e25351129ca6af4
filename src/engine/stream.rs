//! Pull-based event streaming.
//!
//! The engine's driver task pushes events into a bounded channel of depth
//! one; [`EventStream`] is the consumer's end, exposed as a
//! `futures::Stream`. Because the channel holds at most one event, the
//! producer suspends until the consumer pulls — a slow consumer
//! back-pressures the whole pipeline without any explicit buffer policy.
//!
//! If the consumer drops the stream, sends fail and the driver unwinds
//! through the cancellation path.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::engine::events::EngineEvent;
use crate::error::{EngineError, EngineResult};

/// Create a linked sender/stream pair for one run.
pub(crate) fn channel() -> (EventSender, EventStream) {
    let (tx, rx) = mpsc::channel(1);
    (EventSender { tx }, EventStream { rx })
}

/// The driver task's end of the event channel.
#[derive(Debug, Clone)]
pub(crate) struct EventSender {
    tx: mpsc::Sender<EngineEvent>,
}

impl EventSender {
    /// Deliver one event, suspending until the consumer has capacity.
    ///
    /// A closed channel means the consumer walked away; that is reported
    /// as [`EngineError::Cancelled`] so in-flight work stops.
    pub(crate) async fn send(&self, event: EngineEvent) -> EngineResult<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| EngineError::Cancelled)
    }
}

/// The finite, ordered sequence of events for one run.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<EngineEvent>,
}

impl EventStream {
    /// Await the next event, or `None` when the run has ended.
    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        self.rx.recv().await
    }
}

impl Stream for EventStream {
    type Item = EngineEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}
