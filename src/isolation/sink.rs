//! Non-blocking delivery of isolation events.

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::isolation::event::IsolationEvent;
use crate::observability::metrics;

/// Receives isolation events. Implementations must never block the caller.
pub trait EventSink: Send + Sync {
    fn post(&self, event: IsolationEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn post(&self, _event: IsolationEvent) {}
}

/// Receiving half of [`channel`].
pub type EventReceiver = mpsc::Receiver<IsolationEvent>;

/// Posts events onto a bounded channel, dropping them when it is full.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<IsolationEvent>,
}

/// Create a sink and the receiver a consumer task drains.
pub fn channel(capacity: usize) -> (ChannelSink, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChannelSink { tx }, rx)
}

impl EventSink for ChannelSink {
    fn post(&self, event: IsolationEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                metrics::record_event_dropped();
                tracing::debug!(
                    service = %event.service,
                    kind = event.kind.as_str(),
                    "Event channel full, dropping isolation event"
                );
            }
            Err(TrySendError::Closed(event)) => {
                metrics::record_event_dropped();
                tracing::debug!(
                    service = %event.service,
                    "Event channel closed, dropping isolation event"
                );
            }
        }
    }
}
