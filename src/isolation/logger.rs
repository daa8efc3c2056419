//! Background consumer of isolation events.
//!
//! # Responsibilities
//! - Drain the event channel off the decision path
//! - Emit one structured log line per event
//! - Count events per service and kind

use tokio::sync::broadcast;

use crate::isolation::event::{EventKind, IsolationEvent};
use crate::isolation::sink::EventReceiver;
use crate::observability::metrics;

pub struct EventLogger {
    events: EventReceiver,
}

impl EventLogger {
    pub fn new(events: EventReceiver) -> Self {
        Self { events }
    }

    /// Consume events until every sink is dropped or shutdown fires.
    /// Returns the number of events handled.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> usize {
        tracing::debug!("Isolation event logger starting");
        let mut handled = 0;

        loop {
            tokio::select! {
                event = self.events.recv() => {
                    match event {
                        Some(event) => {
                            handle(&event);
                            handled += 1;
                        }
                        None => break,
                    }
                }
                _ = shutdown.recv() => {
                    // Flush what is already queued before exiting.
                    while let Ok(event) = self.events.try_recv() {
                        handle(&event);
                        handled += 1;
                    }
                    tracing::info!("Event logger received shutdown signal, exiting loop");
                    break;
                }
            }
        }

        handled
    }
}

fn handle(event: &IsolationEvent) {
    metrics::record_event(&event.service, event.kind.as_str());
    match event.kind {
        EventKind::Opened => tracing::warn!(
            service = %event.service,
            instance = %event.instance_id,
            total_requests = event.total_requests,
            continuous_failures = event.continuous_failure_count,
            error_percentage = event.error_percentage,
            continuous_failure_threshold = event.continuous_failure_threshold,
            error_threshold_percentage = event.error_threshold_percentage,
            "Isolation opened"
        ),
        EventKind::Closed => tracing::info!(
            service = %event.service,
            instance = %event.instance_id,
            single_test_time_ms = event.single_test_time_window.as_millis() as u64,
            "Isolation closed for a probe request"
        ),
    }
}
