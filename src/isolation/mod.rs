//! Server isolation subsystem.
//!
//! # Data Flow
//! ```text
//! Candidate servers + service name
//!     → engine.rs (policy reload, stats read, threshold checks)
//!     → filtered servers (original order kept)
//!
//! Threshold breached:
//!     → event.rs (IsolationEvent: Opened or Closed)
//!     → sink.rs (try_send onto bounded channel, drop when full)
//!     → logger.rs (background task: log + metrics)
//! ```
//!
//! # Design Decisions
//! - No explicit open/half-open/closed state; it is inferred from counters
//! - Missing data and policy errors allow traffic (fail-open)
//! - The decision path never waits on event delivery

pub mod engine;
pub mod event;
pub mod logger;
pub mod sink;

pub use engine::{evaluate_at, IsolationFilter};
pub use event::{Decision, EventKind, Evaluation, IsolationEvent};
pub use logger::EventLogger;
pub use sink::{channel, ChannelSink, EventReceiver, EventSink, NoopSink};
