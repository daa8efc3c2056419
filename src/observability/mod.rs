//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Isolation engine produces:
//!     → tracing events (warn on isolation, info on probe)
//!     → metrics.rs (decision counters)
//!     → event sink (IsolationEvent, consumed by isolation::logger)
//!
//! Consumers:
//!     → Log output (stderr)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields rather than formatted messages
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
