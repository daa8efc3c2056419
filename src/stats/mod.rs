//! Per-server request statistics.
//!
//! # Data Flow
//! ```text
//! Request dispatched to a server:
//!     → registry.rs (total requests += 1)
//!     → server capability (last visit = now)
//!
//! Request completed:
//!     → success: successive failures reset, continuous failures reset
//!     → failure: successive failures += 1, continuous failures += 1
//!
//! Isolation decision:
//!     → HealthRecord::collect (merge provider stats + server capability)
//! ```
//!
//! # Design Decisions
//! - Stats are owned outside the isolation engine; the engine only reads
//! - Any piece of data that is missing reads as zero (fail-open)
//! - Counters are atomics, reads are eventually consistent

pub mod registry;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub use registry::StatsRegistry;

/// Capability every server representation exposes to the isolation engine.
///
/// Only `instance_id` is required. A server that does not track the
/// extended counters reads as zero failures, last visited at the epoch.
pub trait ServerInstance {
    /// Stable identifier used to look the server up in a stats provider.
    fn instance_id(&self) -> String;

    /// Failures since the last success, tracked by the server itself.
    fn continuous_failure_count(&self) -> u32 {
        0
    }

    /// Time the last request was dispatched to this server (epoch millis).
    fn last_visit_time(&self) -> u64 {
        0
    }
}

impl<T: ServerInstance + ?Sized> ServerInstance for Arc<T> {
    fn instance_id(&self) -> String {
        (**self).instance_id()
    }

    fn continuous_failure_count(&self) -> u32 {
        (**self).continuous_failure_count()
    }

    fn last_visit_time(&self) -> u64 {
        (**self).last_visit_time()
    }
}

/// Aggregate request counters kept by a stats provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestStats {
    pub total_requests: u64,
    pub successive_failure_count: u64,
}

/// Source of per-server request statistics.
pub trait StatsProvider<T: ?Sized>: Send + Sync {
    /// Current counters for `server`, or `None` if nothing was recorded yet.
    fn request_stats(&self, server: &T) -> Option<RequestStats>;
}

/// Snapshot of everything the isolation engine knows about one server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthRecord {
    pub total_requests: u64,
    pub successive_failure_count: u64,
    pub continuous_failure_count: u32,
    /// Epoch milliseconds; 0 when the server was never visited.
    pub last_visit_timestamp: u64,
}

impl HealthRecord {
    /// Merge provider counters with the server's own capability data.
    pub fn collect<T>(server: &T, stats: &dyn StatsProvider<T>) -> Self
    where
        T: ServerInstance,
    {
        let request = stats.request_stats(server).unwrap_or_default();
        Self {
            total_requests: request.total_requests,
            successive_failure_count: request.successive_failure_count,
            continuous_failure_count: server.continuous_failure_count(),
            last_visit_timestamp: server.last_visit_time(),
        }
    }
}

/// Wall clock in epoch milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
