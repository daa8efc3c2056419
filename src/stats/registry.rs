//! Concurrent registry of request counters keyed by instance id.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::stats::{RequestStats, ServerInstance, StatsProvider};

#[derive(Debug, Default)]
struct Counters {
    total_requests: AtomicU64,
    successive_failures: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> RequestStats {
        RequestStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successive_failure_count: self.successive_failures.load(Ordering::Relaxed),
        }
    }
}

/// Request counters for every known server.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct StatsRegistry {
    inner: Arc<DashMap<String, Counters>>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A request was dispatched to `id`.
    pub fn note_request(&self, id: &str) {
        self.entry(id, |c| {
            c.total_requests.fetch_add(1, Ordering::Relaxed);
        });
    }

    /// A request to `id` succeeded.
    pub fn note_success(&self, id: &str) {
        self.entry(id, |c| c.successive_failures.store(0, Ordering::Relaxed));
    }

    /// A request to `id` failed.
    pub fn note_failure(&self, id: &str) {
        self.entry(id, |c| {
            c.successive_failures.fetch_add(1, Ordering::Relaxed);
        });
    }

    /// Overwrite the counters for `id`, e.g. from an exported snapshot.
    pub fn seed(&self, id: &str, stats: RequestStats) {
        self.entry(id, |c| {
            c.total_requests.store(stats.total_requests, Ordering::Relaxed);
            c.successive_failures
                .store(stats.successive_failure_count, Ordering::Relaxed);
        });
    }

    /// Forget a server that left the candidate list.
    pub fn remove(&self, id: &str) {
        self.inner.remove(id);
    }

    pub fn get(&self, id: &str) -> Option<RequestStats> {
        self.inner.get(id).map(|r| r.value().snapshot())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn entry(&self, id: &str, f: impl FnOnce(&Counters)) {
        // Fast path avoids allocating the key for known servers.
        if let Some(counters) = self.inner.get(id) {
            f(counters.value());
            return;
        }
        let counters = self.inner.entry(id.to_string()).or_default();
        f(counters.value());
    }
}

impl<T: ServerInstance + ?Sized> StatsProvider<T> for StatsRegistry {
    fn request_stats(&self, server: &T) -> Option<RequestStats> {
        self.get(&server.instance_id())
    }
}
