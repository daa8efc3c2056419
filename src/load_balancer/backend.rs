//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server of a service
//! - Track consecutive failures since the last success
//! - Track when the last request was dispatched to it

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::stats::{now_millis, ServerInstance};

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    /// The address of the backend.
    pub addr: SocketAddr,
    /// Service this backend serves.
    pub service: String,

    /// Consecutive failure count, reset on success.
    continuous_failures: AtomicU32,
    /// Epoch millis of the last dispatched request (0 = never).
    last_visit: AtomicU64,
}

impl Backend {
    /// Create a new backend.
    pub fn new(addr: SocketAddr, service: impl Into<String>) -> Self {
        Self {
            addr,
            service: service.into(),
            continuous_failures: AtomicU32::new(0),
            last_visit: AtomicU64::new(0),
        }
    }

    /// Record that a request is being sent to this backend now.
    pub fn record_visit(&self) {
        self.record_visit_at(now_millis());
    }

    pub fn record_visit_at(&self, now: u64) {
        self.last_visit.store(now, Ordering::Relaxed);
    }

    /// Report a successful request.
    pub fn mark_success(&self) {
        self.continuous_failures.store(0, Ordering::Relaxed);
    }

    /// Report a failed request.
    pub fn mark_failure(&self) {
        self.continuous_failures.fetch_add(1, Ordering::Relaxed);
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}

impl ServerInstance for Backend {
    fn instance_id(&self) -> String {
        self.addr.to_string()
    }

    fn continuous_failure_count(&self) -> u32 {
        self.continuous_failures.load(Ordering::Relaxed)
    }

    fn last_visit_time(&self) -> u64 {
        self.last_visit.load(Ordering::Relaxed)
    }
}
