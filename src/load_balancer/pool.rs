//! Backend pool management.
//!
//! # Responsibilities
//! - Group backends by service
//! - Drop isolated backends through the isolation filter
//! - Pick among the rest round-robin
//! - Feed request outcomes back into the stats the filter reads

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{BackendConfig, IsolationConfig};
use crate::isolation::{EventSink, IsolationFilter};
use crate::load_balancer::{backend::Backend, round_robin::RoundRobin};
use crate::policy::ConfigPolicyProvider;
use crate::stats::StatsRegistry;

/// Manages per-service backend lists and selection.
pub struct ServerPool {
    /// Map of service name -> (Backends, selector).
    groups: HashMap<String, (Vec<Arc<Backend>>, RoundRobin)>,
    filter: IsolationFilter<Arc<Backend>>,
    stats: StatsRegistry,
}

impl ServerPool {
    /// Create a pool from configuration.
    ///
    /// `stats` must be the registry `filter` reads from, otherwise reported
    /// outcomes never influence isolation.
    pub fn new(
        configs: &[BackendConfig],
        filter: IsolationFilter<Arc<Backend>>,
        stats: StatsRegistry,
    ) -> Self {
        let mut groups: HashMap<String, (Vec<Arc<Backend>>, RoundRobin)> = HashMap::new();

        for config in configs {
            match config.address.parse() {
                Ok(addr) => {
                    let backend = Arc::new(Backend::new(addr, config.service.clone()));
                    groups
                        .entry(config.service.clone())
                        .or_insert_with(|| (Vec::new(), RoundRobin::new()))
                        .0
                        .push(backend);
                }
                Err(_) => tracing::warn!(address = %config.address, "Invalid backend address"),
            }
        }

        Self {
            groups,
            filter,
            stats,
        }
    }

    /// Pool over the `[[backends]]` of `config`, isolating with its policies
    /// and a fresh stats registry.
    pub fn from_config(config: &IsolationConfig, sink: Arc<dyn EventSink>) -> Self {
        let stats = StatsRegistry::new();
        let filter: IsolationFilter<Arc<Backend>> = IsolationFilter::new(
            Arc::new(ConfigPolicyProvider::new(config.clone())),
            Arc::new(stats.clone()),
            sink,
        );
        Self::new(&config.backends, filter, stats)
    }

    /// Select a backend for `service` and record the dispatch.
    pub fn choose(&self, service: &str) -> Option<Arc<Backend>> {
        let Some((backends, selector)) = self.groups.get(service) else {
            tracing::debug!(service = %service, "Service not found in pool");
            return None;
        };

        let eligible = self.filter.filter_servers(backends, service);
        let Some(backend) = selector.next_server(&eligible) else {
            tracing::debug!(
                service = %service,
                backend_count = backends.len(),
                "All backends isolated"
            );
            return None;
        };

        backend.record_visit();
        self.stats.note_request(&backend.addr.to_string());
        Some(backend)
    }

    /// Feed the outcome of a request back into the counters.
    pub fn report(&self, backend: &Backend, success: bool) {
        let id = backend.addr.to_string();
        if success {
            backend.mark_success();
            self.stats.note_success(&id);
        } else {
            backend.mark_failure();
            self.stats.note_failure(&id);
        }
    }

    /// Backends configured for `service`, isolated or not.
    pub fn backends(&self, service: &str) -> &[Arc<Backend>] {
        self.groups
            .get(service)
            .map(|(backends, _)| backends.as_slice())
            .unwrap_or_default()
    }

    /// Services with at least one valid backend, sorted.
    pub fn services(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.groups.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Return a list of all backends.
    pub fn all_backends(&self) -> Vec<Arc<Backend>> {
        self.groups
            .values()
            .flat_map(|(backends, _)| backends.iter())
            .cloned()
            .collect()
    }
}
