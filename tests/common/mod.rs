//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use server_isolation::config::parse_config;
use server_isolation::isolation::{channel, EventReceiver, IsolationEvent};
use server_isolation::stats::{RequestStats, ServerInstance};
use server_isolation::{ConfigPolicyProvider, IsolationFilter, StatsRegistry};

/// A server as a discovery layer would hand it to the filter.
#[derive(Debug, Clone, PartialEq)]
pub struct TestServer {
    pub id: String,
    pub continuous_failures: u32,
    pub last_visit_ms: u64,
}

impl TestServer {
    pub fn new(id: &str, continuous_failures: u32, last_visit_ms: u64) -> Self {
        Self {
            id: id.to_string(),
            continuous_failures,
            last_visit_ms,
        }
    }
}

impl ServerInstance for TestServer {
    fn instance_id(&self) -> String {
        self.id.clone()
    }

    fn continuous_failure_count(&self) -> u32 {
        self.continuous_failures
    }

    fn last_visit_time(&self) -> u64 {
        self.last_visit_ms
    }
}

pub struct Harness {
    pub filter: IsolationFilter<TestServer>,
    pub registry: StatsRegistry,
    pub provider: ConfigPolicyProvider,
    pub events: EventReceiver,
}

impl Harness {
    /// Build a filter from TOML configuration text.
    pub fn from_toml(toml: &str) -> Self {
        let config = parse_config(toml).expect("test config must be valid");
        let provider = ConfigPolicyProvider::new(config);
        let registry = StatsRegistry::new();
        let (sink, events) = channel(256);
        let filter: IsolationFilter<TestServer> = IsolationFilter::new(
            Arc::new(provider.clone()),
            Arc::new(registry.clone()),
            Arc::new(sink),
        );
        Self {
            filter,
            registry,
            provider,
            events,
        }
    }

    pub fn seed(&self, id: &str, total_requests: u64, successive_failure_count: u64) {
        self.registry.seed(
            id,
            RequestStats {
                total_requests,
                successive_failure_count,
            },
        );
    }

    pub fn drain(&mut self) -> Vec<IsolationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

pub fn window() -> Duration {
    Duration::from_millis(10_000)
}
