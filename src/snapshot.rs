//! Exported server statistics, as consumed by the CLI.
//!
//! A snapshot is a JSON array:
//! ```json
//! [{ "instance_id": "10.0.0.1:8080", "total_requests": 100,
//!    "successive_failures": 60, "continuous_failures": 0,
//!    "last_visit_ms": 1700000000000 }]
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::config::IsolationConfig;
use crate::isolation::{channel, IsolationEvent, IsolationFilter};
use crate::policy::ConfigPolicyProvider;
use crate::stats::{RequestStats, ServerInstance, StatsRegistry};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One server as recorded in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotServer {
    pub instance_id: String,
    #[serde(default)]
    pub total_requests: u64,
    #[serde(default)]
    pub successive_failures: u64,
    #[serde(default)]
    pub continuous_failures: u32,
    #[serde(default)]
    pub last_visit_ms: u64,
}

impl ServerInstance for SnapshotServer {
    fn instance_id(&self) -> String {
        self.instance_id.clone()
    }

    fn continuous_failure_count(&self) -> u32 {
        self.continuous_failures
    }

    fn last_visit_time(&self) -> u64 {
        self.last_visit_ms
    }
}

pub fn parse_snapshot(content: &str) -> Result<Vec<SnapshotServer>, SnapshotError> {
    Ok(serde_json::from_str(content)?)
}

pub fn load_snapshot(path: &Path) -> Result<Vec<SnapshotServer>, SnapshotError> {
    let content = fs::read_to_string(path)?;
    parse_snapshot(&content)
}

/// Overwrite `registry` counters with the snapshot values.
pub fn seed_registry(registry: &StatsRegistry, servers: &[SnapshotServer]) {
    for server in servers {
        registry.seed(
            &server.instance_id,
            RequestStats {
                total_requests: server.total_requests,
                successive_failure_count: server.successive_failures,
            },
        );
    }
}

/// Outcome of filtering one snapshot, as printed by `check`.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub service: String,
    pub allowed: Vec<String>,
    pub isolated: Vec<String>,
    pub events: Vec<IsolationEvent>,
}

/// Filter `servers` for `service` once, as of `now` (epoch millis).
pub fn check_report(
    config: IsolationConfig,
    servers: &[SnapshotServer],
    service: &str,
    now: u64,
) -> CheckReport {
    // At most one event per server, so size the channel to never drop.
    let capacity = config.events.channel_capacity.max(servers.len());
    let registry = StatsRegistry::new();
    let (sink, mut events) = channel(capacity);
    let filter: IsolationFilter<SnapshotServer> = IsolationFilter::new(
        Arc::new(ConfigPolicyProvider::new(config)),
        Arc::new(registry.clone()),
        Arc::new(sink),
    );
    seed_registry(&registry, servers);

    let allowed = filter.filter_servers_at(servers, service, now);
    let isolated = servers
        .iter()
        .filter(|s| !allowed.contains(s))
        .map(|s| s.instance_id.clone())
        .collect();

    let mut report = CheckReport {
        service: service.to_string(),
        allowed: allowed.into_iter().map(|s| s.instance_id).collect(),
        isolated,
        events: Vec::new(),
    };
    while let Ok(event) = events.try_recv() {
        report.events.push(event);
    }
    report
}
