//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for isolation.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct IsolationConfig {
    /// Global isolation thresholds, used when a service has no override.
    pub isolation: IsolationSettings,

    /// Per-service overrides keyed by service name.
    pub services: BTreeMap<String, ServiceOverride>,

    /// Backend server definitions.
    pub backends: Vec<BackendConfig>,

    /// Isolation event delivery.
    pub events: EventsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Global isolation thresholds.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct IsolationSettings {
    /// Master switch; when off the filter passes every server through.
    pub enabled: bool,

    /// Error percentage at or above which a server is isolated (0-100).
    pub error_threshold_percentage: u32,

    /// Minimum total requests before a server is judged at all.
    pub enable_request_threshold: u64,

    /// Cool-down after which an isolated server gets a single probe request.
    pub single_test_time_ms: u64,

    /// Consecutive failures that isolate a server. 0 uses the percentage check.
    pub continuous_failure_threshold: u32,
}

impl Default for IsolationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            error_threshold_percentage: 20,
            enable_request_threshold: 20,
            single_test_time_ms: 10_000,
            continuous_failure_threshold: 0,
        }
    }
}

/// Per-service override; unset fields inherit from [`IsolationSettings`].
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServiceOverride {
    pub enabled: Option<bool>,
    pub error_threshold_percentage: Option<u32>,
    pub enable_request_threshold: Option<u64>,
    pub single_test_time_ms: Option<u64>,
    pub continuous_failure_threshold: Option<u32>,
}

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BackendConfig {
    /// Service this server belongs to.
    pub service: String,

    /// Backend address (e.g., "127.0.0.1:3000").
    pub address: String,
}

/// Event channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EventsConfig {
    /// Bounded capacity of the event channel; events beyond it are dropped.
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log filter when `RUST_LOG` is not set.
    pub log_level: String,

    /// Expose a Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Bind address of the metrics endpoint.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9000".to_string(),
        }
    }
}
