//! Decision and event types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::policy::IsolationPolicy;
use crate::stats::HealthRecord;

/// Verdict for one server in one filtering pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Isolate,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Kind of isolation state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Threshold breached and the server was excluded.
    Opened,
    /// Cool-down elapsed; the server gets a single probe request.
    Closed,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Opened => "opened",
            EventKind::Closed => "closed",
        }
    }
}

/// Notification posted to the event sink when a thresholded server is
/// isolated or given a probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationEvent {
    pub service: String,
    pub instance_id: String,
    pub total_requests: u64,
    /// Zero when the percentage check was used.
    pub continuous_failure_count: u32,
    /// Zero when the continuous-failure check was used.
    pub error_percentage: f64,
    pub continuous_failure_threshold: u32,
    pub error_threshold_percentage: u32,
    pub enable_request_threshold: u64,
    #[serde(with = "millis")]
    pub single_test_time_window: Duration,
    pub kind: EventKind,
}

impl IsolationEvent {
    pub(crate) fn new(
        service: &str,
        instance_id: String,
        record: &HealthRecord,
        policy: &IsolationPolicy,
        breach: Breach,
        kind: EventKind,
    ) -> Self {
        let (continuous_failure_count, error_percentage) = match breach {
            Breach::ContinuousFailures => (record.continuous_failure_count, 0.0),
            Breach::ErrorPercentage(pct) => (0, pct),
        };
        Self {
            service: service.to_string(),
            instance_id,
            total_requests: record.total_requests,
            continuous_failure_count,
            error_percentage,
            continuous_failure_threshold: policy.continuous_failure_threshold,
            error_threshold_percentage: policy.error_threshold_percentage,
            enable_request_threshold: policy.enable_request_threshold,
            single_test_time_window: policy.single_test_time_window,
            kind,
        }
    }
}

/// Which threshold tripped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Breach {
    ContinuousFailures,
    ErrorPercentage(f64),
}

/// Outcome of evaluating one server.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub decision: Decision,
    pub event: Option<IsolationEvent>,
}

impl Evaluation {
    pub(crate) fn allow() -> Self {
        Self {
            decision: Decision::Allow,
            event: None,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
