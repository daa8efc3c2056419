//! Isolation policy lookup.
//!
//! # Data Flow
//! ```text
//! Isolation decision for (server, service)
//!     → PolicyProvider::policy(service)
//!     → provider.rs (service override, else global defaults)
//!     → IsolationPolicy (fresh snapshot, never cached by the engine)
//! ```
//!
//! # Design Decisions
//! - Policies are fetched per decision so reloads apply immediately
//! - Provider failures are reported as errors; the engine fails open

pub mod provider;

use std::time::Duration;
use thiserror::Error;

pub use provider::ConfigPolicyProvider;

/// Thresholds governing isolation for one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsolationPolicy {
    pub enabled: bool,
    pub error_threshold_percentage: u32,
    pub enable_request_threshold: u64,
    pub single_test_time_window: Duration,
    pub continuous_failure_threshold: u32,
}

impl IsolationPolicy {
    /// Reject values the decision algorithm cannot interpret.
    pub fn validate(self, service: &str) -> Result<Self, PolicyError> {
        if self.error_threshold_percentage > 100 {
            return Err(PolicyError::Invalid {
                service: service.to_string(),
                reason: format!(
                    "error_threshold_percentage {} is outside 0-100",
                    self.error_threshold_percentage
                ),
            });
        }
        Ok(self)
    }
}

impl Default for IsolationPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            error_threshold_percentage: 20,
            enable_request_threshold: 20,
            single_test_time_window: Duration::from_millis(10_000),
            continuous_failure_threshold: 0,
        }
    }
}

/// Errors returned by policy providers.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The resolved policy is not usable.
    #[error("invalid isolation policy for {service}: {reason}")]
    Invalid { service: String, reason: String },

    /// The backing store could not be read.
    #[error("policy source unavailable: {0}")]
    Unavailable(String),
}

/// Source of per-service isolation thresholds.
pub trait PolicyProvider: Send + Sync {
    fn policy(&self, service: &str) -> Result<IsolationPolicy, PolicyError>;
}

/// The same policy for every service.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticPolicy(pub IsolationPolicy);

impl PolicyProvider for StaticPolicy {
    fn policy(&self, service: &str) -> Result<IsolationPolicy, PolicyError> {
        self.0.validate(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_policy() {
        let provider = StaticPolicy(IsolationPolicy {
            enabled: true,
            ..Default::default()
        });
        let policy = provider.policy("anything").unwrap();
        assert!(policy.enabled);
        assert_eq!(policy.single_test_time_window, Duration::from_secs(10));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let provider = StaticPolicy(IsolationPolicy {
            error_threshold_percentage: 101,
            ..Default::default()
        });
        let err = provider.policy("orders").unwrap_err();
        assert!(err.to_string().contains("orders"));
    }
}
