//! Policy provider backed by the loaded configuration.

use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::IsolationConfig;
use crate::observability::metrics;
use crate::policy::{IsolationPolicy, PolicyError, PolicyProvider};

/// Resolves policies from an atomically swappable [`IsolationConfig`].
///
/// Cloning shares the same configuration slot, so a clone handed to the
/// isolation filter sees every later [`store`](Self::store).
#[derive(Debug, Clone)]
pub struct ConfigPolicyProvider {
    config: Arc<ArcSwap<IsolationConfig>>,
}

impl ConfigPolicyProvider {
    pub fn new(config: IsolationConfig) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// Replace the configuration; subsequent lookups use the new values.
    pub fn store(&self, config: IsolationConfig) {
        self.config.store(Arc::new(config));
        metrics::record_policy_reload();
        tracing::info!("Isolation policies reloaded");
    }

    /// Current configuration snapshot.
    pub fn current(&self) -> Arc<IsolationConfig> {
        self.config.load_full()
    }
}

impl PolicyProvider for ConfigPolicyProvider {
    fn policy(&self, service: &str) -> Result<IsolationPolicy, PolicyError> {
        let config = self.config.load();
        let global = &config.isolation;

        let policy = match config.services.get(service) {
            Some(o) => IsolationPolicy {
                enabled: o.enabled.unwrap_or(global.enabled),
                error_threshold_percentage: o
                    .error_threshold_percentage
                    .unwrap_or(global.error_threshold_percentage),
                enable_request_threshold: o
                    .enable_request_threshold
                    .unwrap_or(global.enable_request_threshold),
                single_test_time_window: Duration::from_millis(
                    o.single_test_time_ms.unwrap_or(global.single_test_time_ms),
                ),
                continuous_failure_threshold: o
                    .continuous_failure_threshold
                    .unwrap_or(global.continuous_failure_threshold),
            },
            None => IsolationPolicy {
                enabled: global.enabled,
                error_threshold_percentage: global.error_threshold_percentage,
                enable_request_threshold: global.enable_request_threshold,
                single_test_time_window: Duration::from_millis(global.single_test_time_ms),
                continuous_failure_threshold: global.continuous_failure_threshold,
            },
        };

        policy.validate(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceOverride;

    fn config() -> IsolationConfig {
        let mut config = IsolationConfig::default();
        config.isolation.enabled = true;
        config.isolation.error_threshold_percentage = 40;
        config.services.insert(
            "orders".into(),
            ServiceOverride {
                continuous_failure_threshold: Some(5),
                single_test_time_ms: Some(500),
                ..Default::default()
            },
        );
        config.services.insert(
            "billing".into(),
            ServiceOverride {
                enabled: Some(false),
                ..Default::default()
            },
        );
        config
    }

    #[test]
    fn test_global_defaults() {
        let provider = ConfigPolicyProvider::new(config());
        let policy = provider.policy("unknown").unwrap();
        assert!(policy.enabled);
        assert_eq!(policy.error_threshold_percentage, 40);
        assert_eq!(policy.continuous_failure_threshold, 0);
        assert_eq!(policy.single_test_time_window, Duration::from_secs(10));
    }

    #[test]
    fn test_service_override_inherits_unset_fields() {
        let provider = ConfigPolicyProvider::new(config());
        let policy = provider.policy("orders").unwrap();
        assert!(policy.enabled);
        assert_eq!(policy.error_threshold_percentage, 40);
        assert_eq!(policy.continuous_failure_threshold, 5);
        assert_eq!(policy.single_test_time_window, Duration::from_millis(500));

        assert!(!provider.policy("billing").unwrap().enabled);
    }

    #[test]
    fn test_store_visible_through_clones() {
        let provider = ConfigPolicyProvider::new(config());
        let shared = provider.clone();

        let mut next = config();
        next.isolation.error_threshold_percentage = 90;
        provider.store(next);

        assert_eq!(shared.policy("unknown").unwrap().error_threshold_percentage, 90);
        assert_eq!(shared.current().isolation.error_threshold_percentage, 90);
    }

    #[test]
    fn test_unvalidated_config_rejected() {
        let mut bad = config();
        bad.services.get_mut("orders").unwrap().error_threshold_percentage = Some(300);
        let provider = ConfigPolicyProvider::new(bad);

        assert!(matches!(
            provider.policy("orders"),
            Err(PolicyError::Invalid { .. })
        ));
        assert!(provider.policy("unknown").is_ok());
    }
}
