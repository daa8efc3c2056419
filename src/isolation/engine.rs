//! Isolation decision engine.
//!
//! # Algorithm
//! ```text
//! total < enable_request_threshold            → Allow (too little traffic)
//! continuous_failure_threshold > 0:
//!     continuous < threshold                  → Allow
//! else:
//!     successive / total * 100 < percentage   → Allow
//! now - last_visit > single_test_time_window  → Allow once, event Closed
//! otherwise                                   → Isolate, event Opened
//! ```
//!
//! Both threshold paths share the same recovery window. The continuous
//! failure check, when enabled, replaces the percentage check entirely.

use std::sync::Arc;

use crate::isolation::event::{Breach, Decision, EventKind, Evaluation, IsolationEvent};
use crate::isolation::sink::EventSink;
use crate::observability::metrics;
use crate::policy::{IsolationPolicy, PolicyProvider};
use crate::stats::{now_millis, HealthRecord, ServerInstance, StatsProvider};

/// Filters candidate servers down to the ones eligible for traffic.
///
/// Holds no mutable state; every call reloads the policy and reads fresh
/// stats, so one instance can be shared across threads.
pub struct IsolationFilter<T> {
    policies: Arc<dyn PolicyProvider>,
    stats: Arc<dyn StatsProvider<T>>,
    sink: Arc<dyn EventSink>,
}

impl<T> Clone for IsolationFilter<T> {
    fn clone(&self) -> Self {
        Self {
            policies: self.policies.clone(),
            stats: self.stats.clone(),
            sink: self.sink.clone(),
        }
    }
}

impl<T: ServerInstance + Clone> IsolationFilter<T> {
    pub fn new(
        policies: Arc<dyn PolicyProvider>,
        stats: Arc<dyn StatsProvider<T>>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            policies,
            stats,
            sink,
        }
    }

    /// Servers from `servers` that may receive traffic for `service`, in
    /// their original order.
    pub fn filter_servers(&self, servers: &[T], service: &str) -> Vec<T> {
        self.filter_servers_at(servers, service, now_millis())
    }

    /// [`filter_servers`](Self::filter_servers) against an explicit clock
    /// reading (epoch millis).
    pub fn filter_servers_at(&self, servers: &[T], service: &str, now: u64) -> Vec<T> {
        match self.policies.policy(service) {
            Ok(policy) if !policy.enabled => return servers.to_vec(),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    service = %service,
                    error = %e,
                    "Failed to load isolation policy, passing all servers"
                );
                return servers.to_vec();
            }
        }

        servers
            .iter()
            .filter(|server| self.decide_at(server, service, now).is_allowed())
            .cloned()
            .collect()
    }

    /// Decide whether `server` may receive the next request for `service`,
    /// posting an event when a threshold is breached.
    pub fn decide(&self, server: &T, service: &str) -> Decision {
        self.decide_at(server, service, now_millis())
    }

    /// [`decide`](Self::decide) against an explicit clock reading.
    pub fn decide_at(&self, server: &T, service: &str, now: u64) -> Decision {
        let policy = match self.policies.policy(service) {
            Ok(policy) => policy,
            Err(e) => {
                tracing::debug!(service = %service, error = %e, "No isolation policy, allowing");
                return Decision::Allow;
            }
        };

        let record = HealthRecord::collect(server, self.stats.as_ref());
        let evaluation = evaluate_at(server, &record, &policy, service, now);

        if let Some(event) = evaluation.event {
            match event.kind {
                EventKind::Closed => tracing::info!(
                    service = %service,
                    instance = %event.instance_id,
                    "Instance has been isolated, giving a single test opportunity"
                ),
                EventKind::Opened => tracing::warn!(
                    service = %service,
                    instance = %event.instance_id,
                    total_requests = event.total_requests,
                    continuous_failures = event.continuous_failure_count,
                    error_percentage = event.error_percentage,
                    "Instance has been isolated"
                ),
            }
            self.sink.post(event);
        }

        metrics::record_decision(service, evaluation.decision.is_allowed());
        evaluation.decision
    }
}

/// Pure decision for one server. No I/O, no clock, no event delivery.
pub fn evaluate_at<T: ServerInstance + ?Sized>(
    server: &T,
    record: &HealthRecord,
    policy: &IsolationPolicy,
    service: &str,
    now: u64,
) -> Evaluation {
    let total = record.total_requests;
    // A zero request gate would otherwise let an unvisited server divide by zero.
    if total < policy.enable_request_threshold || total == 0 {
        return Evaluation::allow();
    }

    let breach = if policy.continuous_failure_threshold > 0 {
        if record.continuous_failure_count < policy.continuous_failure_threshold {
            return Evaluation::allow();
        }
        Breach::ContinuousFailures
    } else {
        let pct = record.successive_failure_count as f64 / total as f64 * 100.0;
        if pct < f64::from(policy.error_threshold_percentage) {
            return Evaluation::allow();
        }
        Breach::ErrorPercentage(pct)
    };

    let elapsed = now.saturating_sub(record.last_visit_timestamp);
    let (decision, kind) = if u128::from(elapsed) > policy.single_test_time_window.as_millis() {
        (Decision::Allow, EventKind::Closed)
    } else {
        (Decision::Isolate, EventKind::Opened)
    };

    Evaluation {
        decision,
        event: Some(IsolationEvent::new(
            service,
            server.instance_id(),
            record,
            policy,
            breach,
            kind,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isolation::sink::{channel, EventReceiver};
    use crate::policy::{PolicyError, StaticPolicy};
    use crate::stats::{RequestStats, StatsRegistry};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const NOW: u64 = 1_700_000_000_000;
    const WINDOW_MS: u64 = 10_000;

    #[derive(Debug, Clone, PartialEq)]
    struct Server {
        id: &'static str,
        continuous: u32,
        last_visit: u64,
    }

    impl ServerInstance for Server {
        fn instance_id(&self) -> String {
            self.id.to_string()
        }
        fn continuous_failure_count(&self) -> u32 {
            self.continuous
        }
        fn last_visit_time(&self) -> u64 {
            self.last_visit
        }
    }

    fn server(id: &'static str) -> Server {
        Server {
            id,
            continuous: 0,
            last_visit: NOW,
        }
    }

    fn policy() -> IsolationPolicy {
        IsolationPolicy {
            enabled: true,
            error_threshold_percentage: 50,
            enable_request_threshold: 10,
            single_test_time_window: Duration::from_millis(WINDOW_MS),
            continuous_failure_threshold: 0,
        }
    }

    fn record(total: u64, successive: u64, continuous: u32, last_visit: u64) -> HealthRecord {
        HealthRecord {
            total_requests: total,
            successive_failure_count: successive,
            continuous_failure_count: continuous,
            last_visit_timestamp: last_visit,
        }
    }

    fn stats(total_requests: u64, successive_failure_count: u64) -> RequestStats {
        RequestStats {
            total_requests,
            successive_failure_count,
        }
    }

    fn filter(
        policy: IsolationPolicy,
        registry: &StatsRegistry,
    ) -> (IsolationFilter<Server>, EventReceiver) {
        let (sink, rx) = channel(64);
        let filter = IsolationFilter::new(
            Arc::new(StaticPolicy(policy)),
            Arc::new(registry.clone()),
            Arc::new(sink),
        );
        (filter, rx)
    }

    fn drain(rx: &mut EventReceiver) -> Vec<IsolationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_percentage_breach_isolates() {
        let eval = evaluate_at(&server("a"), &record(100, 60, 0, NOW), &policy(), "svc", NOW);
        assert_eq!(eval.decision, Decision::Isolate);
        let event = eval.event.unwrap();
        assert_eq!(event.kind, EventKind::Opened);
        assert_eq!(event.total_requests, 100);
        assert_eq!(event.error_percentage, 60.0);
        assert_eq!(event.continuous_failure_count, 0);
        assert_eq!(event.error_threshold_percentage, 50);
    }

    #[test]
    fn test_continuous_below_threshold_allows() {
        let policy = IsolationPolicy {
            continuous_failure_threshold: 5,
            error_threshold_percentage: 0,
            ..policy()
        };
        let eval = evaluate_at(&server("a"), &record(100, 100, 3, NOW), &policy, "svc", NOW);
        assert_eq!(eval, Evaluation::allow());
    }

    #[test]
    fn test_probe_after_window() {
        let stale = record(100, 60, 0, NOW - WINDOW_MS - 1);
        let eval = evaluate_at(&server("a"), &stale, &policy(), "svc", NOW);
        assert_eq!(eval.decision, Decision::Allow);
        assert_eq!(eval.event.unwrap().kind, EventKind::Closed);
    }

    #[test]
    fn test_window_boundary_is_strict() {
        let edge = record(100, 60, 0, NOW - WINDOW_MS);
        let eval = evaluate_at(&server("a"), &edge, &policy(), "svc", NOW);
        assert_eq!(eval.decision, Decision::Isolate);
    }

    #[test]
    fn test_below_request_threshold_always_allows() {
        for (successive, continuous, last_visit) in [(9, 0, NOW), (9, 100, 0), (0, 0, NOW)] {
            for cft in [0, 1] {
                let policy = IsolationPolicy {
                    continuous_failure_threshold: cft,
                    error_threshold_percentage: 0,
                    ..policy()
                };
                let eval = evaluate_at(
                    &server("a"),
                    &record(9, successive, continuous, last_visit),
                    &policy,
                    "svc",
                    NOW,
                );
                assert_eq!(eval, Evaluation::allow());
            }
        }
    }

    #[test]
    fn test_continuous_mode_ignores_percentage() {
        let base = IsolationPolicy {
            continuous_failure_threshold: 3,
            ..policy()
        };
        for pct in [0, 50, 100] {
            for successive in [0, 50, 100] {
                let policy = IsolationPolicy {
                    error_threshold_percentage: pct,
                    ..base
                };
                let at_limit = record(100, successive, 3, NOW);
                let tripped = evaluate_at(&server("a"), &at_limit, &policy, "svc", NOW);
                assert_eq!(tripped.decision, Decision::Isolate);
                assert_eq!(tripped.event.unwrap().error_percentage, 0.0);

                let below = record(100, successive, 2, NOW);
                let healthy = evaluate_at(&server("a"), &below, &policy, "svc", NOW);
                assert_eq!(healthy, Evaluation::allow());
            }
        }
    }

    #[test]
    fn test_continuous_breach_shares_recovery_window() {
        let policy = IsolationPolicy {
            continuous_failure_threshold: 3,
            ..policy()
        };
        let eval = evaluate_at(&server("a"), &record(100, 0, 7, 0), &policy, "svc", NOW);
        assert_eq!(eval.decision, Decision::Allow);
        let event = eval.event.unwrap();
        assert_eq!(event.kind, EventKind::Closed);
        assert_eq!(event.continuous_failure_count, 7);
    }

    #[test]
    fn test_zero_request_gate_with_no_traffic() {
        let policy = IsolationPolicy {
            enable_request_threshold: 0,
            error_threshold_percentage: 0,
            ..policy()
        };
        let eval = evaluate_at(&server("a"), &HealthRecord::default(), &policy, "svc", NOW);
        assert_eq!(eval, Evaluation::allow());
    }

    #[test]
    fn test_future_last_visit_counts_as_no_elapsed_time() {
        let eval = evaluate_at(&server("a"), &record(100, 60, 0, NOW + 5), &policy(), "svc", NOW);
        assert_eq!(eval.decision, Decision::Isolate);
    }

    #[test]
    fn test_filter_preserves_order_and_emits_events() {
        let registry = StatsRegistry::new();
        registry.seed("bad", stats(100, 60));
        registry.seed("good", stats(100, 1));
        let probing = Server {
            id: "probe",
            continuous: 0,
            last_visit: NOW - WINDOW_MS - 1,
        };
        registry.seed("probe", stats(100, 90));

        let (filter, mut rx) = filter(policy(), &registry);
        let servers = vec![server("good"), server("bad"), server("fresh"), probing.clone()];

        let allowed = filter.filter_servers_at(&servers, "svc", NOW);
        assert_eq!(allowed, vec![server("good"), server("fresh"), probing]);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].instance_id, "bad");
        assert_eq!(events[0].kind, EventKind::Opened);
        assert_eq!(events[1].instance_id, "probe");
        assert_eq!(events[1].kind, EventKind::Closed);
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let registry = StatsRegistry::new();
        registry.seed("bad", stats(100, 60));
        let (filter, mut rx) = filter(policy(), &registry);
        let servers = vec![server("bad"), server("good")];

        let first = filter.filter_servers_at(&servers, "svc", NOW);
        let first_events = drain(&mut rx);
        let second = filter.filter_servers_at(&servers, "svc", NOW);
        let second_events = drain(&mut rx);

        assert_eq!(first, second);
        assert_eq!(first_events, second_events);
        assert_eq!(first_events.len(), 1);
    }

    struct CountingStats(AtomicUsize);

    impl StatsProvider<Server> for CountingStats {
        fn request_stats(&self, _server: &Server) -> Option<RequestStats> {
            self.0.fetch_add(1, Ordering::Relaxed);
            Some(stats(100, 100))
        }
    }

    #[test]
    fn test_disabled_skips_stats() {
        let stats = Arc::new(CountingStats(AtomicUsize::new(0)));
        let (sink, mut rx) = channel(8);
        let filter: IsolationFilter<Server> = IsolationFilter::new(
            Arc::new(StaticPolicy(IsolationPolicy {
                enabled: false,
                ..policy()
            })),
            stats.clone(),
            Arc::new(sink),
        );
        let servers = vec![server("a"), server("b")];

        assert_eq!(filter.filter_servers_at(&servers, "svc", NOW), servers);
        assert_eq!(stats.0.load(Ordering::Relaxed), 0);
        assert!(drain(&mut rx).is_empty());
    }

    struct BrokenPolicy;

    impl PolicyProvider for BrokenPolicy {
        fn policy(&self, _service: &str) -> Result<IsolationPolicy, PolicyError> {
            Err(PolicyError::Unavailable("config store offline".into()))
        }
    }

    #[test]
    fn test_policy_failure_fails_open() {
        let registry = StatsRegistry::new();
        registry.seed("bad", stats(100, 100));
        let (sink, mut rx) = channel(8);
        let filter: IsolationFilter<Server> =
            IsolationFilter::new(Arc::new(BrokenPolicy), Arc::new(registry), Arc::new(sink));

        let servers = vec![server("bad")];
        assert_eq!(filter.filter_servers_at(&servers, "svc", NOW), servers);
        assert_eq!(filter.decide_at(&server("bad"), "svc", NOW), Decision::Allow);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_unknown_server_allowed() {
        let (filter, mut rx) = filter(policy(), &StatsRegistry::new());
        assert_eq!(filter.decide_at(&server("nobody"), "svc", NOW), Decision::Allow);
        assert!(drain(&mut rx).is_empty());
    }
}
