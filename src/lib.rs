//! Server isolation for client-side load balancing.
//!
//! Decides, per request, which backend instances of a service may receive
//! traffic. Instances whose recent failures cross the configured thresholds
//! are isolated; once the cool-down window passes they get a single probe
//! request.

pub mod config;
pub mod isolation;
pub mod load_balancer;
pub mod observability;
pub mod policy;
pub mod snapshot;
pub mod stats;

pub use config::IsolationConfig;
pub use isolation::{Decision, IsolationEvent, IsolationFilter};
pub use policy::{ConfigPolicyProvider, IsolationPolicy, PolicyProvider};
pub use stats::{ServerInstance, StatsProvider, StatsRegistry};
