//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! choose(service)
//!     → pool.rs (backends configured for the service)
//!     → isolation filter (drop isolated backends, allow probes)
//!     → round_robin.rs (rotate through what is left)
//!     → record visit (backend last visit, registry request count)
//!
//! report(backend, outcome)
//!     → backend.rs (continuous failure streak)
//!     → stats registry (successive failures)
//! ```
//!
//! # Design Decisions
//! - Selection strategy never sees isolated backends
//! - The pool owns no health state machine; isolation is recomputed per call

pub mod backend;
pub mod pool;
pub mod round_robin;

pub use backend::Backend;
pub use pool::ServerPool;
pub use round_robin::RoundRobin;
