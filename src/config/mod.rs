//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → IsolationConfig (validated, immutable)
//!     → stored in ConfigPolicyProvider (ArcSwap)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<IsolationConfig>
//!     → next isolation decision observes new thresholds
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Per-service sections only override what they name
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::BackendConfig;
pub use schema::EventsConfig;
pub use schema::IsolationConfig;
pub use schema::IsolationSettings;
pub use schema::ObservabilityConfig;
pub use schema::ServiceOverride;
