//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (percentages within 0-100, capacities > 0)
//! - Check backend addresses and service names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: IsolationConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::IsolationConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{scope}: error_threshold_percentage {value} is outside 0-100")]
    PercentageOutOfRange { scope: String, value: u32 },

    #[error("events.channel_capacity must be greater than 0")]
    ZeroChannelCapacity,

    #[error("backend {address} has an empty service name")]
    EmptyService { address: String },

    #[error("backend address {0:?} is not a socket address")]
    InvalidAddress(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &IsolationConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_percentage("isolation", config.isolation.error_threshold_percentage, &mut errors);
    for (name, service) in &config.services {
        if let Some(value) = service.error_threshold_percentage {
            check_percentage(&format!("services.{}", name), value, &mut errors);
        }
    }

    if config.events.channel_capacity == 0 {
        errors.push(ValidationError::ZeroChannelCapacity);
    }

    for backend in &config.backends {
        if backend.service.trim().is_empty() {
            errors.push(ValidationError::EmptyService {
                address: backend.address.clone(),
            });
        }
        if backend.address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress(backend.address.clone()));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_percentage(scope: &str, value: u32, errors: &mut Vec<ValidationError>) {
    if value > 100 {
        errors.push(ValidationError::PercentageOutOfRange {
            scope: scope.to_string(),
            value,
        });
    }
}
