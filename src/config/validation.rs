//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, queue sizes > 0)
//! - Validate addresses parse before anything binds
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: `{value}` is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    check_nonzero(&mut errors, "timeouts.request_secs", config.timeouts.request_secs);
    check_nonzero(&mut errors, "websocket.send_queue", config.websocket.send_queue as u64);
    check_nonzero(&mut errors, "websocket.send_timeout_ms", config.websocket.send_timeout_ms);
    check_nonzero(&mut errors, "security.max_body_size", config.security.max_body_size as u64);
    check_nonzero(&mut errors, "errors.recent_capacity", config.errors.recent_capacity as u64);

    if config.request_log.enabled {
        check_nonempty(&mut errors, "request_log.path", &config.request_log.path);
        check_nonzero(
            &mut errors,
            "request_log.append_timeout_ms",
            config.request_log.append_timeout_ms,
        );
        check_nonzero(
            &mut errors,
            "request_log.max_body_bytes",
            config.request_log.max_body_bytes as u64,
        );
    }

    check_nonempty(&mut errors, "auth.header_token", &config.auth.header_token);
    check_nonempty(&mut errors, "auth.query_token", &config.auth.query_token);
    if config.admin.enabled {
        check_nonempty(&mut errors, "admin.api_key", &config.admin.api_key);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_nonzero(errors: &mut Vec<ValidationError>, field: &'static str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::Zero { field });
    }
}

fn check_nonempty(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError::Empty { field });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn reports_every_problem() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.websocket.send_queue = 0;
        config.request_log.path = "  ".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: "not-an-address".into(),
        }));
        assert!(errors.contains(&ValidationError::Zero { field: "websocket.send_queue" }));
        assert!(errors.contains(&ValidationError::Empty { field: "request_log.path" }));
    }

    #[test]
    fn disabled_sections_are_not_checked() {
        let mut config = AppConfig::default();
        config.request_log.enabled = false;
        config.request_log.path = String::new();
        config.observability.metrics_enabled = false;
        config.observability.metrics_address = "nope".into();
        config.admin.api_key = String::new();

        assert!(validate_config(&config).is_ok());
    }
}
