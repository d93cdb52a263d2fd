//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check semantic constraints serde cannot express.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.service.name.trim().is_empty() {
        errors.push(ValidationError::new("service.name", "must not be empty"));
    }

    if config.wide_event.marker.trim().is_empty() {
        errors.push(ValidationError::new("wide_event.marker", "must not be empty"));
    }

    for path in &config.wide_event.excluded_paths {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(
                "wide_event.excluded_paths",
                format!("'{}' must start with '/'", path),
            ));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.simulator.enabled && config.simulator.target_url.parse::<reqwest::Url>().is_err() {
        errors.push(ValidationError::new(
            "simulator.target_url",
            format!("'{}' is not a valid URL", config.simulator.target_url),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ServiceConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServiceConfig::default();
        config.listener.bind_address = "not-an-addr".into();
        config.wide_event.marker = " ".into();
        config.wide_event.excluded_paths.push("health".into());
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "wide_event.marker",
                "wide_event.excluded_paths",
                "timeouts.request_secs",
            ]
        );
    }

    #[test]
    fn test_simulator_url_checked_only_when_enabled() {
        let mut config = ServiceConfig::default();
        config.simulator.target_url = "::nope::".into();
        assert!(validate_config(&config).is_ok());

        config.simulator.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "simulator.target_url");
    }
}
