//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, names and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FinalizerConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use crate::config::schema::FinalizerConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid {field}: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("template extension must start with '.': {0}")]
    InvalidExtension(String),

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
}

pub fn validate_config(config: &FinalizerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    let templates = &config.templates;
    if !templates.extension.starts_with('.') {
        errors.push(ValidationError::InvalidExtension(templates.extension.clone()));
    }
    let required = [
        ("templates.error_template", &templates.error_template),
        ("templates.crash_template", &templates.crash_template),
        ("negotiation.no_template_param", &config.negotiation.no_template_param),
        ("negotiation.default_domain", &config.negotiation.default_domain),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            errors.push(ValidationError::Empty(field));
        }
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
        assert_eq!(validate_config(&FinalizerConfig::default()), Ok(()));
    }

    #[test]
    fn test_all_errors_reported() {
        let mut config = FinalizerConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.timeouts.request_secs = 0;
        config.templates.extension = "hbs".into();
        config.templates.crash_template = " ".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidAddress {
                    field: "listener.bind_address",
                    value: "not-an-address".into(),
                },
                ValidationError::ZeroTimeout,
                ValidationError::InvalidExtension("hbs".into()),
                ValidationError::Empty("templates.crash_template"),
            ]
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = FinalizerConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
