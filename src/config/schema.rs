//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::finalizer::intent::DEFAULT_DOMAIN;
use crate::finalizer::ErrorPages;
use crate::templates::TemplateSource;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FinalizerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Template loading and error pages.
    pub templates: TemplateConfig,

    /// How request flags are read.
    pub negotiation: NegotiationConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Template configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Directory scanned for templates.
    pub directory: PathBuf,

    /// Template file extension, stripped from template names.
    pub extension: String,

    /// Page for user-facing failures.
    pub error_template: String,

    /// Page for internal failures.
    pub crash_template: String,

    /// Reload templates when the directory changes.
    pub watch: bool,

    /// Fail renders that reference missing fields.
    pub strict: bool,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        let pages = ErrorPages::default();
        Self {
            directory: PathBuf::from("templates"),
            extension: ".hbs".to_string(),
            error_template: pages.user_facing,
            crash_template: pages.internal,
            watch: false,
            strict: false,
        }
    }
}

impl TemplateConfig {
    pub fn source(&self) -> TemplateSource {
        TemplateSource {
            directory: self.directory.clone(),
            extension: self.extension.clone(),
        }
    }

    pub fn error_pages(&self) -> ErrorPages {
        ErrorPages {
            user_facing: self.error_template.clone(),
            internal: self.crash_template.clone(),
        }
    }
}

/// Request flag configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NegotiationConfig {
    /// Query parameter that disables templating.
    pub no_template_param: String,

    /// Domain used when the route carries none.
    pub default_domain: String,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            no_template_param: "noTemplate".to_string(),
            default_domain: DEFAULT_DOMAIN.to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
