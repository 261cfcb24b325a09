//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and formats (ports, sizes, path patterns)
//!
//! Returns every problem found, not just the first.

use std::fmt;

use crate::config::schema::{parse_size, AppConfig, ServerConfig};
use crate::pipeline::path::PathFilter;

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the whole application config.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_server(&config.webserver);

    if !matches!(config.logging.format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "logging.format",
            format!("expected 'pretty' or 'json', got '{}'", config.logging.format),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the webserver block only.
pub fn validate_server(config: &ServerConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(host) = &config.host {
        if host.trim().is_empty() {
            errors.push(ValidationError::new("webserver.host", "must not be empty"));
        }
    }

    if let Some(port) = &config.port {
        if let Err(message) = port.resolve() {
            errors.push(ValidationError::new("webserver.port", message));
        }
    }

    if parse_size(&config.json_body_size_limit).is_none() {
        errors.push(ValidationError::new(
            "webserver.json_body_size_limit",
            format!("'{}' is not a size", config.json_body_size_limit),
        ));
    }

    if let Err(e) = PathFilter::parse(&config.ssl.urls) {
        errors.push(ValidationError::new("webserver.ssl.urls", e.to_string()));
    }

    if let Err(e) = PathFilter::parse(&config.cache_control.urls) {
        errors.push(ValidationError::new("webserver.cache_control.urls", e.to_string()));
    }

    if config.session.name.trim().is_empty() {
        errors.push(ValidationError::new("webserver.session.name", "must not be empty"));
    }

    errors
}
