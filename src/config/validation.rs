//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (batch sizes > 0, ports valid)
//! - Check that enabled features carry what they need (tunnel certificates)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HoneypotConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::HoneypotConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
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

/// Validate a parsed configuration.
pub fn validate_config(config: &HoneypotConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.trim().is_empty() {
        errors.push(ValidationError::new("listener.bind_address", "must not be empty"));
    }
    if config.listener.max_head_bytes == 0 {
        errors.push(ValidationError::new("listener.max_head_bytes", "must be greater than 0"));
    }

    let telemetry = &config.telemetry;
    match Url::parse(&telemetry.endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "telemetry.endpoint",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("telemetry.endpoint", e.to_string())),
    }
    if !telemetry.health_url.is_empty() {
        if let Err(e) = Url::parse(&telemetry.health_url) {
            errors.push(ValidationError::new("telemetry.health_url", e.to_string()));
        }
    }
    if telemetry.queue_capacity == 0 {
        errors.push(ValidationError::new("telemetry.queue_capacity", "must be greater than 0"));
    }
    if telemetry.batch_size == 0 {
        errors.push(ValidationError::new("telemetry.batch_size", "must be greater than 0"));
    }
    if telemetry.max_attempts == 0 {
        errors.push(ValidationError::new("telemetry.max_attempts", "must be greater than 0"));
    }
    if telemetry.flush_interval_ms == 0 {
        errors.push(ValidationError::new("telemetry.flush_interval_ms", "must be greater than 0"));
    }

    let tunnel = &config.tunnel;
    if tunnel.enabled {
        if tunnel.cert_path.is_empty() {
            errors.push(ValidationError::new("tunnel.cert_path", "required when tunnel is enabled"));
        }
        if tunnel.key_path.is_empty() {
            errors.push(ValidationError::new("tunnel.key_path", "required when tunnel is enabled"));
        }
        if tunnel.accept_port == 0 {
            errors.push(ValidationError::new("tunnel.accept_port", "must be a real port"));
        }
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
