//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the honeypot.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Root configuration for the honeypot.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HoneypotConfig {
    /// Listener configuration (bind address, port, per-connection limits).
    pub listener: ListenerConfig,

    /// Locations of the signature, response and customization files.
    pub data: DataConfig,

    /// Telemetry collector settings.
    pub telemetry: TelemetryConfig,

    /// Encrypted tunnel (stunnel) settings.
    pub tunnel: TunnelConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address without port (e.g., "0.0.0.0").
    pub bind_address: String,

    /// Plain HTTP port. `0` asks the OS for an ephemeral port.
    pub port: u16,

    /// Fixed delay between bind attempts while the port is busy.
    pub bind_retry_secs: u64,

    /// Read/write deadline on attacker sockets. `0` disables it.
    pub io_timeout_secs: u64,

    /// Largest accepted request head in bytes.
    pub max_head_bytes: usize,

    /// Largest request body captured for telemetry.
    pub max_body_bytes: usize,

    /// How long shutdown waits for in-flight connections.
    pub drain_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8000,
            bind_retry_secs: 10,
            io_timeout_secs: 30,
            max_head_bytes: 64 * 1024,
            max_body_bytes: 1024 * 1024,
            drain_timeout_secs: 2,
        }
    }
}

impl ListenerConfig {
    /// Full `host:port` string to bind.
    pub fn socket_address(&self) -> String {
        if self.bind_address.contains(':') && !self.bind_address.starts_with('[') {
            format!("[{}]:{}", self.bind_address, self.port)
        } else {
            format!("{}:{}", self.bind_address, self.port)
        }
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        (self.io_timeout_secs > 0).then(|| Duration::from_secs(self.io_timeout_secs))
    }
}

/// Honeypot data files. All of them are optional at runtime.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DataConfig {
    /// Ordered JSON array of signatures.
    pub signatures_path: PathBuf,

    /// JSON object mapping response id to response.
    pub responses_path: PathBuf,

    /// JSON object mapping tag name to replacement text.
    pub customizations_path: PathBuf,

    /// Reload automatically when one of the files changes.
    pub watch: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            signatures_path: PathBuf::from("signatures.json"),
            responses_path: PathBuf::from("responses.json"),
            customizations_path: PathBuf::from("response_customizations.json"),
            watch: false,
        }
    }
}

/// Telemetry collector configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// URL receiving batches of log records (JSON array, POST).
    pub endpoint: String,

    /// Optional URL probed by `start()`; empty skips the probe.
    pub health_url: String,

    /// Optional bearer token sent with every submission.
    pub api_key: String,

    /// Address reported as `dip`; empty uses the socket's local address.
    pub local_ip: String,

    /// Fixed delay between `start()` attempts.
    pub start_retry_secs: u64,

    /// Capacity of the in-memory queue between workers and the submitter.
    pub queue_capacity: usize,

    /// Records per submission.
    pub batch_size: usize,

    /// Partial batches are flushed at this interval.
    pub flush_interval_ms: u64,

    /// Timeout for a single submission request in seconds.
    pub request_timeout_secs: u64,

    /// Delivery attempts per batch before it is dropped.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub retry_max_delay_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/submit".to_string(),
            health_url: String::new(),
            api_key: String::new(),
            local_ip: String::new(),
            start_retry_secs: 10,
            queue_capacity: 10_000,
            batch_size: 50,
            flush_interval_ms: 5_000,
            request_timeout_secs: 10,
            max_attempts: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 10_000,
        }
    }
}

/// Encrypted tunnel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TunnelConfig {
    /// Start the tunnel at all.
    pub enabled: bool,

    /// stunnel executable (looked up on PATH when relative).
    pub binary: String,

    /// Delay before the tunnel process is launched.
    pub startup_delay_secs: u64,

    /// TLS port accepted by the tunnel.
    pub accept_port: u16,

    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,

    /// Where the generated stunnel configuration is written.
    pub config_path: PathBuf,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            binary: "stunnel".to_string(),
            startup_delay_secs: 2,
            accept_port: 8443,
            cert_path: String::new(),
            key_path: String::new(),
            config_path: PathBuf::from("/tmp/honeypot-stunnel.conf"),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Force debug logging regardless of `log_level`.
    pub debug: bool,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "info".to_string(),
            json: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
