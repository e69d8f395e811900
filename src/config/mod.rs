//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! honeypot.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → HoneypotConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! Data files (signatures, responses, customizations):
//!     watcher.rs detects change (optional)
//!     → lifecycle reload event
//!     → new snapshot swapped in atomically
//! ```
//!
//! # Design Decisions
//! - The primary config is required; failing to load it is fatal
//! - All fields have defaults to allow minimal configs
//! - Data files are not configuration: they reload without a restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use watcher::DataWatcher;
pub use schema::{
    DataConfig, HoneypotConfig, ListenerConfig, ObservabilityConfig, TelemetryConfig, TunnelConfig,
};
