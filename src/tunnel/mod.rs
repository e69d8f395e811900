//! Encrypted tunnel subsystem.
//!
//! # Data Flow
//! ```text
//! Attacker (TLS, accept_port)
//!     → stunnel child process
//!     → 127.0.0.1:<listener port> (plain HTTP honeypot)
//! ```
//!
//! # Design Decisions
//! - The harness awaits the startup task, then the tunnel runs on its own
//! - The manager is a trait so tests and TLS-less deployments can skip it

pub mod stunnel;

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

pub use stunnel::StunnelManager;

/// Error type for tunnel startup.
#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("cannot write tunnel config {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot launch {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
}

/// Provides the encrypted transport in front of the plain listener.
pub trait TunnelManager: Send + Sync + 'static {
    /// Begin startup after `delay`, forwarding to `port`. The returned task
    /// completes once startup has finished (successfully or not).
    fn start(&self, delay: Duration, port: u16) -> Option<JoinHandle<()>>;

    /// Stop the tunnel. Idempotent.
    fn shutdown(&self) -> impl Future<Output = ()> + Send;
}
