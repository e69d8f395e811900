//! stunnel-backed TLS front.
//!
//! # Responsibilities
//! - Generate an stunnel configuration forwarding the TLS port to the plain listener
//! - Launch stunnel after the startup delay
//! - Kill the child process on shutdown
//!
//! # Design Decisions
//! - Launch failures are logged, not fatal: plain HTTP keeps working
//! - The child is `kill_on_drop` so a crashed harness does not leak it

use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};

use crate::config::TunnelConfig;
use crate::tunnel::{TunnelError, TunnelManager};

/// Render the stunnel service definition.
pub fn render_config(config: &TunnelConfig, port: u16) -> String {
    format!(
        "foreground = yes\n\
         pid =\n\
         \n\
         [honeypot-https]\n\
         accept = {accept}\n\
         connect = 127.0.0.1:{port}\n\
         cert = {cert}\n\
         key = {key}\n",
        accept = config.accept_port,
        port = port,
        cert = config.cert_path,
        key = config.key_path,
    )
}

/// Runs stunnel as a child process.
pub struct StunnelManager {
    config: TunnelConfig,
    child: Arc<Mutex<Option<Child>>>,
    /// Pending delayed launch, aborted if shutdown comes first.
    pending: StdMutex<Option<AbortHandle>>,
}

impl StunnelManager {
    pub fn new(config: TunnelConfig) -> Self {
        Self {
            config,
            child: Arc::new(Mutex::new(None)),
            pending: StdMutex::new(None),
        }
    }

    async fn launch(config: &TunnelConfig, port: u16) -> Result<Child, TunnelError> {
        write_config(&config.config_path, &render_config(config, port)).await?;
        let child = Command::new(&config.binary)
            .arg(&config.config_path)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TunnelError::Spawn {
                binary: config.binary.clone(),
                source,
            })?;
        Ok(child)
    }
}

async fn write_config(path: &Path, content: &str) -> Result<(), TunnelError> {
    tokio::fs::write(path, content)
        .await
        .map_err(|source| TunnelError::Config {
            path: path.to_path_buf(),
            source,
        })
}

impl TunnelManager for StunnelManager {
    fn start(&self, delay: Duration, port: u16) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            tracing::info!("Tunnel disabled");
            return None;
        }

        let config = self.config.clone();
        let slot = Arc::clone(&self.child);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match Self::launch(&config, port).await {
                Ok(child) => {
                    tracing::info!(
                        pid = child.id(),
                        accept_port = config.accept_port,
                        forward_port = port,
                        "Tunnel started"
                    );
                    *slot.lock().await = Some(child);
                }
                Err(e) => tracing::error!(error = %e, "Failed to start tunnel"),
            }
        });
        *self.pending.lock().expect("tunnel mutex poisoned") = Some(task.abort_handle());
        Some(task)
    }

    async fn shutdown(&self) {
        let pending = self.pending.lock().expect("tunnel mutex poisoned").take();
        if let Some(pending) = pending {
            pending.abort();
        }
        let Some(mut child) = self.child.lock().await.take() else {
            return;
        };
        match child.kill().await {
            Ok(()) => tracing::info!("Tunnel stopped"),
            Err(e) => tracing::warn!(error = %e, "Failed to stop tunnel"),
        }
    }
}
