//! Startup orchestration.
//!
//! # Responsibilities
//! - Bring up the telemetry sink, retrying until it answers
//! - Load the data files into the snapshot store
//! - Bind the listening socket, retrying until the address is free
//! - Launch the tunnel and wait for its startup task
//!
//! # Design Decisions
//! - Nothing here is fatal: dependencies are retried, data degrades to empty
//! - Steps run in order; the whole sequence can be dropped by a shutdown

use std::time::Duration;

use crate::config::HoneypotConfig;
use crate::net::Listener;
use crate::resilience::{retry_forever, Backoff};
use crate::signatures::{load_snapshot, SnapshotStore};
use crate::telemetry::TelemetrySink;
use crate::tunnel::TunnelManager;

/// Run the startup sequence and return the bound (not yet accepting) listener.
pub async fn start<S, T>(
    config: &HoneypotConfig,
    sink: &S,
    tunnel: &T,
    store: &SnapshotStore,
) -> Listener
where
    S: TelemetrySink,
    T: TunnelManager,
{
    start_telemetry(sink, config.telemetry.start_retry_secs).await;

    let snapshot = load_snapshot(&config.data);
    tracing::info!(
        signatures = snapshot.signatures.len(),
        responses = snapshot.responses.len(),
        customizations = snapshot.customizations.len(),
        "Data files loaded"
    );
    store.replace(snapshot);

    let listener = bind_with_retry(&config.listener.socket_address(), config.listener.bind_retry_secs).await;

    start_tunnel(
        tunnel,
        Duration::from_secs(config.tunnel.startup_delay_secs),
        listener.local_addr().port(),
    )
    .await;

    listener
}

pub async fn start_telemetry<S: TelemetrySink>(sink: &S, retry_secs: u64) {
    retry_forever("Telemetry start", Backoff::fixed_secs(retry_secs), move || sink.start()).await;
    tracing::info!("Telemetry sink started");
}

pub async fn bind_with_retry(address: &str, retry_secs: u64) -> Listener {
    retry_forever("Bind", Backoff::fixed_secs(retry_secs), move || async move {
        Listener::bind(address)
    })
    .await
}

pub async fn start_tunnel<T: TunnelManager>(tunnel: &T, delay: Duration, port: u16) {
    let Some(handle) = tunnel.start(delay, port) else {
        return;
    };
    if let Err(e) = handle.await {
        tracing::error!(error = %e, "Tunnel startup task failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[tokio::test]
    async fn bind_retries_until_address_frees_up() {
        let blocker = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = blocker.local_addr().unwrap().to_string();

        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            drop(blocker);
        });

        let listener = tokio::time::timeout(Duration::from_secs(10), bind_with_retry(&address, 1))
            .await
            .expect("bind should succeed once the port is released");
        assert_eq!(listener.local_addr().to_string(), address);
        release.await.unwrap();
    }
}
