//! Shutdown coordination.
//!
//! # Responsibilities
//! - Guard the release sequence so it runs at most once
//! - Stop accepting, wait for in-flight connections, release collaborators

use std::time::Duration;
use tokio::sync::watch;

use crate::lifecycle::LifecycleState;
use crate::net::{AcceptLoop, ConnectionTracker};
use crate::telemetry::TelemetrySink;
use crate::tunnel::TunnelManager;

/// Move to `Draining` if not already draining or stopped.
///
/// Returns `false` when another caller got there first.
pub fn begin_drain(state: &watch::Sender<LifecycleState>) -> bool {
    state.send_if_modified(|current| match current {
        LifecycleState::Draining | LifecycleState::Stopped => false,
        _ => {
            *current = LifecycleState::Draining;
            true
        }
    })
}

/// Release sequence: stop accepting, drain, then shut down sink and tunnel.
pub async fn drain<S, T>(
    accept: Option<AcceptLoop>,
    tracker: ConnectionTracker,
    timeout: Duration,
    sink: &S,
    tunnel: &T,
) where
    S: TelemetrySink,
    T: TunnelManager,
{
    if let Some(mut accept) = accept {
        if let Err(e) = tokio::task::spawn_blocking(move || accept.stop()).await {
            tracing::error!(error = %e, "Failed to stop accept thread");
        }
    }

    let active = tracker.active_count();
    if active > 0 {
        tracing::info!(active, timeout_secs = timeout.as_secs(), "Waiting for in-flight connections");
    }
    match tokio::task::spawn_blocking(move || tracker.wait_idle(timeout)).await {
        Ok(0) => {}
        Ok(remaining) => tracing::warn!(remaining, "Drain timeout elapsed, leaving connections behind"),
        Err(e) => tracing::error!(error = %e, "Failed waiting for connections"),
    }

    sink.shutdown().await;
    tunnel.shutdown().await;
}
