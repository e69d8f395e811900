//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGHUP)
//! - Translate signals into lifecycle events
//!
//! # Design Decisions
//! - Handlers only forward events; all work happens on the harness task
//! - SIGHUP triggers a data reload, not shutdown
//! - Non-unix targets only get Ctrl-C

use tokio::task::JoinHandle;

use crate::lifecycle::Control;

/// Spawn a task forwarding process signals to `control` for the life of the process.
pub fn forward_signals(control: Control) -> JoinHandle<()> {
    tokio::spawn(listen(control))
}

#[cfg(unix)]
async fn listen(control: Control) {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut term, mut int, mut hup) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
        signal(SignalKind::hangup()),
    ) {
        (Ok(term), Ok(int), Ok(hup)) => (term, int, hup),
        (term, int, hup) => {
            let error = [term.err(), int.err(), hup.err()].into_iter().flatten().next();
            tracing::error!(error = ?error, "Failed to install signal handlers");
            return;
        }
    };

    loop {
        tokio::select! {
            Some(()) = term.recv() => {
                tracing::info!("Received SIGTERM, shutting down");
                control.shutdown();
            }
            Some(()) = int.recv() => {
                tracing::info!("Received SIGINT, shutting down");
                control.shutdown();
            }
            Some(()) = hup.recv() => {
                tracing::info!("Received SIGHUP, reloading data files");
                control.reload();
            }
            else => break,
        }
    }
}

#[cfg(not(unix))]
async fn listen(control: Control) {
    loop {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received Ctrl-C, shutting down");
                control.shutdown();
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                return;
            }
        }
    }
}
