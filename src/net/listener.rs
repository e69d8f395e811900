//! Thread-per-connection TCP listener.
//!
//! # Responsibilities
//! - Bind the configured address
//! - Accept connections on a dedicated thread until stopped
//! - Hand each connection, with the snapshot current at accept time, to a
//!   detached worker thread

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

use crate::http::Responder;
use crate::net::connection::ConnectionTracker;
use crate::observability::metrics;
use crate::signatures::{Scorer, SnapshotStore};
use crate::telemetry::TelemetrySink;

/// Pause after a failed accept so a persistent error (e.g. EMFILE) does not spin.
const ACCEPT_ERROR_PAUSE: Duration = Duration::from_millis(50);

/// Connect timeout for the loopback connection that wakes a blocked accept.
const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to start accept thread: {0}")]
    Spawn(#[source] io::Error),
}

/// A bound, not yet accepting, listening socket.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    pub fn bind(address: &str) -> Result<Self, ListenerError> {
        let bind_err = |source| ListenerError::Bind {
            address: address.to_string(),
            source,
        };
        let inner = TcpListener::bind(address).map_err(bind_err)?;
        let local_addr = inner.local_addr().map_err(bind_err)?;

        tracing::info!(address = %local_addr, "Listener bound");
        Ok(Self { inner, local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start the accept thread.
    pub fn spawn<S, C>(
        self,
        responder: Arc<Responder<S, C>>,
        store: Arc<SnapshotStore>,
        tracker: ConnectionTracker,
    ) -> Result<AcceptLoop, ListenerError>
    where
        S: TelemetrySink,
        C: Scorer,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let wake_addr = wake_address(self.local_addr);
        let thread = thread::Builder::new()
            .name("accept".into())
            .spawn(move || self.accept_until(&flag, responder, store, tracker))
            .map_err(ListenerError::Spawn)?;

        Ok(AcceptLoop {
            stop,
            wake_addr,
            thread: Some(thread),
        })
    }

    fn accept_until<S, C>(
        self,
        stop: &AtomicBool,
        responder: Arc<Responder<S, C>>,
        store: Arc<SnapshotStore>,
        tracker: ConnectionTracker,
    ) where
        S: TelemetrySink,
        C: Scorer,
    {
        loop {
            let accepted = self.inner.accept();
            // Checked after accept returns: `AcceptLoop::stop` wakes us with a connection.
            if stop.load(Ordering::Acquire) {
                break;
            }
            let (stream, peer) = match accepted {
                Ok(accepted) => accepted,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                    metrics::record_peer_error("accept");
                    thread::sleep(ACCEPT_ERROR_PAUSE);
                    continue;
                }
            };

            let snapshot = store.current();
            let guard = tracker.track();
            let responder = Arc::clone(&responder);
            tracing::debug!(peer = %peer, connection_id = %guard.id(), "Connection accepted");

            let spawned = thread::Builder::new()
                .name(guard.id().to_string())
                .spawn(move || {
                    let _guard = guard;
                    responder.handle(stream, peer, &snapshot);
                });
            if let Err(e) = spawned {
                tracing::error!(peer = %peer, error = %e, "Failed to spawn connection worker");
            }
        }
        tracing::info!(address = %self.local_addr, "Listener stopped accepting");
    }
}

/// Handle to a running accept thread.
#[derive(Debug)]
pub struct AcceptLoop {
    stop: Arc<AtomicBool>,
    wake_addr: SocketAddr,
    thread: Option<JoinHandle<()>>,
}

impl AcceptLoop {
    /// Stop accepting and close the listening socket. In-flight workers keep running.
    pub fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.stop.store(true, Ordering::Release);

        if let Err(e) = TcpStream::connect_timeout(&self.wake_addr, WAKE_TIMEOUT) {
            // The thread exits on the next accepted connection instead.
            tracing::warn!(address = %self.wake_addr, error = %e, "Could not wake accept thread, detaching it");
            return;
        }
        if thread.join().is_err() {
            tracing::error!("Accept thread panicked");
        }
    }
}

impl Drop for AcceptLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Address a local client can reach the listener on.
fn wake_address(local_addr: SocketAddr) -> SocketAddr {
    let ip = match local_addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local_addr.port())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_reports_ephemeral_port() {
        let listener = Listener::bind("127.0.0.1:0").unwrap();
        assert_ne!(listener.local_addr().port(), 0);
    }

    #[test]
    fn bind_conflict_is_an_error() {
        let first = Listener::bind("127.0.0.1:0").unwrap();
        let taken = first.local_addr().to_string();
        let err = Listener::bind(&taken).unwrap_err();
        assert!(matches!(err, ListenerError::Bind { .. }));
    }

    #[test]
    fn wildcard_binds_are_woken_over_loopback() {
        let any: SocketAddr = "0.0.0.0:8080".parse().unwrap();
        assert_eq!(wake_address(any), "127.0.0.1:8080".parse().unwrap());
        let any6: SocketAddr = "[::]:8080".parse().unwrap();
        assert_eq!(wake_address(any6), "[::1]:8080".parse().unwrap());
        let fixed: SocketAddr = "192.0.2.7:80".parse().unwrap();
        assert_eq!(wake_address(fixed), fixed);
    }
}
