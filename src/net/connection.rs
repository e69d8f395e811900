//! Connection lifetime tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Count in-flight connections for the drain phase
//! - Publish the active-connection gauge

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Counter {
    active: Mutex<u64>,
    idle: Condvar,
}

/// Tracks in-flight connections across worker threads.
///
/// Workers hold a [`ConnectionGuard`]; the drain phase waits on
/// [`ConnectionTracker::wait_idle`] until every guard is dropped.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    inner: Arc<Counter>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        let mut active = self.inner.active.lock().expect("connection counter mutex poisoned");
        *active += 1;
        metrics::set_active_connections(*active);
        ConnectionGuard {
            inner: Arc::clone(&self.inner),
            id: ConnectionId::new(),
        }
    }

    pub fn active_count(&self) -> u64 {
        *self.inner.active.lock().expect("connection counter mutex poisoned")
    }

    /// Block until no connections remain or `timeout` elapses.
    /// Returns the number still active.
    pub fn wait_idle(&self, timeout: Duration) -> u64 {
        let deadline = Instant::now() + timeout;
        let mut active = self.inner.active.lock().expect("connection counter mutex poisoned");
        while *active > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            active = self
                .inner
                .idle
                .wait_timeout(active, remaining)
                .expect("connection counter mutex poisoned")
                .0;
        }
        *active
    }
}

/// Guard that tracks a connection's lifetime.
#[derive(Debug)]
pub struct ConnectionGuard {
    inner: Arc<Counter>,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        // Poisoning here would mean a worker panicked while counting; skip rather than panic in drop.
        if let Ok(mut active) = self.inner.active.lock() {
            *active = active.saturating_sub(1);
            metrics::set_active_connections(*active);
            if *active == 0 {
                self.inner.idle.notify_all();
            }
        }
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}
