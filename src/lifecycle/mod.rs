//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Telemetry start (retry) → Load data → Bind (retry) → Tunnel
//!
//! Listening (harness.rs):
//!     Reload event → new Snapshot swapped into the store
//!
//! Shutdown (shutdown.rs):
//!     Stop accepting → Drain connections → Telemetry → Tunnel → Stopped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown event
//!     SIGHUP → Reload event
//! ```
//!
//! # States
//! ```text
//! Unstarted → Starting → Listening → Draining → Stopped
//!                  └──────────────────────↗ (shutdown during startup)
//! ```
//!
//! # Design Decisions
//! - Every trigger is an event on one channel, handled by the harness task
//! - Drain has a deadline; connections still open after it are left running
//! - Release runs at most once

pub mod control;
pub mod harness;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use control::{Control, LifecycleEvent};
pub use harness::{Harness, HarnessError, HarnessHandle};
pub use signals::forward_signals;

/// Observable harness state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    Unstarted,
    Starting,
    Listening,
    Draining,
    Stopped,
}
