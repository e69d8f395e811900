//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept thread, snapshot captured per connection)
//!     → connection.rs (in-flight accounting for drain)
//!     → detached worker thread → http::Responder
//! ```
//!
//! # Design Decisions
//! - One OS thread per connection; workers never block process exit
//! - Connections are counted during drain, never force-closed

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{AcceptLoop, Listener, ListenerError};
