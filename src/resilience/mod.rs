//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Startup dependency (telemetry start, port bind):
//!     → retries.rs (retry forever with fixed backoff)
//!
//! Telemetry delivery:
//!     → backoff.rs (exponential backoff with jitter, bounded attempts)
//! ```
//!
//! # Design Decisions
//! - The service has no value without telemetry egress or its port: wait, never abort
//! - Delivery retries are bounded so one bad batch cannot stall the queue

pub mod backoff;
pub mod retries;

pub use backoff::Backoff;
pub use retries::retry_forever;
