//! Web honeypot library: deception pipeline, data snapshots, telemetry and lifecycle.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod signatures;
pub mod telemetry;
pub mod tunnel;

pub use config::HoneypotConfig;
pub use http::{RequestContext, Responder};
pub use lifecycle::{Control, Harness, HarnessHandle, LifecycleState};
pub use signatures::{RuleScorer, Scorer, Signature, Snapshot, SnapshotStore};
pub use telemetry::{CollectorSink, LogRecord, TelemetrySink};
pub use tunnel::{StunnelManager, TunnelManager};
