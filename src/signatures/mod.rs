//! Signature subsystem.
//!
//! # Data Flow
//! ```text
//! Startup / reload:
//!     signatures.json, responses.json, response_customizations.json
//!     → loader.rs (parse, drop unusable entries, degrade to empty)
//!     → Snapshot (immutable)
//!     → SnapshotStore (atomic swap)
//!
//! Per request:
//!     SnapshotStore::current() captured at accept time
//!     → scorer.rs scores every signature in order
//!     → responder picks a response id from the best one
//! ```
//!
//! # Design Decisions
//! - Snapshots are replaced, never mutated in place
//! - Signature order is significant: first of equal scores wins
//! - The scorer is a trait so the matching strategy can be swapped

pub mod loader;
pub mod model;
pub mod scorer;
pub mod snapshot;

pub use loader::{load_snapshot, DataError};
pub use model::{Response, ResponseId, Rule, Signature, DEFAULT_RESPONSE_ID};
pub use scorer::{RuleScorer, Scorer};
pub use snapshot::{Customizations, Snapshot, SnapshotStore};
