//! Immutable signature/response/customization tables and the store that
//! publishes them to connection workers.

use std::collections::HashMap;
use std::sync::Arc;
use arc_swap::ArcSwap;
use serde::Deserialize;

use crate::signatures::model::{Response, ResponseId, Signature};

/// Tag name to literal replacement text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Customizations(HashMap<String, String>);

impl Customizations {
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.0.get(tag).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Customizations {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Everything a worker needs to answer a request.
///
/// Built whole by the loader and never mutated; a reload publishes a new one.
#[derive(Debug)]
pub struct Snapshot {
    /// In configured order; earlier signatures win ties.
    pub signatures: Vec<Signature>,
    pub responses: HashMap<ResponseId, Response>,
    pub customizations: Customizations,
}

impl Snapshot {
    pub fn new(
        signatures: Vec<Signature>,
        responses: HashMap<ResponseId, Response>,
        customizations: Customizations,
    ) -> Self {
        Self {
            signatures,
            responses,
            customizations,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), HashMap::new(), Customizations::default())
    }

    pub fn response(&self, id: ResponseId) -> Option<&Response> {
        self.responses.get(&id)
    }
}

/// Holds the active snapshot behind an atomic pointer.
#[derive(Debug)]
pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
}

impl SnapshotStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
        }
    }

    /// The snapshot active right now. Callers keep it for a whole request.
    pub fn current(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Atomically publish a new snapshot; holders of the old one are unaffected.
    pub fn replace(&self, snapshot: Snapshot) {
        self.current.store(Arc::new(snapshot));
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(Snapshot::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_does_not_disturb_held_snapshot() {
        let store = SnapshotStore::default();
        let before = store.current();

        let tags: Customizations = [("banner", "nginx")].into_iter().collect();
        store.replace(Snapshot::new(Vec::new(), HashMap::new(), tags));

        assert!(before.customizations.is_empty());
        assert_eq!(store.current().customizations.get("banner"), Some("nginx"));
    }
}
