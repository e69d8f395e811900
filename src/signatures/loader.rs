//! Loading honeypot data files.
//!
//! # Responsibilities
//! - Read signatures, responses and customizations from JSON files
//! - Drop individual entries that cannot be used (malformed entry, empty
//!   candidate list, bad regex)
//! - Degrade any unreadable artifact to an empty collection
//!
//! # Design Decisions
//! - Each artifact fails independently; one broken file never empties the others
//! - Nothing here is fatal: a honeypot with no rules still answers with response 1

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::DataConfig;
use crate::signatures::model::{Response, ResponseId, Signature};
use crate::signatures::snapshot::{Customizations, Snapshot};

/// Error type for a single data file.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, DataError> {
    let content = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| DataError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn or_empty<T: Default>(what: &str, result: Result<T, DataError>) -> T {
    result.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to load {}, using an empty set", what);
        T::default()
    })
}

/// Read the ordered signature list, keeping only usable entries.
pub fn try_load_signatures(path: &Path) -> Result<Vec<Signature>, DataError> {
    let raw: Vec<serde_json::Value> = read_json(path)?;
    let mut signatures = Vec::with_capacity(raw.len());
    for (index, entry) in raw.into_iter().enumerate() {
        let mut signature: Signature = match serde_json::from_value(entry) {
            Ok(signature) => signature,
            Err(e) => {
                tracing::warn!(index, error = %e, "Malformed signature entry, skipping");
                continue;
            }
        };
        if signature.responses.is_empty() {
            tracing::warn!(signature = %signature.label(), "Signature has no responses, skipping");
            continue;
        }
        if let Err(e) = signature.compile() {
            tracing::warn!(signature = %signature.label(), error = %e, "Signature has an invalid pattern, skipping");
            continue;
        }
        signatures.push(signature);
    }
    Ok(signatures)
}

pub fn try_load_responses(path: &Path) -> Result<HashMap<ResponseId, Response>, DataError> {
    read_json(path)
}

pub fn try_load_customizations(path: &Path) -> Result<Customizations, DataError> {
    read_json(path)
}

pub fn load_signatures(path: &Path) -> Vec<Signature> {
    or_empty("signatures", try_load_signatures(path))
}

pub fn load_responses(path: &Path) -> HashMap<ResponseId, Response> {
    or_empty("responses", try_load_responses(path))
}

pub fn load_customizations(path: &Path) -> Customizations {
    or_empty("response customizations", try_load_customizations(path))
}

/// Build a complete snapshot from the configured files.
pub fn load_snapshot(data: &DataConfig) -> Snapshot {
    let signatures = load_signatures(&data.signatures_path);
    let responses = load_responses(&data.responses_path);
    let customizations = load_customizations(&data.customizations_path);
    Snapshot::new(signatures, responses, customizations)
}
