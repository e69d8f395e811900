//! Data file watcher for hot reload.

use std::path::PathBuf;
use std::time::Duration;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::lifecycle::Control;

/// Monitors the honeypot data files and requests a reload when they change.
pub struct DataWatcher {
    paths: Vec<PathBuf>,
    control: Control,
}

impl DataWatcher {
    /// Create a new DataWatcher over the given files.
    pub fn new(paths: Vec<PathBuf>, control: Control) -> Self {
        Self { paths, control }
    }

    /// Start watching in a background thread.
    ///
    /// The returned watcher must be kept alive for as long as events are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let control = self.control.clone();

        let mut watcher = RecommendedWatcher::new(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(paths = ?event.paths, "Data file change detected, requesting reload");
                        control.reload();
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            }
        }, Config::default().with_poll_interval(Duration::from_secs(2)))?;

        for path in &self.paths {
            if !path.exists() {
                tracing::warn!(path = ?path, "Data file does not exist, not watching it");
                continue;
            }
            watcher.watch(path, RecursiveMode::NonRecursive)?;
        }

        tracing::info!(paths = ?self.paths, "Data watcher started");
        Ok(watcher)
    }
}
