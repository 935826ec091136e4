//! Input source: watches the document file for saves

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};

/// Watches one document and reports when it has been written
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    receiver: Receiver<()>,
    watched_path: PathBuf,
}

impl FileWatcher {
    /// Create a new file watcher for the given path
    pub fn new(path: &Path) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let watched_path = path.to_path_buf();
        let file_name = path.file_name().map(|n| n.to_os_string());

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else {
                return;
            };
            if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                return;
            }
            // Editors that save via rename touch a sibling first, so match
            // on the file name rather than the full path
            if event
                .paths
                .iter()
                .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name)
            {
                let _ = tx.send(());
            }
        })
        .context("Failed to create file watcher")?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", dir.display()))?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            watched_path,
        })
    }

    /// Drain pending change events; true if the file was written since the last call
    pub fn poll_changed(&mut self) -> bool {
        let mut changed = false;
        while self.receiver.try_recv().is_ok() {
            changed = true;
        }
        changed
    }

    /// Get the watched file path
    pub fn path(&self) -> &Path {
        &self.watched_path
    }
}
