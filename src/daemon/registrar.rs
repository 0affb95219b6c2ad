//! Keeps the set of watched directories in step with the live directory tree.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use tracing::{debug, info};
use walkdir::WalkDir;

use super::{
    attribution::ProjectWatch,
    error::DaemonError,
    watch::{DirectoryWatcher, WatchEvent, WatchHandle},
};

/// Sole owner of the watcher and of every handle it hands out. The table maps each live handle
/// back to the directory it was registered for.
pub struct Registrar {
    watcher: Box<dyn DirectoryWatcher>,
    table: HashMap<WatchHandle, PathBuf>,
}

impl Registrar {
    pub fn new(watcher: Box<dyn DirectoryWatcher>) -> Self {
        Self {
            watcher,
            table: HashMap::new(),
        }
    }

    /// Startup registration. Any failure here is fatal.
    pub fn register_watches(&mut self, watches: &[ProjectWatch]) -> Result<(), DaemonError> {
        for watch in watches {
            for root in &watch.roots {
                if !root.exists() {
                    return Err(DaemonError::MissingRoot { path: root.clone() });
                }
                if !root.is_dir() {
                    return Err(DaemonError::NotADirectory { path: root.clone() });
                }
                if watch.recursive {
                    self.register_tree(root)?;
                } else {
                    self.register(root)?;
                }
            }
            info!(
                "Watching project '{}' ({} directories registered so far)",
                watch.name,
                self.table.len()
            );
        }
        Ok(())
    }

    /// Returns false if `dir` was already registered.
    fn register(&mut self, dir: &Path) -> Result<bool, DaemonError> {
        let handle = self.watcher.register(dir)?;
        Ok(self.table.insert(handle, dir.to_path_buf()).is_none())
    }

    /// Registers `start` and every directory below it, depth first, without following links.
    fn register_tree(&mut self, start: &Path) -> Result<usize, DaemonError> {
        let mut registered = 0;
        for entry in WalkDir::new(start).follow_links(false) {
            let entry = entry.map_err(|e| DaemonError::RegisterFailed {
                path: e.path().unwrap_or(start).to_path_buf(),
                reason: e.to_string(),
            })?;
            if entry.file_type().is_dir() && self.register(entry.path())? {
                registered += 1;
            }
        }
        Ok(registered)
    }

    /// Registers a freshly created subtree. This races with the filesystem, so failures are
    /// logged and skipped. Returns how many directories were not registered before.
    pub fn expand(&mut self, dir: &Path) -> usize {
        let mut registered = 0;
        for entry in WalkDir::new(dir).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping part of new subtree {}: {e}", dir.display());
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            match self.register(entry.path()) {
                Ok(true) => registered += 1,
                Ok(false) => (),
                Err(e) => debug!("Failed to register new directory: {e}"),
            }
        }
        debug!("Registered {registered} directories under {}", dir.display());
        registered
    }

    pub fn directory_of(&self, handle: WatchHandle) -> Option<&Path> {
        self.table.get(&handle).map(PathBuf::as_path)
    }

    pub async fn next_event(&mut self) -> Option<WatchEvent> {
        self.watcher.next_event().await
    }

    /// Re-arms `handle`. An invalid handle is released and dropped from the table.
    pub fn reset(&mut self, handle: WatchHandle) -> bool {
        if self.watcher.reset(handle) {
            return true;
        }
        self.watcher.unregister(handle);
        if let Some(dir) = self.table.remove(&handle) {
            debug!("Stopped watching {}", dir.display());
        }
        false
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
