//! Thin layer over the host's directory change facility. Every registration covers the direct
//! children of one directory only; descending into subdirectories is the
//! [Registrar](crate::daemon::registrar::Registrar)'s job.

mod notify_watcher;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

pub use notify_watcher::NotifyWatcher;

use super::error::DaemonError;

/// Token identifying one registered directory while it stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchHandle(u64);

impl WatchHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Create,
    Delete,
    Modify,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Something happened to `name` inside the directory behind `handle`. An empty `name` means
    /// the event concerns that directory itself.
    Entry {
        handle: WatchHandle,
        kind: EntryKind,
        name: PathBuf,
    },
    /// Events were dropped before they could be delivered.
    Overflow,
}

/// Intended to serve as a contract for OS specific watch facilities and for scripted watchers
/// in tests.
#[async_trait]
pub trait DirectoryWatcher: Send {
    /// Subscribes to creation, deletion and modification of direct children of `dir`.
    /// Registering an already registered directory returns the existing handle.
    fn register(&mut self, dir: &Path) -> Result<WatchHandle, DaemonError>;

    /// Waits for the next event. `None` means no further events can ever arrive.
    async fn next_event(&mut self) -> Option<WatchEvent>;

    /// Re-arms `handle` after its events were consumed. Returns false once the directory is
    /// gone; such a handle must be unregistered.
    fn reset(&mut self, handle: WatchHandle) -> bool;

    fn unregister(&mut self, handle: WatchHandle);
}

/// Shared check used by watcher implementations before subscribing to `dir`.
pub(crate) fn ensure_directory(dir: &Path) -> Result<(), DaemonError> {
    match std::fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(DaemonError::NotADirectory {
            path: dir.to_path_buf(),
        }),
        Err(_) => Err(DaemonError::MissingRoot {
            path: dir.to_path_buf(),
        }),
    }
}
