use std::{
    collections::{HashMap, VecDeque},
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use notify::{
    event::{ModifyKind, RenameMode},
    Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, trace, warn};

use super::{ensure_directory, DirectoryWatcher, EntryKind, WatchEvent, WatchHandle};
use crate::daemon::error::DaemonError;

/// [DirectoryWatcher] backed by [notify]. The notify callback runs on its own thread and only
/// forwards raw events into a bounded queue; translating them into per directory events happens
/// on the pipeline's thread.
pub struct NotifyWatcher {
    watcher: RecommendedWatcher,
    events: mpsc::Receiver<notify::Result<Event>>,
    overflowed: Arc<AtomicBool>,
    directories: HashMap<WatchHandle, PathBuf>,
    handles: HashMap<PathBuf, WatchHandle>,
    next_handle: u64,
    pending: VecDeque<WatchEvent>,
}

impl NotifyWatcher {
    pub fn new(buffer: usize) -> Result<Self, DaemonError> {
        let (tx, rx) = mpsc::channel(buffer);
        let overflowed = Arc::new(AtomicBool::new(false));

        let flag = overflowed.clone();
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Err(TrySendError::Full(_)) = tx.try_send(res) {
                flag.store(true, Ordering::Release);
            }
        })?;

        Ok(Self {
            watcher,
            events: rx,
            overflowed,
            directories: HashMap::new(),
            handles: HashMap::new(),
            next_handle: 0,
            pending: VecDeque::new(),
        })
    }

    fn translate(&mut self, event: Event) {
        if event.need_rescan() {
            self.pending.push_back(WatchEvent::Overflow);
            return;
        }

        let changes: Vec<(&PathBuf, EntryKind)> = match event.kind {
            EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                event.paths.iter().map(|p| (p, EntryKind::Create)).collect()
            }
            EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                event.paths.iter().map(|p| (p, EntryKind::Delete)).collect()
            }
            // Paths come as [from, to].
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event
                .paths
                .iter()
                .zip([EntryKind::Delete, EntryKind::Create])
                .collect(),
            EventKind::Modify(_) => event.paths.iter().map(|p| (p, EntryKind::Modify)).collect(),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => {
                trace!("Ignoring {:?}", event.kind);
                return;
            }
        };

        for (path, kind) in changes {
            if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
                if let Some(&handle) = self.handles.get(parent) {
                    self.pending.push_back(WatchEvent::Entry {
                        handle,
                        kind,
                        name: PathBuf::from(name),
                    });
                }
            }
            if kind == EntryKind::Delete {
                self.invalidate_below(path);
            }
        }
    }

    /// A watched directory that is deleted or renamed away takes its whole registered subtree
    /// with it. Renamed directories keep their OS watches but notify reports them under the new
    /// path, so the old handles would never see another event. Each of them gets an event on
    /// its own handle so that the following reset drops it.
    fn invalidate_below(&mut self, path: &Path) {
        let mut gone: Vec<WatchHandle> = self
            .directories
            .iter()
            .filter(|(_, dir)| dir.starts_with(path))
            .map(|(handle, _)| *handle)
            .collect();
        gone.sort();
        self.pending
            .extend(gone.into_iter().map(|handle| WatchEvent::Entry {
                handle,
                kind: EntryKind::Delete,
                name: PathBuf::new(),
            }));
    }
}

#[async_trait]
impl DirectoryWatcher for NotifyWatcher {
    fn register(&mut self, dir: &Path) -> Result<WatchHandle, DaemonError> {
        if let Some(&handle) = self.handles.get(dir) {
            return Ok(handle);
        }
        ensure_directory(dir)?;

        self.watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| DaemonError::RegisterFailed {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })?;

        let handle = WatchHandle::new(self.next_handle);
        self.next_handle += 1;
        self.directories.insert(handle, dir.to_path_buf());
        self.handles.insert(dir.to_path_buf(), handle);
        debug!("Watching {} as {handle:?}", dir.display());
        Ok(handle)
    }

    async fn next_event(&mut self) -> Option<WatchEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.overflowed.swap(false, Ordering::AcqRel) {
                return Some(WatchEvent::Overflow);
            }
            match self.events.recv().await? {
                Ok(event) => self.translate(event),
                Err(e) => warn!("File system event error: {e}"),
            }
        }
    }

    fn reset(&mut self, handle: WatchHandle) -> bool {
        self.directories.get(&handle).is_some_and(|dir| {
            fs::symlink_metadata(dir)
                .map(|meta| meta.is_dir())
                .unwrap_or(false)
        })
    }

    fn unregister(&mut self, handle: WatchHandle) {
        let Some(dir) = self.directories.remove(&handle) else {
            return;
        };
        self.handles.remove(&dir);
        // The OS usually drops the watch by itself once the directory is deleted.
        if let Err(e) = self.watcher.unwatch(&dir) {
            debug!("Failed to unwatch {}: {e}", dir.display());
        }
    }
}
