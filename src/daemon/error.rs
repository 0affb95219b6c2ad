//! Errors that can stop the daemon. Only startup problems are represented here: everything that
//! happens once events are flowing is logged and absorbed by the pipeline.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("Could not watch {path}: it does not exist")]
    MissingRoot { path: PathBuf },

    #[error("Could not watch {path}: it is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("Failed to initialize watcher: {reason}")]
    WatcherInit { reason: String },

    #[error("Cannot watch directory {path}: {reason}")]
    RegisterFailed { path: PathBuf, reason: String },

    #[error("Invalid project configuration: {reason}")]
    InvalidProject { reason: String },
}

impl From<notify::Error> for DaemonError {
    fn from(e: notify::Error) -> Self {
        DaemonError::WatcherInit {
            reason: e.to_string(),
        }
    }
}
