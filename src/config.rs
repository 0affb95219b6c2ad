//! Settings for the daemon, read from an optional JSON file and merged with command line values.

use std::{path::Path, str::FromStr};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::{
    daemon::{attribution::ProjectWatch, error::DaemonError},
    utils::time::MINUTES_PER_DAY,
};

pub const DEFAULT_WINDOW_MINUTES: u32 = 1;
pub const DEFAULT_EVENT_BUFFER: usize = 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub window_minutes: u32,
    /// Emit the in-flight window on shutdown. Off by default: an unfinished window is dropped.
    pub flush_on_exit: bool,
    /// Capacity of the queue between the OS watcher thread and the pipeline. Events beyond it
    /// are dropped and reported as an overflow.
    pub event_buffer: usize,
    pub projects: Vec<ProjectWatch>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_minutes: DEFAULT_WINDOW_MINUTES,
            flush_on_exit: false,
            event_buffer: DEFAULT_EVENT_BUFFER,
            projects: vec![],
        }
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), DaemonError> {
        if self.projects.is_empty() {
            return Err(DaemonError::InvalidProject {
                reason: "no projects configured".into(),
            });
        }
        if self.window_minutes == 0 || self.window_minutes > MINUTES_PER_DAY {
            return Err(DaemonError::InvalidProject {
                reason: format!(
                    "window width must be between 1 and {MINUTES_PER_DAY} minutes, got {}",
                    self.window_minutes
                ),
            });
        }
        if self.event_buffer == 0 {
            return Err(DaemonError::InvalidProject {
                reason: "event buffer must not be empty".into(),
            });
        }
        self.projects.iter().try_for_each(ProjectWatch::validate)
    }
}

/// Command line form of a recursive project: `NAME=ROOT[,ROOT...]`.
#[derive(Debug, Clone)]
pub struct ProjectArg(pub ProjectWatch);

impl FromStr for ProjectArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, roots) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected NAME=ROOT[,ROOT...], got {s}"))?;
        let roots = roots
            .split(',')
            .filter(|r| !r.is_empty())
            .map(Into::into)
            .collect();
        Ok(ProjectArg(ProjectWatch::recursive(name.trim(), roots)?))
    }
}
