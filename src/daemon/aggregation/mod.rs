//! Tumbling window bookkeeping. Attributions are collapsed into one set of project names per
//! window, and that set is handed to a [Sink] when the first attribution of a later window
//! arrives.

mod sink;

use std::{collections::BTreeSet, sync::Arc};

use anyhow::Result;
use tracing::{debug, error, info};

pub use sink::{JournalSink, Sink};

#[cfg(test)]
pub use sink::MockSink;

use crate::utils::{clock::Clock, time::WindowKey};

pub struct WindowAggregator<S: Sink> {
    sink: S,
    clock: Box<dyn Clock>,
    width_minutes: u32,
    window: WindowKey,
    touched: BTreeSet<Arc<str>>,
}

impl<S: Sink> WindowAggregator<S> {
    pub fn new(sink: S, clock: Box<dyn Clock>, width_minutes: u32) -> Self {
        let window = WindowKey::containing(clock.local_time(), width_minutes);
        Self {
            sink,
            clock,
            width_minutes,
            window,
            touched: BTreeSet::new(),
        }
    }

    /// Records that `project` was touched now. If now belongs to a later window than the one
    /// being collected, the collected window is emitted first. A window without any touches is
    /// never emitted.
    pub fn notify(&mut self, project: &Arc<str>) -> Result<()> {
        debug!("Project accessed {project}");
        if let Err(e) = self.sink.touched(project) {
            error!("Failed to report access to {project} {e:?}");
        }

        let now = WindowKey::containing(self.clock.local_time(), self.width_minutes);
        if now == self.window {
            self.touched.insert(project.clone());
            return Ok(());
        }

        let closed = std::mem::replace(&mut self.window, now);
        let projects = std::mem::take(&mut self.touched);
        self.touched.insert(project.clone());
        self.emit(closed, projects)
    }

    /// Emits the window being collected without waiting for it to close.
    pub fn flush(&mut self) -> Result<()> {
        let projects = std::mem::take(&mut self.touched);
        self.emit(self.window, projects)
    }

    pub fn touched(&self) -> &BTreeSet<Arc<str>> {
        &self.touched
    }

    fn emit(&mut self, window: WindowKey, projects: BTreeSet<Arc<str>>) -> Result<()> {
        if projects.is_empty() {
            return Ok(());
        }
        let start = window.start(self.width_minutes);
        info!("Closing window starting {start} with {} projects", projects.len());
        self.sink.emit(start, &projects)?;
        Ok(())
    }
}
