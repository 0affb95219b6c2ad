use std::{fs, path::Path};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn};

use super::{
    aggregation::{Sink, WindowAggregator},
    attribution::Attributor,
    registrar::Registrar,
    watch::{EntryKind, WatchEvent, WatchHandle},
};

/// Counters reported when the pipeline stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    pub events: usize,
    pub attributed: usize,
    pub overflows: usize,
    pub unknown_handles: usize,
    pub expansions: usize,
}

/// Pulls raw directory events, attributes them to projects and feeds the aggregator. Runs until
/// every watched directory is gone, the event source closes or the shutdown token is cancelled.
pub struct Pipeline<S: Sink> {
    registrar: Registrar,
    attributor: Attributor,
    aggregator: WindowAggregator<S>,
    shutdown: CancellationToken,
    flush_on_exit: bool,
    stats: PipelineStats,
}

impl<S: Sink> Pipeline<S> {
    pub fn new(
        registrar: Registrar,
        attributor: Attributor,
        aggregator: WindowAggregator<S>,
        shutdown: CancellationToken,
        flush_on_exit: bool,
    ) -> Self {
        Self {
            registrar,
            attributor,
            aggregator,
            shutdown,
            flush_on_exit,
            stats: PipelineStats::default(),
        }
    }

    /// Executes the event loop.
    pub async fn run(mut self) -> (PipelineStats, WindowAggregator<S>) {
        loop {
            if self.registrar.is_empty() {
                info!("No watched directories left");
                break;
            }

            let event = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Interrupted");
                    break;
                }
                event = self.registrar.next_event() => event,
            };

            match event {
                Some(event) => self.process(event),
                None => {
                    warn!("Watch event source closed");
                    break;
                }
            }
        }

        if self.flush_on_exit {
            if let Err(e) = self.aggregator.flush() {
                error!("Failed to flush the last window {e:?}");
            }
        }
        info!("Pipeline stopped {:?}", self.stats);
        (self.stats, self.aggregator)
    }

    fn process(&mut self, event: WatchEvent) {
        self.stats.events += 1;
        let (handle, kind, name) = match event {
            WatchEvent::Overflow => {
                self.stats.overflows += 1;
                warn!("Watcher dropped events ({} overflows)", self.stats.overflows);
                return;
            }
            WatchEvent::Entry { handle, kind, name } => (handle, kind, name),
        };

        let Some(dir) = self.registrar.directory_of(handle) else {
            self.stats.unknown_handles += 1;
            warn!("Watch handle {handle:?} not recognized");
            return;
        };
        // Events about the watched directory itself only ask for a reset.
        if name.as_os_str().is_empty() {
            debug!("{kind:?} of watched directory {}", dir.display());
            self.reset(handle);
            return;
        }
        let child = dir.join(&name);

        let _span = info_span!("event", ?kind, path = %child.display()).entered();

        let mut any_recursive = false;
        for watch in self.attributor.related(&child) {
            any_recursive |= watch.recursive;
            self.stats.attributed += 1;
            if let Err(e) = self.aggregator.notify(&watch.name) {
                error!("Failed to record access to {} {e:?}", watch.name);
            }
        }

        if any_recursive && kind == EntryKind::Create && is_directory(&child) {
            self.stats.expansions += self.registrar.expand(&child);
        }

        self.reset(handle);
    }

    fn reset(&mut self, handle: WatchHandle) {
        if !self.registrar.reset(handle) {
            debug!("Handle {handle:?} is no longer valid");
        }
    }
}

fn is_directory(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|meta| meta.is_dir())
}
