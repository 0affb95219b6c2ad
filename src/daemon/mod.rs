use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use aggregation::{JournalSink, Sink, WindowAggregator};
use attribution::Attributor;
use pipeline::{Pipeline, PipelineStats};
use registrar::Registrar;
use watch::{DirectoryWatcher, NotifyWatcher};

use crate::{
    config::Settings,
    utils::clock::{Clock, DefaultClock},
};

pub mod aggregation;
pub mod args;
pub mod attribution;
pub mod error;
pub mod pipeline;
pub mod registrar;
pub mod shutdown;
pub mod watch;

/// Represents the starting point for the daemon. Returns once every watched directory is gone
/// or the process is interrupted. Only startup failures are reported as errors.
pub async fn start_daemon(settings: Settings, verbose: bool) -> Result<PipelineStats> {
    let watcher = NotifyWatcher::new(settings.event_buffer)?;
    let sink = JournalSink::stdout(settings.window_minutes, verbose);
    let shutdown_token = CancellationToken::new();

    let pipeline = create_pipeline(&settings, watcher, sink, DefaultClock, &shutdown_token)?;

    let shutdown = tokio::spawn(shutdown::detect_shutdown(shutdown_token.clone()));
    let (stats, _) = pipeline.run().await;
    shutdown_token.cancel();
    if let Err(e) = shutdown.await {
        error!("Shutdown listener failed {e:?}");
    }

    Ok(stats)
}

fn create_pipeline<S: Sink>(
    settings: &Settings,
    watcher: impl DirectoryWatcher + 'static,
    sink: S,
    clock: impl Clock,
    shutdown_token: &CancellationToken,
) -> Result<Pipeline<S>> {
    let mut registrar = Registrar::new(Box::new(watcher));
    registrar.register_watches(&settings.projects)?;
    info!(
        "Watching {} directories for {} projects",
        registrar.len(),
        settings.projects.len()
    );

    Ok(Pipeline::new(
        registrar,
        Attributor::new(settings.projects.clone()),
        WindowAggregator::new(sink, Box::new(clock), settings.window_minutes),
        shutdown_token.clone(),
        settings.flush_on_exit,
    ))
}

#[cfg(test)]
mod daemon_tests {
    use std::{fs, time::Duration};

    use anyhow::Result;
    use chrono::Duration as ChronoDuration;
    use tempfile::tempdir;
    use tokio_util::sync::CancellationToken;

    use crate::{
        config::Settings,
        daemon::{
            aggregation::JournalSink,
            attribution::ProjectWatch,
            create_pipeline,
            error::DaemonError,
            watch::NotifyWatcher,
        },
        utils::{clock::testing::ManualClock, logging::TEST_LOGGING},
    };

    fn settings(projects: Vec<ProjectWatch>) -> Settings {
        Settings {
            projects,
            ..Settings::default()
        }
    }

    /// Smoke test running the real OS watcher against a temporary tree. Timing relies on the
    /// watcher delivering events within a few hundred milliseconds.
    #[tokio::test]
    async fn smoke_test_daemon() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let root = dir.path().canonicalize()?;
        let alpha = root.join("alpha");
        fs::create_dir(&alpha)?;

        let settings = settings(vec![ProjectWatch::recursive("Alpha", vec![alpha.clone()])?]);
        let clock = ManualClock::at(10, 0);
        let shutdown_token = CancellationToken::new();
        let pipeline = create_pipeline(
            &settings,
            NotifyWatcher::new(settings.event_buffer)?,
            JournalSink::new(Vec::new(), 1, false),
            clock.clone(),
            &shutdown_token,
        )?;

        let ((stats, aggregator), ()) = tokio::join!(pipeline.run(), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            fs::create_dir(alpha.join("sub")).unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
            fs::write(alpha.join("sub/inner.txt"), "x").unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
            clock.advance(ChronoDuration::minutes(1));
            fs::write(alpha.join("late.txt"), "x").unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
            shutdown_token.cancel();
        });

        assert!(stats.expansions >= 1, "{stats:?}");
        assert!(stats.attributed >= 3, "{stats:?}");
        assert!(aggregator.touched().contains("Alpha"));
        Ok(())
    }

    /// Renaming a watched directory must not leave handles behind under the old name, otherwise
    /// deleting the whole tree never empties the table.
    #[tokio::test]
    async fn stops_after_renamed_tree_is_deleted() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let root = dir.path().canonicalize()?;
        let alpha = root.join("alpha");
        fs::create_dir_all(alpha.join("sub/deep"))?;

        let settings = settings(vec![ProjectWatch::recursive("Alpha", vec![alpha.clone()])?]);
        let shutdown_token = CancellationToken::new();
        let pipeline = create_pipeline(
            &settings,
            NotifyWatcher::new(settings.event_buffer)?,
            JournalSink::new(Vec::new(), 1, false),
            ManualClock::at(10, 0),
            &shutdown_token,
        )?;

        let (finished, ()) = tokio::join!(
            tokio::time::timeout(Duration::from_secs(10), pipeline.run()),
            async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                fs::rename(alpha.join("sub"), alpha.join("sub2")).unwrap();
                tokio::time::sleep(Duration::from_millis(500)).await;
                fs::write(alpha.join("sub2/deep/f"), "x").unwrap();
                tokio::time::sleep(Duration::from_millis(500)).await;
                fs::remove_dir_all(&alpha).unwrap();
            }
        );

        let (stats, _) = finished.expect("pipeline should stop once every directory is gone");
        assert!(!shutdown_token.is_cancelled());
        assert_eq!(stats.expansions, 2, "{stats:?}");
        Ok(())
    }

    #[tokio::test]
    async fn missing_root_fails_startup() -> Result<()> {
        let dir = tempdir()?;
        let settings = settings(vec![ProjectWatch::recursive(
            "Alpha",
            vec![dir.path().join("missing")],
        )?]);

        let result = create_pipeline(
            &settings,
            NotifyWatcher::new(settings.event_buffer)?,
            JournalSink::new(Vec::new(), 1, false),
            ManualClock::at(10, 0),
            &CancellationToken::new(),
        );
        let err = result.err().expect("startup should fail");
        assert!(matches!(
            err.downcast_ref::<DaemonError>(),
            Some(DaemonError::MissingRoot { .. })
        ));
        Ok(())
    }
}
