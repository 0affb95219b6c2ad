use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::level_filters::LevelFilter;

use crate::config::{ProjectArg, Settings};

#[derive(Parser, Debug)]
#[command(name = "projtrack", version, long_about = None)]
#[command(about = "Records which projects had files touched in every minute of the day")]
pub struct DaemonArgs {
    #[arg(long, help = "JSON file with projects and settings")]
    pub config: Option<PathBuf>,
    #[arg(
        long = "project",
        value_name = "NAME=ROOT[,ROOT...]",
        help = "Watch the given directories recursively as one project. Can be repeated"
    )]
    pub projects: Vec<ProjectArg>,
    #[arg(long, value_name = "MINUTES", help = "Width of a reporting window")]
    pub window: Option<u32>,
    #[arg(long = "flush-on-exit", help = "Report the unfinished window on shutdown")]
    pub flush_on_exit: bool,
    #[arg(long, help = "Print every single project access")]
    pub verbose: bool,
    #[arg(
        long,
        help = "Application directory for logs. By default $XDG_STATE_HOME or $HOME/.local/state"
    )]
    pub dir: Option<PathBuf>,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}

impl DaemonArgs {
    /// Settings from `--config` with command line values layered on top.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };
        settings
            .projects
            .extend(self.projects.iter().map(|ProjectArg(watch)| watch.clone()));
        if let Some(window) = self.window {
            settings.window_minutes = window;
        }
        settings.flush_on_exit |= self.flush_on_exit;
        settings.validate()?;
        Ok(settings)
    }
}
