use std::{
    collections::BTreeSet,
    io::{self, Stdout, Write},
    sync::Arc,
};

use chrono::NaiveDateTime;

use crate::utils::time::format_window_start;

/// Receives the result of every closed window.
#[cfg_attr(test, mockall::automock)]
pub trait Sink {
    fn emit(&mut self, window_start: NaiveDateTime, projects: &BTreeSet<Arc<str>>)
        -> io::Result<()>;

    /// Called for every single attribution, before windowing.
    fn touched(&mut self, _project: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Human readable journal. Each closed window becomes a header line followed by one tab indented
/// line per project.
pub struct JournalSink<W: Write> {
    out: W,
    width_minutes: u32,
    verbose: bool,
}

impl JournalSink<Stdout> {
    pub fn stdout(width_minutes: u32, verbose: bool) -> Self {
        Self::new(io::stdout(), width_minutes, verbose)
    }
}

impl<W: Write> JournalSink<W> {
    pub fn new(out: W, width_minutes: u32, verbose: bool) -> Self {
        Self {
            out,
            width_minutes,
            verbose,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Sink for JournalSink<W> {
    fn emit(
        &mut self,
        window_start: NaiveDateTime,
        projects: &BTreeSet<Arc<str>>,
    ) -> io::Result<()> {
        writeln!(
            self.out,
            "Projects accessed in the {} minute period starting {}",
            self.width_minutes,
            format_window_start(window_start)
        )?;
        for project in projects {
            writeln!(self.out, "\t{project}")?;
        }
        self.out.flush()
    }

    fn touched(&mut self, project: &str) -> io::Result<()> {
        if self.verbose {
            writeln!(self.out, "Project accessed {project}")?;
        }
        Ok(())
    }
}
