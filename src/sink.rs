// src/sink.rs

//! Output sink ("quickfix" list).
//!
//! The sink receives the whole captured output once, at completion, as a
//! titled list of lines. Opening it is a separate request so the exit
//! handler can decide whether the user gets to see it.

use std::fmt::Debug;
use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

/// Title under which captured output is pushed to the sink.
pub const QUICKFIX_TITLE: &str = "Command output";

pub trait OutputSink: Send + Sync + Debug {
    /// Replace the list with `lines`.
    fn replace(&self, title: &str, lines: Vec<String>);

    /// Show the list to the user.
    fn open(&self);
}

/// Sink for the command-line binary: keeps the last list and prints it to
/// stdout when opened.
#[derive(Debug, Default)]
pub struct QuickfixPrinter {
    list: Mutex<Option<(String, Vec<String>)>>,
}

impl QuickfixPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    fn list(&self) -> MutexGuard<'_, Option<(String, Vec<String>)>> {
        self.list.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write the current list in `title` / `N| line` form.
    pub fn render(&self, out: &mut dyn Write) -> std::io::Result<()> {
        match &*self.list() {
            Some((title, lines)) => {
                writeln!(out, "-- {title} ({} lines) --", lines.len())?;
                for (idx, line) in lines.iter().enumerate() {
                    writeln!(out, "{:>4}| {line}", idx + 1)?;
                }
            }
            None => writeln!(out, "-- no output captured --")?,
        }
        Ok(())
    }
}

impl OutputSink for QuickfixPrinter {
    fn replace(&self, title: &str, lines: Vec<String>) {
        debug!(title, lines = lines.len(), "quickfix list replaced");
        *self.list() = Some((title.to_string(), lines));
    }

    fn open(&self) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        if let Err(e) = self.render(&mut lock) {
            warn!(error = %e, "failed to print quickfix list");
        }
    }
}
