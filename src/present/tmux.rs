// src/present/tmux.rs

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{AsyncRunError, Result};
use crate::job::side_channel::sh_command_line;

use super::{Launch, PresentationKind, PresentationStrategy};

/// Runs the job in a new tmux pane below the current one.
///
/// The pane is created detached (`-d`) so focus stays where it was. Exit-code
/// capture relies entirely on the side channel; tmux gives us no handle to
/// wait on, and closing the pane is left to tmux and the user.
#[derive(Debug, Clone)]
pub struct TmuxPaneStrategy {
    program: String,
    split_percent: u8,
}

impl TmuxPaneStrategy {
    pub fn new(split_percent: u8) -> Self {
        Self {
            program: "tmux".to_string(),
            split_percent,
        }
    }

    /// Use another executable in place of `tmux`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Arguments passed to tmux to open the pane running `wrapped`.
    pub fn split_args(&self, wrapped: &str) -> Vec<String> {
        vec![
            "split-window".to_string(),
            "-v".to_string(),
            "-d".to_string(),
            "-l".to_string(),
            format!("{}%", self.split_percent),
            sh_command_line(wrapped),
        ]
    }
}

impl PresentationStrategy for TmuxPaneStrategy {
    fn kind(&self) -> PresentationKind {
        PresentationKind::MultiplexerPane
    }

    fn start<'a>(
        &'a self,
        wrapped: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Launch>> + Send + 'a>> {
        Box::pin(async move {
            let args = self.split_args(wrapped);
            debug!(program = %self.program, ?args, "opening multiplexer pane");

            let output = Command::new(&self.program)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .output()
                .await
                .map_err(|e| AsyncRunError::Spawn(format!("running {}: {e}", self.program)))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(AsyncRunError::Spawn(format!(
                    "{} split-window failed ({}): {}",
                    self.program,
                    output.status,
                    stderr.trim()
                )));
            }

            info!(split_percent = self.split_percent, "job started in multiplexer pane");
            Ok(Launch::default())
        })
    }
}
