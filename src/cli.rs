// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::OptionOverrides;
use crate::errors::Result;
use crate::types::Mode;

/// Command-line arguments for `asyncrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "asyncrun",
    version,
    about = "Run a shell command in a split or tmux pane and report how it exited.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `AsyncRun.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Presentation mode: `auto` uses a tmux pane when inside tmux, `term`
    /// always uses the terminal.
    #[arg(long, value_name = "MODE")]
    pub mode: Option<String>,

    /// Capture merged stdout/stderr into the quickfix list.
    #[arg(long)]
    pub log_to_qf: bool,

    #[arg(long)]
    pub open_qf_on_success: bool,

    #[arg(long)]
    pub open_qf_on_error: bool,

    #[arg(long)]
    pub close_on_success: bool,

    #[arg(long)]
    pub close_on_error: bool,

    /// Title used in completion notifications.
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASYNCRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// The command to run; words are joined with single spaces.
    ///
    /// Leading `key=value` words naming a known option (e.g.
    /// `log_to_qf=true make`) are taken as options. Once the first command
    /// word is seen, every later word belongs to the command.
    #[arg(value_name = "COMMAND", trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    /// Overrides given through `--flags`.
    pub fn flag_overrides(&self) -> OptionOverrides {
        OptionOverrides {
            mode: self.mode.as_deref().map(Mode::from),
            log_to_qf: self.log_to_qf.then_some(true),
            open_qf_on_success: self.open_qf_on_success.then_some(true),
            open_qf_on_error: self.open_qf_on_error.then_some(true),
            close_on_success: self.close_on_success.then_some(true),
            close_on_error: self.close_on_error.then_some(true),
            title: self.title.clone(),
            on_exit: None,
        }
    }

    /// Split the trailing words into the command line and the options
    /// requested for this run. Flags win over `key=value` words.
    pub fn job_request(&self) -> Result<(Option<String>, OptionOverrides)> {
        let (command, inline) = split_command_words(&self.command)?;
        Ok((command, inline.overlay(self.flag_overrides())))
    }
}

/// Pull leading `key=value` option words off `words` and join the rest with
/// spaces.
///
/// Option words are only recognized before the first command word, so
/// `echo title=foo` prints `title=foo`. Words whose key is not a known option
/// (e.g. `CC=clang`) start the command. No quoting is added.
pub fn split_command_words(words: &[String]) -> Result<(Option<String>, OptionOverrides)> {
    let mut overrides = OptionOverrides::default();
    let mut rest = words;

    while let Some((word, tail)) = rest.split_first() {
        match word.split_once('=') {
            Some((key, value)) if OptionOverrides::is_known_key(key) => {
                overrides.set(key, value)?;
                rest = tail;
            }
            _ => break,
        }
    }

    let command = if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    };

    Ok((command, overrides))
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
