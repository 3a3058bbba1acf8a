// src/config/model.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{AsyncRunError, Result};
use crate::types::{ExitCode, Mode};

/// Callback invoked once a job has completed, with its exit code and the
/// options the job ran with.
pub type ExitCallback = Arc<dyn Fn(ExitCode, &ResolvedOptions) + Send + Sync>;

/// Fully resolved per-run options.
///
/// Built by merging [`OptionOverrides`] over the process-wide defaults with
/// [`ResolvedOptions::merged`]; never mutated afterwards.
#[derive(Clone)]
pub struct ResolvedOptions {
    pub mode: Mode,
    /// Capture merged stdout/stderr and push it to the output sink.
    pub log_to_qf: bool,
    pub open_qf_on_success: bool,
    pub open_qf_on_error: bool,
    /// Close the presentation surface when the job exits with 0.
    pub close_on_success: bool,
    /// Close the presentation surface when the job exits non-zero.
    pub close_on_error: bool,
    pub title: String,
    /// `None` selects the built-in notification handler.
    pub on_exit: Option<ExitCallback>,
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Term,
            log_to_qf: false,
            open_qf_on_success: false,
            open_qf_on_error: false,
            close_on_success: false,
            close_on_error: false,
            title: "Command".to_string(),
            on_exit: None,
        }
    }
}

impl fmt::Debug for ResolvedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedOptions")
            .field("mode", &self.mode)
            .field("log_to_qf", &self.log_to_qf)
            .field("open_qf_on_success", &self.open_qf_on_success)
            .field("open_qf_on_error", &self.open_qf_on_error)
            .field("close_on_success", &self.close_on_success)
            .field("close_on_error", &self.close_on_error)
            .field("title", &self.title)
            .field("on_exit", &self.on_exit.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl ResolvedOptions {
    /// Produce a new set of options with every field set in `overrides`
    /// replacing the corresponding field of `self`.
    pub fn merged(&self, overrides: OptionOverrides) -> ResolvedOptions {
        let OptionOverrides {
            mode,
            log_to_qf,
            open_qf_on_success,
            open_qf_on_error,
            close_on_success,
            close_on_error,
            title,
            on_exit,
        } = overrides;

        ResolvedOptions {
            mode: mode.unwrap_or(self.mode),
            log_to_qf: log_to_qf.unwrap_or(self.log_to_qf),
            open_qf_on_success: open_qf_on_success.unwrap_or(self.open_qf_on_success),
            open_qf_on_error: open_qf_on_error.unwrap_or(self.open_qf_on_error),
            close_on_success: close_on_success.unwrap_or(self.close_on_success),
            close_on_error: close_on_error.unwrap_or(self.close_on_error),
            title: title.unwrap_or_else(|| self.title.clone()),
            on_exit: on_exit.or_else(|| self.on_exit.clone()),
        }
    }

    /// Whether the surface should be closed for this exit code.
    pub fn should_close(&self, exit_code: ExitCode) -> bool {
        if exit_code == 0 {
            self.close_on_success
        } else {
            self.close_on_error
        }
    }

    /// Whether the output sink should be opened for this exit code.
    pub fn should_open_qf(&self, exit_code: ExitCode) -> bool {
        if exit_code == 0 {
            self.open_qf_on_success
        } else {
            self.open_qf_on_error
        }
    }
}

/// Partial options supplied by a caller (or the `[defaults]` table).
///
/// Every field left as `None` inherits from the defaults it is merged over.
#[derive(Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionOverrides {
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub log_to_qf: Option<bool>,
    #[serde(default)]
    pub open_qf_on_success: Option<bool>,
    #[serde(default)]
    pub open_qf_on_error: Option<bool>,
    #[serde(default)]
    pub close_on_success: Option<bool>,
    #[serde(default)]
    pub close_on_error: Option<bool>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(skip)]
    pub on_exit: Option<ExitCallback>,
}

impl fmt::Debug for OptionOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionOverrides")
            .field("mode", &self.mode)
            .field("log_to_qf", &self.log_to_qf)
            .field("open_qf_on_success", &self.open_qf_on_success)
            .field("open_qf_on_error", &self.open_qf_on_error)
            .field("close_on_success", &self.close_on_success)
            .field("close_on_error", &self.close_on_error)
            .field("title", &self.title)
            .field("on_exit", &self.on_exit.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl OptionOverrides {
    /// Option names accepted by [`OptionOverrides::set`].
    pub const KEYS: [&'static str; 7] = [
        "mode",
        "log_to_qf",
        "open_qf_on_success",
        "open_qf_on_error",
        "close_on_success",
        "close_on_error",
        "title",
    ];

    pub fn is_known_key(key: &str) -> bool {
        Self::KEYS.contains(&key)
    }

    /// Set a single option from its textual `key=value` form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "mode" => self.mode = Some(Mode::from(value)),
            "log_to_qf" => self.log_to_qf = Some(parse_bool(key, value)?),
            "open_qf_on_success" => self.open_qf_on_success = Some(parse_bool(key, value)?),
            "open_qf_on_error" => self.open_qf_on_error = Some(parse_bool(key, value)?),
            "close_on_success" => self.close_on_success = Some(parse_bool(key, value)?),
            "close_on_error" => self.close_on_error = Some(parse_bool(key, value)?),
            "title" => self.title = Some(value.to_string()),
            other => {
                return Err(AsyncRunError::ConfigError(format!(
                    "unknown option '{other}' (expected one of: {})",
                    Self::KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Layer `other` on top of `self`: fields set in `other` win.
    pub fn overlay(self, other: OptionOverrides) -> OptionOverrides {
        OptionOverrides {
            mode: other.mode.or(self.mode),
            log_to_qf: other.log_to_qf.or(self.log_to_qf),
            open_qf_on_success: other.open_qf_on_success.or(self.open_qf_on_success),
            open_qf_on_error: other.open_qf_on_error.or(self.open_qf_on_error),
            close_on_success: other.close_on_success.or(self.close_on_success),
            close_on_error: other.close_on_error.or(self.close_on_error),
            title: other.title.or(self.title),
            on_exit: other.on_exit.or(self.on_exit),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(AsyncRunError::ConfigError(format!(
            "option '{key}' expects a boolean, got '{other}'"
        ))),
    }
}

/// `[runner]` section: how jobs are launched and observed.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerSection {
    /// Command used when `run` is called without one.
    #[serde(default = "default_command")]
    pub default_command: String,

    /// Period between two looks at the exit-code file.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Delay before the first look at the exit-code file.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Height of the presentation surface, in percent of the host.
    #[serde(default = "default_split_percent")]
    pub split_percent: u8,

    /// Where the ephemeral exit-code and log files live.
    ///
    /// Defaults to the system temp directory.
    #[serde(default)]
    pub runtime_dir: Option<PathBuf>,
}

fn default_command() -> String {
    "make".to_string()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_split_percent() -> u8 {
    30
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            default_command: default_command(),
            poll_interval_ms: default_poll_interval_ms(),
            initial_delay_ms: default_initial_delay_ms(),
            split_percent: default_split_percent(),
            runtime_dir: None,
        }
    }
}

impl RunnerSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn effective_runtime_dir(&self) -> PathBuf {
        self.runtime_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Top-level configuration file as read from TOML:
///
/// ```toml
/// [defaults]
/// mode = "auto"
/// log_to_qf = true
///
/// [runner]
/// default_command = "cargo build"
/// poll_interval_ms = 250
/// ```
///
/// Both sections are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub defaults: OptionOverrides,

    #[serde(default)]
    pub runner: RunnerSection,
}

/// A validated configuration file.
///
/// Construct via `ConfigFile::try_from(raw)` so validation always runs.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub defaults: OptionOverrides,
    pub runner: RunnerSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(defaults: OptionOverrides, runner: RunnerSection) -> Self {
        Self { defaults, runner }
    }
}
