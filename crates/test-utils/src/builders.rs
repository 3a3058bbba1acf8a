#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use asyncrun::config::{ConfigFile, OptionOverrides, RawConfigFile, ResolvedOptions, RunnerSection};
use asyncrun::fs::FileSystem;
use asyncrun::job::SupervisorConfig;
use asyncrun::present::TerminalHost;
use asyncrun::sink::OutputSink;
use asyncrun::types::{ExitCode, Mode};

/// Builder for `OptionOverrides` to simplify test setup.
#[derive(Default)]
pub struct OptionsBuilder {
    overrides: OptionOverrides,
}

impl OptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.overrides.mode = Some(mode);
        self
    }

    pub fn log_to_qf(mut self, val: bool) -> Self {
        self.overrides.log_to_qf = Some(val);
        self
    }

    pub fn open_qf_on_success(mut self, val: bool) -> Self {
        self.overrides.open_qf_on_success = Some(val);
        self
    }

    pub fn open_qf_on_error(mut self, val: bool) -> Self {
        self.overrides.open_qf_on_error = Some(val);
        self
    }

    pub fn close_on_success(mut self, val: bool) -> Self {
        self.overrides.close_on_success = Some(val);
        self
    }

    pub fn close_on_error(mut self, val: bool) -> Self {
        self.overrides.close_on_error = Some(val);
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.overrides.title = Some(title.to_string());
        self
    }

    pub fn on_exit(
        mut self,
        callback: impl Fn(ExitCode, &ResolvedOptions) + Send + Sync + 'static,
    ) -> Self {
        self.overrides.on_exit = Some(Arc::new(callback));
        self
    }

    /// Record every `(exit_code, options)` the callback sees into `calls`.
    pub fn record_exits(self, calls: Arc<Mutex<Vec<(ExitCode, ResolvedOptions)>>>) -> Self {
        self.on_exit(move |code, opts| {
            calls.lock().unwrap().push((code, opts.clone()));
        })
    }

    pub fn build(self) -> OptionOverrides {
        self.overrides
    }
}

/// Runner settings with fast polling, rooted in `runtime_dir`.
pub fn fast_runner(runtime_dir: &Path) -> RunnerSection {
    RunnerSection {
        default_command: "true".to_string(),
        poll_interval_ms: 20,
        initial_delay_ms: 20,
        split_percent: 30,
        runtime_dir: Some(runtime_dir.to_path_buf()),
    }
}

/// Supervisor wiring for tests: fast polling, the given host, sink and
/// filesystem, never inside a multiplexer unless the check is replaced.
pub fn test_supervisor_config(
    runtime_dir: &Path,
    host: Arc<dyn TerminalHost>,
    sink: Arc<dyn OutputSink>,
    fs: Arc<dyn FileSystem>,
) -> SupervisorConfig {
    let raw = RawConfigFile {
        defaults: OptionOverrides::default(),
        runner: fast_runner(runtime_dir),
    };
    let config = ConfigFile::try_from(raw).expect("Failed to build valid config from builder");

    SupervisorConfig::new(config, host, sink)
        .with_fs(fs)
        .with_multiplexer_check(|| false)
}
