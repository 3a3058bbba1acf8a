// src/job/supervisor.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigFile, OptionOverrides, ResolvedOptions, RunnerSection};
use crate::errors::{AsyncRunError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::present::{
    inside_multiplexer, should_use_multiplexer, PresentationStrategy, TerminalHost,
    TerminalSurfaceStrategy, TmuxPaneStrategy,
};
use crate::sink::OutputSink;

use super::completion::{finish, CompletionContext};
use super::side_channel::{remove_quietly, wrap_command};
use super::{
    CompletionWatcher, FilePollingWatcher, JobDescriptor, JobLock, JobLockGuard, JobTicket,
    NativeWaitWatcher,
};

/// Tells the supervisor whether it runs inside a multiplexer session.
pub type MultiplexerCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// Everything needed to build a [`Supervisor`].
pub struct SupervisorConfig {
    /// Overrides applied once over the built-in defaults.
    pub defaults: OptionOverrides,
    pub runner: RunnerSection,
    pub sink: Arc<dyn OutputSink>,
    pub fs: Arc<dyn FileSystem>,
    pub multiplexer: Arc<dyn PresentationStrategy>,
    pub terminal: Arc<dyn PresentationStrategy>,
    pub multiplexer_check: MultiplexerCheck,
}

impl SupervisorConfig {
    /// Production wiring: tmux panes, terminal surfaces from `host`, the real
    /// filesystem and the `TMUX` environment check.
    pub fn new(config: ConfigFile, host: Arc<dyn TerminalHost>, sink: Arc<dyn OutputSink>) -> Self {
        let split_percent = config.runner.split_percent;
        Self {
            defaults: config.defaults,
            runner: config.runner,
            sink,
            fs: Arc::new(RealFileSystem),
            multiplexer: Arc::new(TmuxPaneStrategy::new(split_percent)),
            terminal: Arc::new(TerminalSurfaceStrategy::new(host, split_percent)),
            multiplexer_check: Arc::new(inside_multiplexer),
        }
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_multiplexer(mut self, strategy: Arc<dyn PresentationStrategy>) -> Self {
        self.multiplexer = strategy;
        self
    }

    pub fn with_multiplexer_check(
        mut self,
        check: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Self {
        self.multiplexer_check = Arc::new(check);
        self
    }
}

impl fmt::Debug for SupervisorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisorConfig")
            .field("defaults", &self.defaults)
            .field("runner", &self.runner)
            .field("multiplexer", &self.multiplexer)
            .field("terminal", &self.terminal)
            .finish_non_exhaustive()
    }
}

/// Owns the single in-flight job.
///
/// A run request is accepted only when no other job is active; accepted
/// jobs are launched through the presentation strategy picked for their
/// options and observed by a spawned completion task.
pub struct Supervisor {
    defaults: ResolvedOptions,
    runner: RunnerSection,
    runtime_dir: PathBuf,
    lock: Arc<JobLock>,
    sink: Arc<dyn OutputSink>,
    fs: Arc<dyn FileSystem>,
    multiplexer: Arc<dyn PresentationStrategy>,
    terminal: Arc<dyn PresentationStrategy>,
    multiplexer_check: MultiplexerCheck,
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("defaults", &self.defaults)
            .field("runtime_dir", &self.runtime_dir)
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Seed the defaults every later run merges its overrides over.
    pub fn setup(config: SupervisorConfig) -> Self {
        let SupervisorConfig {
            defaults,
            runner,
            sink,
            fs,
            multiplexer,
            terminal,
            multiplexer_check,
        } = config;

        let defaults = ResolvedOptions::default().merged(defaults);
        let runtime_dir = runner.effective_runtime_dir();
        debug!(?defaults, runtime_dir = ?runtime_dir, "supervisor set up");

        Self {
            defaults,
            runner,
            runtime_dir,
            lock: Arc::new(JobLock::new()),
            sink,
            fs,
            multiplexer,
            terminal,
            multiplexer_check,
        }
    }

    pub fn defaults(&self) -> &ResolvedOptions {
        &self.defaults
    }

    pub fn is_job_active(&self) -> bool {
        self.lock.is_active()
    }

    /// Start `command` (or the default command) unless a job is running.
    ///
    /// A request made while a job is active is rejected with
    /// [`AsyncRunError::JobAlreadyRunning`] and has no other effect.
    pub async fn run(
        &self,
        command: Option<&str>,
        overrides: OptionOverrides,
    ) -> Result<JobTicket> {
        let command = match command.map(str::trim) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => self.runner.default_command.clone(),
        };

        let Some(guard) = JobLockGuard::try_acquire(&self.lock) else {
            warn!(command = %command, "a job is already running; request rejected");
            return Err(AsyncRunError::JobAlreadyRunning);
        };

        let options = self.defaults.merged(overrides);
        let mut job = JobDescriptor::new(&self.runtime_dir, command);
        for path in job.ephemeral_paths() {
            remove_quietly(self.fs.as_ref(), &path);
        }

        let use_multiplexer = should_use_multiplexer(&options, self.multiplexer_check.as_ref());
        let strategy = if use_multiplexer {
            Arc::clone(&self.multiplexer)
        } else {
            Arc::clone(&self.terminal)
        };

        let wrapped = wrap_command(
            &job.command,
            &job.exit_code_file,
            &job.output_log_file,
            options.log_to_qf,
        );

        info!(
            job_id = %job.id,
            command = %job.command,
            mode = %options.mode,
            presentation = ?strategy.kind(),
            log_to_qf = options.log_to_qf,
            "starting job"
        );

        // Dropping `guard` on the error path, or with this future, frees the lock.
        let launch = match strategy.start(&wrapped).await {
            Ok(launch) => launch,
            Err(e) => {
                error!(job_id = %job.id, error = %e, "job failed to start");
                return Err(e);
            }
        };
        job.handle = launch.handle;

        let poller = FilePollingWatcher::new(
            Arc::clone(&self.fs),
            self.runner.initial_delay(),
            self.runner.poll_interval(),
        );
        let watcher: Box<dyn CompletionWatcher> = match launch.exited {
            Some(exited) => Box::new(NativeWaitWatcher::new(exited, poller, Arc::clone(&self.fs))),
            None => Box::new(poller),
        };

        let ctx = CompletionContext {
            fs: Arc::clone(&self.fs),
            sink: Arc::clone(&self.sink),
            lock: Arc::clone(&self.lock),
            strategy,
        };

        let (tx, rx) = oneshot::channel();
        let ticket = JobTicket::new(&job, rx);
        let id = job.id;
        tokio::spawn(async move {
            let outcome = finish(job, options, watcher, ctx).await;
            if tx.send(outcome).is_err() {
                debug!(job_id = %id, "job ticket dropped before completion");
            }
        });
        guard.hand_over();

        Ok(ticket)
    }
}
