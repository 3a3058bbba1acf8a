// src/job/mod.rs

//! Single-job supervision.
//!
//! - [`supervisor`] accepts or rejects run requests and launches the job.
//! - [`lock`] is the one-job-at-a-time guard.
//! - [`side_channel`] wraps commands and reads the ephemeral files they write.
//! - [`watcher`] detects completion (file polling or native process exit).
//! - [`completion`] runs the capture / close / notify / release sequence.

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::errors::{AsyncRunError, Result};
use crate::present::SurfaceHandle;
use crate::types::ExitCode;

pub mod completion;
pub mod lock;
pub mod side_channel;
pub mod supervisor;
pub mod watcher;

pub use completion::default_on_exit;
pub use lock::{JobLock, JobLockGuard};
pub use supervisor::{Supervisor, SupervisorConfig};
pub use watcher::{CompletionWatcher, FilePollingWatcher, NativeWaitWatcher};

/// The one job currently in flight.
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    pub id: Uuid,
    pub command: String,
    pub exit_code_file: PathBuf,
    pub output_log_file: PathBuf,
    /// `None` for multiplexer panes, whose lifecycle tmux owns.
    pub handle: Option<SurfaceHandle>,
}

impl JobDescriptor {
    /// Create a descriptor with fresh ephemeral paths under `runtime_dir`.
    pub fn new(runtime_dir: &Path, command: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            command: command.into(),
            exit_code_file: runtime_dir.join(format!("asyncrun-{id}.exit")),
            output_log_file: runtime_dir.join(format!("asyncrun-{id}.log")),
            handle: None,
        }
    }

    /// Every ephemeral path a job may leave behind.
    pub fn ephemeral_paths(&self) -> [PathBuf; 3] {
        [
            self.exit_code_file.clone(),
            side_channel::staging_path(&self.exit_code_file),
            self.output_log_file.clone(),
        ]
    }
}

/// What a finished job reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub exit_code: ExitCode,
    /// Captured lines when `log_to_qf` was on and a log was found.
    pub captured_output: Option<Vec<String>>,
}

impl JobOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Handle returned by an accepted run; resolves once the job has been fully
/// cleaned up and the lock released.
#[derive(Debug)]
pub struct JobTicket {
    id: Uuid,
    exit_code_file: PathBuf,
    output_log_file: PathBuf,
    rx: oneshot::Receiver<JobOutcome>,
}

impl JobTicket {
    pub(crate) fn new(job: &JobDescriptor, rx: oneshot::Receiver<JobOutcome>) -> Self {
        Self {
            id: job.id,
            exit_code_file: job.exit_code_file.clone(),
            output_log_file: job.output_log_file.clone(),
            rx,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn exit_code_file(&self) -> &Path {
        &self.exit_code_file
    }

    pub fn output_log_file(&self) -> &Path {
        &self.output_log_file
    }

    pub async fn wait(self) -> Result<JobOutcome> {
        let id = self.id;
        self.rx.await.map_err(|_| {
            AsyncRunError::Other(anyhow!("job {id} ended without reporting an outcome"))
        })
    }
}
