// src/job/watcher.rs

//! Completion detection.
//!
//! Both watchers return the job's exit code and leave the exit-code file
//! deleted. Polling works for every presentation; native waiting is only
//! possible when the host can see the process.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::fs::FileSystem;
use crate::present::ProcessExit;
use crate::types::ExitCode;

use super::JobDescriptor;
use super::side_channel::{read_exit_code, remove_quietly};

/// Exit code reported when the process died without a status of its own.
pub const UNKNOWN_EXIT_CODE: ExitCode = -1;

pub trait CompletionWatcher: Send {
    /// Wait until `job` has finished and return its exit code.
    ///
    /// There is no timeout: a job whose exit code never shows up keeps the
    /// watcher waiting.
    fn wait_for_exit<'a>(
        &'a mut self,
        job: &'a JobDescriptor,
    ) -> Pin<Box<dyn Future<Output = ExitCode> + Send + 'a>>;
}

/// Looks for the exit-code file on a fixed interval.
#[derive(Debug, Clone)]
pub struct FilePollingWatcher {
    fs: Arc<dyn FileSystem>,
    initial_delay: Duration,
    interval: Duration,
}

impl FilePollingWatcher {
    pub fn new(fs: Arc<dyn FileSystem>, initial_delay: Duration, interval: Duration) -> Self {
        Self {
            fs,
            initial_delay,
            // tokio panics on a zero period.
            interval: interval.max(Duration::from_millis(1)),
        }
    }
}

impl CompletionWatcher for FilePollingWatcher {
    fn wait_for_exit<'a>(
        &'a mut self,
        job: &'a JobDescriptor,
    ) -> Pin<Box<dyn Future<Output = ExitCode> + Send + 'a>> {
        Box::pin(async move {
            let mut ticker = interval_at(Instant::now() + self.initial_delay, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks: u64 = 0;

            loop {
                ticker.tick().await;
                ticks += 1;

                if let Some(code) = read_exit_code(self.fs.as_ref(), &job.exit_code_file) {
                    remove_quietly(self.fs.as_ref(), &job.exit_code_file);
                    debug!(
                        job_id = %job.id,
                        exit_code = code,
                        ticks,
                        "exit-code file observed; poll timer stopped"
                    );
                    // Returning drops `ticker`, which stops the timer.
                    return code;
                }

                trace!(job_id = %job.id, ticks, "exit-code file not present yet");
            }
        })
    }
}

/// Waits for the host's process-exit notification, then reads the exit-code
/// file once.
///
/// Falls back to the process's own status if the file is missing (the
/// process was killed before the wrapper could write it), and to polling if
/// the host drops the notification without sending.
#[derive(Debug)]
pub struct NativeWaitWatcher {
    exited: Option<oneshot::Receiver<ProcessExit>>,
    fallback: FilePollingWatcher,
    fs: Arc<dyn FileSystem>,
}

impl NativeWaitWatcher {
    pub fn new(
        exited: oneshot::Receiver<ProcessExit>,
        fallback: FilePollingWatcher,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            exited: Some(exited),
            fallback,
            fs,
        }
    }
}

impl CompletionWatcher for NativeWaitWatcher {
    fn wait_for_exit<'a>(
        &'a mut self,
        job: &'a JobDescriptor,
    ) -> Pin<Box<dyn Future<Output = ExitCode> + Send + 'a>> {
        Box::pin(async move {
            let exit = match self.exited.take() {
                Some(rx) => rx.await.ok(),
                None => None,
            };

            let Some(exit) = exit else {
                debug!(job_id = %job.id, "no native exit notification; polling instead");
                return self.fallback.wait_for_exit(job).await;
            };

            match read_exit_code(self.fs.as_ref(), &job.exit_code_file) {
                Some(code) => {
                    remove_quietly(self.fs.as_ref(), &job.exit_code_file);
                    debug!(job_id = %job.id, exit_code = code, "process exited; exit code read");
                    code
                }
                None => {
                    let code = exit.code.unwrap_or(UNKNOWN_EXIT_CODE);
                    warn!(
                        job_id = %job.id,
                        exit_code = code,
                        "process exited without writing its exit code; using process status"
                    );
                    code
                }
            }
        })
    }
}
