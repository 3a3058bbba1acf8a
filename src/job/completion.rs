// src/job/completion.rs

//! What happens once a job is seen to have finished.
//!
//! Order matters: the lock is released last so no new job can start while
//! the previous one is still being cleaned up.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ResolvedOptions;
use crate::fs::FileSystem;
use crate::present::PresentationStrategy;
use crate::sink::{OutputSink, QUICKFIX_TITLE};
use crate::types::ExitCode;

use super::side_channel::{remove_quietly, staging_path, take_log_lines};
use super::{CompletionWatcher, JobDescriptor, JobLock, JobOutcome};

/// Collaborators the completion sequence borrows from the supervisor.
#[derive(Debug, Clone)]
pub struct CompletionContext {
    pub fs: Arc<dyn FileSystem>,
    pub sink: Arc<dyn OutputSink>,
    pub lock: Arc<JobLock>,
    pub strategy: Arc<dyn PresentationStrategy>,
}

/// Wait for `job` to finish, then capture, close, notify and release.
pub async fn finish(
    job: JobDescriptor,
    options: ResolvedOptions,
    mut watcher: Box<dyn CompletionWatcher>,
    ctx: CompletionContext,
) -> JobOutcome {
    let exit_code = watcher.wait_for_exit(&job).await;
    info!(
        job_id = %job.id,
        exit_code,
        title = %options.title,
        "job finished"
    );

    remove_quietly(ctx.fs.as_ref(), &staging_path(&job.exit_code_file));

    let captured_output = forward_output(&job, &options, &ctx);

    close_surface_if_requested(&job, &options, exit_code, ctx.strategy.as_ref());

    notify_exit(exit_code, &options, ctx.sink.as_ref());

    ctx.lock.release();
    debug!(job_id = %job.id, "job lock released");

    JobOutcome {
        exit_code,
        captured_output,
    }
}

fn forward_output(
    job: &JobDescriptor,
    options: &ResolvedOptions,
    ctx: &CompletionContext,
) -> Option<Vec<String>> {
    if !options.log_to_qf {
        remove_quietly(ctx.fs.as_ref(), &job.output_log_file);
        return None;
    }

    let lines = take_log_lines(ctx.fs.as_ref(), &job.output_log_file)?;
    debug!(job_id = %job.id, lines = lines.len(), "forwarding captured output");
    ctx.sink.replace(QUICKFIX_TITLE, lines.clone());
    Some(lines)
}

/// Close the job's surface when the exit code matches the close policy and
/// the surface still hosts the job's process.
pub fn close_surface_if_requested(
    job: &JobDescriptor,
    options: &ResolvedOptions,
    exit_code: ExitCode,
    strategy: &dyn PresentationStrategy,
) {
    let Some(handle) = job.handle else {
        return;
    };

    if !options.should_close(exit_code) {
        return;
    }

    if !strategy.is_process_surface(&handle) {
        debug!(
            job_id = %job.id,
            surface = handle.0,
            "surface no longer hosts the job; leaving it open"
        );
        return;
    }

    match strategy.close(&handle) {
        Ok(()) => debug!(job_id = %job.id, surface = handle.0, "surface closed"),
        Err(e) => warn!(job_id = %job.id, surface = handle.0, error = %e, "failed to close surface"),
    }
}

fn notify_exit(exit_code: ExitCode, options: &ResolvedOptions, sink: &dyn OutputSink) {
    let result = catch_unwind(AssertUnwindSafe(|| match &options.on_exit {
        Some(callback) => callback(exit_code, options),
        None => default_on_exit(exit_code, options, sink),
    }));

    if result.is_err() {
        warn!(exit_code, "exit callback panicked");
    }
}

/// Built-in exit handler: report success or failure under the job title and
/// open the output sink when the open policy asks for it.
pub fn default_on_exit(exit_code: ExitCode, options: &ResolvedOptions, sink: &dyn OutputSink) {
    if exit_code == 0 {
        info!(title = %options.title, "{} succeeded", options.title);
    } else {
        warn!(
            title = %options.title,
            exit_code,
            "{} failed with exit code {exit_code}",
            options.title
        );
    }

    if options.should_open_qf(exit_code) {
        sink.open();
    }
}
