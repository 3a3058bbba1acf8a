// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod job;
pub mod logging;
pub mod present;
pub mod sink;
pub mod types;

use std::sync::{Arc, OnceLock};

use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::{resolve_config, OptionOverrides};
use crate::errors::{AsyncRunError, Result};
use crate::job::{JobTicket, Supervisor, SupervisorConfig};
use crate::present::InlineTerminal;
use crate::sink::QuickfixPrinter;

pub use crate::job::JobOutcome;

/// Exit status the binary reports when interrupted.
const INTERRUPTED_EXIT_CODE: i32 = 130;

static SUPERVISOR: OnceLock<Supervisor> = OnceLock::new();

/// One-time, process-wide setup: seeds the defaults every later [`run`]
/// merges its overrides over.
///
/// A second call fails with a configuration error and leaves the first
/// supervisor in place.
pub fn setup(config: SupervisorConfig) -> Result<&'static Supervisor> {
    SUPERVISOR
        .set(Supervisor::setup(config))
        .map_err(|_| AsyncRunError::ConfigError("setup has already been called".to_string()))?;
    SUPERVISOR.get().ok_or(AsyncRunError::NotInitialized)
}

/// Run `command` (or the configured default) on the process-wide supervisor.
pub async fn run(command: Option<&str>, overrides: OptionOverrides) -> Result<JobTicket> {
    let supervisor = SUPERVISOR.get().ok_or(AsyncRunError::NotInitialized)?;
    supervisor.run(command, overrides).await
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the process-wide supervisor with the inline terminal and stdout sink
/// - the job itself
/// - Ctrl-C handling
///
/// Returns the exit status the binary should terminate with.
pub async fn run_cli(args: CliArgs) -> Result<i32> {
    let config = resolve_config(args.config.as_deref())?;
    std::fs::create_dir_all(config.runner.effective_runtime_dir())?;

    let (command, overrides) = args.job_request()?;

    let sink = Arc::new(QuickfixPrinter::new());
    let supervisor_config = SupervisorConfig::new(config, Arc::new(InlineTerminal::new()), sink);
    setup(supervisor_config)?;

    let ticket = run(command.as_deref(), overrides).await?;
    info!(job_id = %ticket.id(), "waiting for job to finish");

    tokio::select! {
        outcome = ticket.wait() => {
            let outcome = outcome?;
            Ok(process_exit_code(outcome.exit_code))
        }
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("interrupted; no longer tracking the job");
            Ok(INTERRUPTED_EXIT_CODE)
        }
    }
}

/// Map a job exit code to a process exit status.
pub fn process_exit_code(code: i32) -> i32 {
    if code < 0 { 1 } else { code.min(255) }
}
