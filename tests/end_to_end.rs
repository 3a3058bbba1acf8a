// tests/end_to_end.rs

mod common;
use crate::common::{eventually, init_tracing, leftover_job_files};

use std::error::Error;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use asyncrun::config::{OptionOverrides, ResolvedOptions};
use asyncrun::errors::{AsyncRunError, Result as RunResult};
use asyncrun::fs::RealFileSystem;
use asyncrun::job::Supervisor;
use asyncrun::present::{InlineTerminal, Launch, PresentationKind, PresentationStrategy};
use asyncrun::types::ExitCode;
use asyncrun_test_utils::builders::{test_supervisor_config, OptionsBuilder};
use asyncrun_test_utils::recording_sink::RecordingSink;
use asyncrun_test_utils::with_timeout;
use tempfile::TempDir;
use tokio::process::Command;

type TestResult = Result<(), Box<dyn Error>>;

fn inline_supervisor(dir: &TempDir, sink: Arc<RecordingSink>) -> Supervisor {
    init_tracing();
    let config = test_supervisor_config(
        dir.path(),
        Arc::new(InlineTerminal::new()),
        sink,
        Arc::new(RealFileSystem),
    );
    Supervisor::setup(config)
}

#[tokio::test]
async fn exit_codes_come_through_unchanged() -> TestResult {
    let dir = TempDir::new()?;
    let supervisor = inline_supervisor(&dir, Arc::new(RecordingSink::new()));

    for (command, expected) in [("true", 0), ("false", 1), ("exit 42", 42)] {
        let ticket = supervisor.run(Some(command), OptionOverrides::default()).await?;
        let outcome = with_timeout(ticket.wait()).await?;
        assert_eq!(outcome.exit_code, expected, "command: {command}");
    }

    assert!(leftover_job_files(dir.path()).is_empty());
    assert!(!supervisor.is_job_active());
    Ok(())
}

#[tokio::test]
async fn callback_receives_code_and_resolved_options() -> TestResult {
    let dir = TempDir::new()?;
    let supervisor = inline_supervisor(&dir, Arc::new(RecordingSink::new()));
    let calls: Arc<Mutex<Vec<(ExitCode, ResolvedOptions)>>> = Arc::default();

    let ticket = supervisor
        .run(
            Some("exit 3"),
            OptionsBuilder::new()
                .title("Unit tests")
                .close_on_error(true)
                .record_exits(calls.clone())
                .build(),
        )
        .await?;
    with_timeout(ticket.wait()).await?;

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (code, options) = &calls[0];
    assert_eq!(*code, 3);
    assert_eq!(options.title, "Unit tests");
    assert!(options.close_on_error);
    assert!(!options.close_on_success);
    Ok(())
}

#[tokio::test]
async fn captured_output_reaches_the_sink() -> TestResult {
    let dir = TempDir::new()?;
    let sink = Arc::new(RecordingSink::new());
    let supervisor = inline_supervisor(&dir, sink.clone());

    let ticket = supervisor
        .run(
            Some("echo compiling; echo 'main.c:3: error: oops' >&2; exit 2"),
            OptionsBuilder::new().log_to_qf(true).build(),
        )
        .await?;
    let outcome = with_timeout(ticket.wait()).await?;

    assert_eq!(outcome.exit_code, 2);
    let expected = vec!["compiling".to_string(), "main.c:3: error: oops".to_string()];
    assert_eq!(outcome.captured_output, Some(expected.clone()));

    let replaced = sink.replaced();
    assert_eq!(replaced.len(), 1);
    assert_eq!(replaced[0].1, expected);
    assert!(leftover_job_files(dir.path()).is_empty());
    Ok(())
}

#[tokio::test]
async fn second_run_is_rejected_while_the_first_sleeps() -> TestResult {
    let dir = TempDir::new()?;
    let supervisor = inline_supervisor(&dir, Arc::new(RecordingSink::new()));

    let first = supervisor.run(Some("sleep 0.3"), OptionOverrides::default()).await?;
    let second = supervisor.run(Some("true"), OptionOverrides::default()).await;
    assert!(matches!(second, Err(AsyncRunError::JobAlreadyRunning)));

    let outcome = with_timeout(first.wait()).await?;
    assert_eq!(outcome.exit_code, 0);

    let third = supervisor.run(Some("true"), OptionOverrides::default()).await?;
    with_timeout(third.wait()).await?;
    Ok(())
}

#[tokio::test]
async fn close_on_success_kills_nothing_after_a_clean_exit() -> TestResult {
    let dir = TempDir::new()?;
    let supervisor = inline_supervisor(&dir, Arc::new(RecordingSink::new()));

    let ticket = supervisor
        .run(Some("true"), OptionsBuilder::new().close_on_success(true).build())
        .await?;
    let outcome = with_timeout(ticket.wait()).await?;
    assert_eq!(outcome.exit_code, 0);
    Ok(())
}

#[tokio::test]
async fn finished_jobs_leave_no_background_tasks() -> TestResult {
    let dir = TempDir::new()?;
    let supervisor = inline_supervisor(&dir, Arc::new(RecordingSink::new()));

    for _ in 0..5 {
        let ticket = supervisor.run(Some("true"), OptionOverrides::default()).await?;
        let outcome = with_timeout(ticket.wait()).await?;
        assert_eq!(outcome.exit_code, 0);
    }

    let runtime = tokio::runtime::Handle::current();
    assert!(
        eventually(|| runtime.metrics().num_alive_tasks() == 0).await,
        "{} tasks still alive",
        runtime.metrics().num_alive_tasks()
    );
    Ok(())
}

/// Runs the wrapped command as a detached `sh` with no exit notification,
/// so completion can only be found by polling.
#[derive(Debug)]
struct DetachedShell;

impl PresentationStrategy for DetachedShell {
    fn kind(&self) -> PresentationKind {
        PresentationKind::MultiplexerPane
    }

    fn start<'a>(
        &'a self,
        wrapped: &'a str,
    ) -> Pin<Box<dyn Future<Output = RunResult<Launch>> + Send + 'a>> {
        Box::pin(async move {
            let mut child = Command::new("sh")
                .arg("-c")
                .arg(wrapped)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .map_err(|e| AsyncRunError::Spawn(e.to_string()))?;
            tokio::spawn(async move {
                let _ = child.wait().await;
            });
            Ok(Launch::default())
        })
    }
}

#[tokio::test]
async fn polling_finds_the_exit_file_written_by_a_real_shell() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let sink = Arc::new(RecordingSink::new());
    let config = test_supervisor_config(
        dir.path(),
        Arc::new(InlineTerminal::new()),
        sink.clone(),
        Arc::new(RealFileSystem),
    )
    .with_multiplexer(Arc::new(DetachedShell))
    .with_multiplexer_check(|| true);
    let supervisor = Supervisor::setup(config);

    let ticket = supervisor
        .run(
            Some("printf 'a\\nb\\n'; sleep 0.1; exit 7"),
            OptionsBuilder::new()
                .mode(asyncrun::types::Mode::Auto)
                .log_to_qf(true)
                .build(),
        )
        .await?;
    let outcome = with_timeout(ticket.wait()).await?;

    assert_eq!(outcome.exit_code, 7);
    assert_eq!(
        outcome.captured_output,
        Some(vec!["a".to_string(), "b".to_string()])
    );
    assert_eq!(sink.replaced().len(), 1);
    assert!(leftover_job_files(dir.path()).is_empty());
    Ok(())
}
