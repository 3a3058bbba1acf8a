// tests/inline_terminal.rs

mod common;
use crate::common::{eventually, init_tracing};

use std::error::Error;

use asyncrun::present::{InlineTerminal, SplitPosition, SplitRequest, TerminalHost};
use asyncrun_test_utils::with_timeout;

type TestResult = Result<(), Box<dyn Error>>;

fn request(command: &str) -> SplitRequest {
    SplitRequest {
        command: command.to_string(),
        position: SplitPosition::Bottom,
        height_percent: 30,
        scroll_to_bottom: true,
        restore_focus: true,
    }
}

#[tokio::test]
async fn exit_status_is_reported_natively() -> TestResult {
    init_tracing();
    let host = InlineTerminal::new();

    let opened = host.open_split(request("exit 6"))?;
    assert!(host.is_process_surface(&opened.handle));

    let exited = opened.exited.expect("inline surfaces report their exit");
    let exit = with_timeout(exited).await?;
    assert_eq!(exit.code, Some(6));
    Ok(())
}

#[tokio::test]
async fn normal_exit_forgets_the_surface() -> TestResult {
    init_tracing();
    let host = InlineTerminal::new();

    let opened = host.open_split(request("true"))?;
    let user_closed = host.watch_user_close(&opened.handle);

    let exit = with_timeout(opened.exited.expect("native exit")).await?;
    assert_eq!(exit.code, Some(0));
    assert!(!host.is_process_surface(&opened.handle));
    assert!(
        with_timeout(user_closed).await.is_err(),
        "watcher must see the surface go away, not a user close"
    );
    Ok(())
}

#[tokio::test]
async fn handles_are_distinct() -> TestResult {
    init_tracing();
    let host = InlineTerminal::new();

    let a = host.open_split(request("true"))?;
    let b = host.open_split(request("true"))?;
    assert_ne!(a.handle, b.handle);
    Ok(())
}

#[tokio::test]
async fn close_kills_the_running_process() -> TestResult {
    init_tracing();
    let host = InlineTerminal::new();

    let opened = host.open_split(request("sleep 30"))?;
    let exited = opened.exited.expect("native exit");

    host.close(&opened.handle)?;
    assert!(!host.is_process_surface(&opened.handle));

    let exit = with_timeout(exited).await?;
    assert_eq!(exit.code, None);

    // Closing twice is harmless.
    host.close(&opened.handle)?;
    Ok(())
}

#[tokio::test]
async fn death_by_signal_counts_as_user_close() -> TestResult {
    init_tracing();
    let host = InlineTerminal::new();

    let opened = host.open_split(request("sleep 0.2; kill -TERM $$"))?;
    let user_closed = host.watch_user_close(&opened.handle);

    with_timeout(user_closed).await?;
    let exit = with_timeout(opened.exited.expect("native exit")).await?;
    assert_eq!(exit.code, None);
    Ok(())
}

#[tokio::test]
async fn user_close_can_be_watched_only_once() -> TestResult {
    init_tracing();
    let host = InlineTerminal::new();

    let opened = host.open_split(request("sleep 30"))?;
    let _first = host.watch_user_close(&opened.handle);
    let second = host.watch_user_close(&opened.handle);

    // The second receiver is already disconnected.
    assert!(with_timeout(second).await.is_err());

    host.close(&opened.handle)?;
    assert!(eventually(|| !host.is_process_surface(&opened.handle)).await);
    Ok(())
}
