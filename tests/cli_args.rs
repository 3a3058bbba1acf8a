// tests/cli_args.rs

use std::error::Error;

use clap::Parser;

use asyncrun::cli::CliArgs;
use asyncrun::process_exit_code;
use asyncrun::types::Mode;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn trailing_words_form_the_command() -> TestResult {
    let args = CliArgs::try_parse_from(["asyncrun", "--log-to-qf", "cargo", "test", "--release"])?;
    let (command, overrides) = args.job_request()?;

    assert_eq!(command.as_deref(), Some("cargo test --release"));
    assert_eq!(overrides.log_to_qf, Some(true));
    assert_eq!(overrides.close_on_success, None);
    Ok(())
}

#[test]
fn flags_win_over_option_words() -> TestResult {
    let args = CliArgs::try_parse_from([
        "asyncrun",
        "--mode",
        "auto",
        "--title",
        "Flag",
        "title=Word",
        "close_on_error=true",
        "make",
    ])?;
    let (command, overrides) = args.job_request()?;

    assert_eq!(command.as_deref(), Some("make"));
    assert_eq!(overrides.mode, Some(Mode::Auto));
    assert_eq!(overrides.title.as_deref(), Some("Flag"));
    assert_eq!(overrides.close_on_error, Some(true));
    Ok(())
}

#[test]
fn no_words_means_default_command() -> TestResult {
    let args = CliArgs::try_parse_from(["asyncrun"])?;
    let (command, _) = args.job_request()?;
    assert!(command.is_none());
    Ok(())
}

#[test]
fn job_exit_codes_map_to_process_statuses() {
    assert_eq!(process_exit_code(0), 0);
    assert_eq!(process_exit_code(42), 42);
    assert_eq!(process_exit_code(255), 255);
    assert_eq!(process_exit_code(300), 255);
    assert_eq!(process_exit_code(-1), 1);
}

#[test]
fn log_level_prefers_the_flag_then_the_environment() {
    use asyncrun::cli::LogLevel;
    use asyncrun::logging::resolve_level;
    use tracing::Level;

    assert_eq!(resolve_level(Some(LogLevel::Trace), Some("error")), Level::TRACE);
    assert_eq!(resolve_level(None, Some(" Warning ")), Level::WARN);
    assert_eq!(resolve_level(None, Some("loud")), Level::INFO);
    assert_eq!(resolve_level(None, None), Level::INFO);
}
