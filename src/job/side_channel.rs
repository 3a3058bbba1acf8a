// src/job/side_channel.rs

//! The completion side channel.
//!
//! A job's command is wrapped in a small POSIX `sh` fragment that:
//!
//! - runs the command in a subshell (so `exit N` only leaves the subshell),
//! - writes the command's status through file descriptor 3 into
//!   `<exit-code file>.part`, before any pipe stage can replace `$?`,
//! - optionally tees merged stdout+stderr into the output-log file,
//! - renames `.part` to the exit-code file once the whole pipeline is done.
//!
//! Observers therefore only ever see a complete exit-code file, and when it
//! shows up the log has already been flushed by `tee`.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::types::ExitCode;

/// Suffix of the staging file the wrapper writes before renaming.
const STAGING_SUFFIX: &str = "part";

/// Quote `s` for a POSIX shell using single quotes.
pub fn shell_quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('\'');
    for ch in s.chars() {
        if ch == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    quoted
}

/// Path the wrapper writes the status into before renaming it into place.
pub fn staging_path(exit_code_file: &Path) -> PathBuf {
    let mut name = exit_code_file
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(STAGING_SUFFIX);
    exit_code_file.with_file_name(name)
}

/// Wrap `command` so that its exit status lands in `exit_code_file` and,
/// when `capture` is set, its merged output lands in `output_log_file`.
pub fn wrap_command(
    command: &str,
    exit_code_file: &Path,
    output_log_file: &Path,
    capture: bool,
) -> String {
    let exit = shell_quote(&exit_code_file.to_string_lossy());
    let part = shell_quote(&staging_path(exit_code_file).to_string_lossy());

    if capture {
        let log = shell_quote(&output_log_file.to_string_lossy());
        format!(
            "{{ ( {command}\n) 2>&1 ; printf '%d\\n' \"$?\" >&3 ; }} 3>{part} | tee {log} ; mv -f {part} {exit}"
        )
    } else {
        format!("{{ ( {command}\n) ; printf '%d\\n' \"$?\" >&3 ; }} 3>{part} ; mv -f {part} {exit}")
    }
}

/// Wrap an already wrapped fragment into a single `sh -c '…'` command line.
pub fn sh_command_line(wrapped: &str) -> String {
    format!("sh -c {}", shell_quote(wrapped))
}

/// Parse the textual content of an exit-code file.
///
/// Surrounding whitespace is ignored; anything unparsable counts as 0.
pub fn parse_exit_code(text: &str) -> ExitCode {
    text.trim().parse().unwrap_or(0)
}

/// Read the exit-code file if it exists and is non-empty.
///
/// Returns `None` while the job is still running.
pub fn read_exit_code(fs: &dyn FileSystem, exit_code_file: &Path) -> Option<ExitCode> {
    if !fs.is_file(exit_code_file) {
        return None;
    }

    match fs.read_to_string(exit_code_file) {
        Ok(text) if !text.trim().is_empty() => {
            let code = parse_exit_code(&text);
            if text.trim().parse::<ExitCode>().is_err() {
                warn!(
                    path = ?exit_code_file,
                    content = %text.trim(),
                    "unparsable exit code; treating as 0"
                );
            }
            Some(code)
        }
        Ok(_) => None,
        Err(e) => {
            debug!(path = ?exit_code_file, error = %e, "exit-code file not readable yet");
            None
        }
    }
}

/// Read all lines of the output log and delete it.
///
/// Returns `None` if there is no log (capture was off, or the wrapper never
/// got far enough to create one).
pub fn take_log_lines(fs: &dyn FileSystem, output_log_file: &Path) -> Option<Vec<String>> {
    if !fs.is_file(output_log_file) {
        debug!(path = ?output_log_file, "no output log to forward");
        return None;
    }

    let lines = match fs.read_to_string(output_log_file) {
        Ok(text) => text.lines().map(str::to_string).collect(),
        Err(e) => {
            warn!(path = ?output_log_file, error = %e, "failed to read output log");
            remove_quietly(fs, output_log_file);
            return None;
        }
    };

    remove_quietly(fs, output_log_file);
    Some(lines)
}

/// Best-effort removal; failures are only logged.
pub fn remove_quietly(fs: &dyn FileSystem, path: &Path) {
    match fs.remove_file(path) {
        Ok(true) => debug!(path = ?path, "removed ephemeral file"),
        Ok(false) => {}
        Err(e) => warn!(path = ?path, error = %e, "failed to remove ephemeral file"),
    }
}
