use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Exit status of a job as recorded in the exit-code file.
pub type ExitCode = i32;

/// How the job is presented to the user.
///
/// - `Auto`: use a multiplexer pane when the host itself runs inside a
///   multiplexer session, the terminal surface otherwise.
/// - `Term`: always use the terminal surface (default).
///
/// Parsing is lenient: anything other than `"auto"` selects `Term`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum Mode {
    Auto,
    #[default]
    Term,
}

impl From<&str> for Mode {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "auto" => Mode::Auto,
            _ => Mode::Term,
        }
    }
}

impl From<String> for Mode {
    fn from(s: String) -> Self {
        Mode::from(s.as_str())
    }
}

impl FromStr for Mode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Mode::from(s))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Auto => f.write_str("auto"),
            Mode::Term => f.write_str("term"),
        }
    }
}
