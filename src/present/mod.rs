// src/present/mod.rs

//! Presentation strategies.
//!
//! A strategy decides *where* the wrapped command runs:
//!
//! - [`tmux`]: a new pane in the surrounding tmux session. The pane's
//!   lifecycle belongs to tmux, so no closeable handle is returned.
//! - [`terminal`]: a split surface provided by a [`terminal::TerminalHost`].
//!   Returns a handle that can be closed later, and may report the process
//!   exit natively.
//! - [`inline`]: the `TerminalHost` used by the command-line binary, which
//!   runs the command attached to the current terminal.

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::oneshot;

use crate::config::ResolvedOptions;
use crate::errors::Result;
use crate::types::Mode;

pub mod inline;
pub mod terminal;
pub mod tmux;

pub use inline::InlineTerminal;
pub use terminal::{OpenedSurface, SplitPosition, SplitRequest, TerminalHost, TerminalSurfaceStrategy};
pub use tmux::TmuxPaneStrategy;

/// Environment variable tmux sets inside its sessions.
pub const MULTIPLEXER_ENV: &str = "TMUX";

/// Opaque reference to a presentation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// How the process hosted by a surface ended, as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationKind {
    MultiplexerPane,
    TerminalSurface,
}

/// Result of starting a wrapped command.
#[derive(Debug, Default)]
pub struct Launch {
    /// Surface that can be closed once the job completes.
    pub handle: Option<SurfaceHandle>,
    /// Native exit notification, when the host can observe the process.
    pub exited: Option<oneshot::Receiver<ProcessExit>>,
}

/// Common capability of the presentation strategies.
pub trait PresentationStrategy: Send + Sync + Debug {
    fn kind(&self) -> PresentationKind;

    /// Start `wrapped` (a POSIX `sh` fragment) without waiting for it.
    fn start<'a>(
        &'a self,
        wrapped: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Launch>> + Send + 'a>>;

    /// Whether `handle` still shows the process surface this strategy made.
    fn is_process_surface(&self, _handle: &SurfaceHandle) -> bool {
        false
    }

    fn close(&self, _handle: &SurfaceHandle) -> Result<()> {
        Ok(())
    }
}

/// Whether the current process runs inside a multiplexer session.
pub fn inside_multiplexer() -> bool {
    std::env::var_os(MULTIPLEXER_ENV).is_some()
}

/// Decide the presentation for a run: a multiplexer pane only in `auto`
/// mode and only when `inside_multiplexer` reports a multiplexer session.
///
/// The check is only consulted in `auto` mode. Production callers pass
/// [`inside_multiplexer`].
pub fn should_use_multiplexer(
    options: &ResolvedOptions,
    inside_multiplexer: &dyn Fn() -> bool,
) -> bool {
    match options.mode {
        Mode::Auto => inside_multiplexer(),
        Mode::Term => false,
    }
}
