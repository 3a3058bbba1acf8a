// src/present/terminal.rs

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::errors::{AsyncRunError, Result};

use super::{Launch, PresentationKind, PresentationStrategy, ProcessExit, SurfaceHandle};

/// Where a new split goes relative to the current layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPosition {
    Bottom,
    Top,
}

/// Everything the host needs to open the job's surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRequest {
    /// POSIX `sh` fragment to run inside the surface.
    pub command: String,
    pub position: SplitPosition,
    /// Surface height in percent of the host's height.
    pub height_percent: u8,
    pub scroll_to_bottom: bool,
    /// Give focus back to whatever had it before the split was created.
    pub restore_focus: bool,
}

/// A freshly opened surface.
#[derive(Debug)]
pub struct OpenedSurface {
    pub handle: SurfaceHandle,
    pub exited: Option<oneshot::Receiver<ProcessExit>>,
}

/// The host's terminal/window service.
///
/// Hosts own layout, focus and buffers; the runner only asks for a surface,
/// checks whether it is still a process surface, and closes it.
pub trait TerminalHost: Send + Sync + Debug {
    fn open_split(&self, request: SplitRequest) -> anyhow::Result<OpenedSurface>;

    /// `false` once the surface is gone or has been reused for something
    /// other than the job's process.
    fn is_process_surface(&self, handle: &SurfaceHandle) -> bool;

    fn close(&self, handle: &SurfaceHandle) -> anyhow::Result<()>;

    /// Resolves with `Ok(())` when the user closes the process inside the
    /// surface by hand. The sender is dropped when the surface goes away any
    /// other way.
    fn watch_user_close(&self, handle: &SurfaceHandle) -> oneshot::Receiver<()>;
}

/// Runs the job in a split surface at the bottom of the host.
#[derive(Debug, Clone)]
pub struct TerminalSurfaceStrategy {
    host: Arc<dyn TerminalHost>,
    height_percent: u8,
}

impl TerminalSurfaceStrategy {
    pub fn new(host: Arc<dyn TerminalHost>, height_percent: u8) -> Self {
        Self {
            host,
            height_percent,
        }
    }

    pub fn split_request(&self, wrapped: &str) -> SplitRequest {
        SplitRequest {
            command: wrapped.to_string(),
            position: SplitPosition::Bottom,
            height_percent: self.height_percent,
            scroll_to_bottom: true,
            restore_focus: true,
        }
    }

    /// Close the surface as soon as the user kills its process, so no empty
    /// surface is left behind. Runs independently of the completion watcher.
    fn spawn_teardown_observer(&self, handle: SurfaceHandle) {
        let closed = self.host.watch_user_close(&handle);
        let host = Arc::clone(&self.host);

        tokio::spawn(async move {
            match closed.await {
                Ok(()) => {
                    if host.is_process_surface(&handle) {
                        info!(surface = handle.0, "process closed by user; closing surface");
                        if let Err(e) = host.close(&handle) {
                            warn!(surface = handle.0, error = %e, "failed to close surface");
                        }
                    }
                }
                Err(_) => {
                    debug!(surface = handle.0, "surface gone; teardown observer finished");
                }
            }
        });
    }
}

impl PresentationStrategy for TerminalSurfaceStrategy {
    fn kind(&self) -> PresentationKind {
        PresentationKind::TerminalSurface
    }

    fn start<'a>(
        &'a self,
        wrapped: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Launch>> + Send + 'a>> {
        Box::pin(async move {
            let request = self.split_request(wrapped);
            let opened = self
                .host
                .open_split(request)
                .map_err(|e| AsyncRunError::Spawn(format!("opening terminal surface: {e:#}")))?;

            self.spawn_teardown_observer(opened.handle);

            info!(
                surface = opened.handle.0,
                native_exit = opened.exited.is_some(),
                "job started in terminal surface"
            );

            Ok(Launch {
                handle: Some(opened.handle),
                exited: opened.exited,
            })
        })
    }

    fn is_process_surface(&self, handle: &SurfaceHandle) -> bool {
        self.host.is_process_surface(handle)
    }

    fn close(&self, handle: &SurfaceHandle) -> Result<()> {
        self.host.close(handle).map_err(AsyncRunError::from)
    }
}
