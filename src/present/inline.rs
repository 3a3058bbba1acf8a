// src/present/inline.rs

//! `TerminalHost` for the command-line binary.
//!
//! There is no window manager to split, so the "surface" is the terminal the
//! binary runs in: the wrapped command is spawned with inherited stdio and
//! every surface gets a monitor task that owns the child process.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::terminal::{OpenedSurface, SplitRequest, TerminalHost};
use super::{ProcessExit, SurfaceHandle};

/// Per-surface bookkeeping.
///
/// - `kill` asks the monitor task to stop the child (used by `close`).
/// - `user_close` fires when the child dies from a signal; its receiver is
///   handed out once through `watch_user_close`.
///
/// The entry lives only while the child runs: the monitor task removes it
/// when the child exits, and `close` removes it when killing the child.
#[derive(Debug)]
struct InlineSurface {
    kill: Option<oneshot::Sender<()>>,
    user_close: Option<oneshot::Sender<()>>,
    user_close_rx: Option<oneshot::Receiver<()>>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: AtomicU64,
    surfaces: Mutex<HashMap<SurfaceHandle, InlineSurface>>,
}

impl Inner {
    fn surfaces(&self) -> MutexGuard<'_, HashMap<SurfaceHandle, InlineSurface>> {
        self.surfaces.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn forget(&self, handle: SurfaceHandle) {
        self.surfaces().remove(&handle);
    }

    fn notify_user_close(&self, handle: SurfaceHandle) {
        if let Some(surface) = self.surfaces().get_mut(&handle) {
            if let Some(tx) = surface.user_close.take() {
                let _ = tx.send(());
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InlineTerminal {
    inner: Arc<Inner>,
}

impl InlineTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    fn spawn_child(request: &SplitRequest) -> Result<Child> {
        Command::new("sh")
            .arg("-c")
            .arg(&request.command)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .context("spawning sh for inline terminal surface")
    }
}

impl TerminalHost for InlineTerminal {
    fn open_split(&self, request: SplitRequest) -> Result<OpenedSurface> {
        // Layout hints (position, height, focus) have no meaning when the
        // surface is the current terminal.
        debug!(
            position = ?request.position,
            height_percent = request.height_percent,
            "opening inline surface"
        );

        let mut child = Self::spawn_child(&request)?;
        let handle = SurfaceHandle(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1);

        let (kill_tx, mut kill_rx) = oneshot::channel::<()>();
        let (user_close_tx, user_close_rx) = oneshot::channel::<()>();
        let (exit_tx, exit_rx) = oneshot::channel::<ProcessExit>();

        self.inner.surfaces().insert(
            handle,
            InlineSurface {
                kill: Some(kill_tx),
                user_close: Some(user_close_tx),
                user_close_rx: Some(user_close_rx),
            },
        );

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::select! {
                status_res = child.wait() => {
                    let code = match status_res {
                        Ok(status) => status.code(),
                        Err(e) => {
                            warn!(surface = handle.0, error = %e, "waiting for inline process failed");
                            None
                        }
                    };

                    debug!(surface = handle.0, ?code, "inline process exited");
                    if code.is_none() {
                        inner.notify_user_close(handle);
                    }
                    // The surface no longer hosts a process. Dropping the
                    // entry disconnects any user-close watcher that is still
                    // waiting.
                    inner.forget(handle);
                    let _ = exit_tx.send(ProcessExit { code });
                }

                kill = &mut kill_rx => {
                    if kill.is_ok() {
                        info!(surface = handle.0, "closing surface; killing inline process");
                        if let Err(e) = child.kill().await {
                            warn!(surface = handle.0, error = %e, "failed to kill inline process");
                        }
                        let _ = exit_tx.send(ProcessExit { code: None });
                    } else {
                        // Nobody can close this surface any more; let the
                        // process run to completion.
                        let status = child.wait().await.ok().and_then(|s| s.code());
                        let _ = exit_tx.send(ProcessExit { code: status });
                    }
                }
            }
        });

        Ok(OpenedSurface {
            handle,
            exited: Some(exit_rx),
        })
    }

    fn is_process_surface(&self, handle: &SurfaceHandle) -> bool {
        self.inner.surfaces().contains_key(handle)
    }

    fn close(&self, handle: &SurfaceHandle) -> Result<()> {
        let removed = self.inner.surfaces().remove(handle);
        match removed {
            Some(mut surface) => {
                if let Some(kill) = surface.kill.take() {
                    // Fails when the process already exited; nothing to stop then.
                    let _ = kill.send(());
                }
                debug!(surface = handle.0, "inline surface closed");
                Ok(())
            }
            None => {
                debug!(surface = handle.0, "inline surface already closed");
                Ok(())
            }
        }
    }

    fn watch_user_close(&self, handle: &SurfaceHandle) -> oneshot::Receiver<()> {
        let existing = self
            .inner
            .surfaces()
            .get_mut(handle)
            .and_then(|surface| surface.user_close_rx.take());

        existing.unwrap_or_else(|| {
            // Already watched or already gone: hand out a closed channel.
            let (_tx, rx) = oneshot::channel();
            rx
        })
    }
}
