use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use tokio::sync::oneshot;

use asyncrun::present::{OpenedSurface, ProcessExit, SplitRequest, SurfaceHandle, TerminalHost};

#[derive(Debug)]
struct FakeSurface {
    process: bool,
    closed: bool,
    user_close: Option<oneshot::Sender<()>>,
    user_close_rx: Option<oneshot::Receiver<()>>,
    exit: Option<oneshot::Sender<ProcessExit>>,
}

#[derive(Debug, Default)]
struct FakeState {
    next_id: u64,
    requests: Vec<SplitRequest>,
    surfaces: HashMap<SurfaceHandle, FakeSurface>,
}

/// A terminal host that runs nothing.
///
/// - records every `SplitRequest`
/// - lets tests play the user (close the process, repurpose the surface)
///   and, with `with_native_exit`, the process itself.
#[derive(Debug, Default)]
pub struct FakeTerminalHost {
    state: Mutex<FakeState>,
    native_exit: bool,
    fail_open: bool,
}

impl FakeTerminalHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out a native exit notification with every surface.
    pub fn with_native_exit() -> Self {
        Self {
            native_exit: true,
            ..Self::default()
        }
    }

    /// Make `open_split` fail.
    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<SplitRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn last_handle(&self) -> Option<SurfaceHandle> {
        let state = self.state.lock().unwrap();
        (state.next_id > 0).then_some(SurfaceHandle(state.next_id))
    }

    pub fn is_closed(&self, handle: SurfaceHandle) -> bool {
        self.state
            .lock()
            .unwrap()
            .surfaces
            .get(&handle)
            .map(|s| s.closed)
            .unwrap_or(false)
    }

    /// The user turned the surface into something else.
    pub fn repurpose(&self, handle: SurfaceHandle) {
        if let Some(surface) = self.state.lock().unwrap().surfaces.get_mut(&handle) {
            surface.process = false;
        }
    }

    /// The user closed the process inside the surface.
    pub fn user_closes(&self, handle: SurfaceHandle) {
        if let Some(surface) = self.state.lock().unwrap().surfaces.get_mut(&handle) {
            if let Some(tx) = surface.user_close.take() {
                let _ = tx.send(());
            }
        }
    }

    /// The hosted process exited (only meaningful `with_native_exit`).
    pub fn process_exits(&self, handle: SurfaceHandle, code: Option<i32>) {
        if let Some(surface) = self.state.lock().unwrap().surfaces.get_mut(&handle) {
            if let Some(tx) = surface.exit.take() {
                let _ = tx.send(ProcessExit { code });
            }
        }
    }
}

impl TerminalHost for FakeTerminalHost {
    fn open_split(&self, request: SplitRequest) -> Result<OpenedSurface> {
        if self.fail_open {
            return Err(anyhow!("no room for another split"));
        }

        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let handle = SurfaceHandle(state.next_id);
        state.requests.push(request);

        let (user_close, user_close_rx) = oneshot::channel();
        let (exit, exited) = if self.native_exit {
            let (tx, rx) = oneshot::channel();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        state.surfaces.insert(
            handle,
            FakeSurface {
                process: true,
                closed: false,
                user_close: Some(user_close),
                user_close_rx: Some(user_close_rx),
                exit,
            },
        );

        Ok(OpenedSurface { handle, exited })
    }

    fn is_process_surface(&self, handle: &SurfaceHandle) -> bool {
        self.state
            .lock()
            .unwrap()
            .surfaces
            .get(handle)
            .map(|s| s.process && !s.closed)
            .unwrap_or(false)
    }

    fn close(&self, handle: &SurfaceHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let surface = state
            .surfaces
            .get_mut(handle)
            .ok_or_else(|| anyhow!("unknown surface {}", handle.0))?;
        surface.closed = true;
        surface.process = false;
        surface.user_close = None;
        Ok(())
    }

    fn watch_user_close(&self, handle: &SurfaceHandle) -> oneshot::Receiver<()> {
        let taken = self
            .state
            .lock()
            .unwrap()
            .surfaces
            .get_mut(handle)
            .and_then(|s| s.user_close_rx.take());

        taken.unwrap_or_else(|| oneshot::channel().1)
    }
}
