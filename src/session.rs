//! Capture session: one pipe, a capture producer and a viewer.
//!
//! ```text
//! Idle -> PipeOpen -> BothRunning -> ShuttingDown -> Stopped
//! ```
//!
//! The capture process is started before the viewer so that the producer
//! is ready to write when the consumer opens the pipe. The session leaves
//! `BothRunning` when either process exits or [`SessionHandle::stop`] is
//! called, and then stops both processes.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{error, info};

use crate::diagnostics::Logger;
use crate::error::{Error, Result};
use crate::pipe::NamedPipe;
use crate::supervisor::{ProcessSettings, SupervisedProcess, Tool};

/// Default interval between exit-code polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Lifecycle position of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    PipeOpen,
    BothRunning,
    ShuttingDown,
    Stopped,
}

/// Session-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Directory the named pipe is created in.
    pub scratch_dir: PathBuf,
    pub poll_interval: Duration,
    pub process: ProcessSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            process: ProcessSettings::default(),
        }
    }
}

type BuildTool = Box<dyn FnOnce(&Path, Logger) -> Arc<dyn Tool> + Send>;

/// A tool that can only be built once the pipe path is known.
pub struct ToolSlot {
    name: String,
    build: BuildTool,
}

impl ToolSlot {
    pub fn new<F>(name: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&Path, Logger) -> Arc<dyn Tool> + Send + 'static,
    {
        Self {
            name: name.into(),
            build: Box::new(build),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn into_process(self, pipe: &Path, logger: &Logger, settings: &ProcessSettings) -> SupervisedProcess {
        let logger = logger.sibling(&self.name);
        let tool = (self.build)(pipe, logger.clone());
        SupervisedProcess::new(logger, tool, settings.clone())
    }
}

/// Set-once flag with a timed wait, shared with whoever may stop the session.
#[derive(Debug, Default)]
struct StopFlag {
    set: Mutex<bool>,
    cond: Condvar,
}

impl StopFlag {
    fn set(&self) {
        *self.set.lock() = true;
        self.cond.notify_all();
    }

    fn is_set(&self) -> bool {
        *self.set.lock()
    }

    /// Wait up to `timeout`; returns whether the flag is set.
    fn wait(&self, timeout: Duration) -> bool {
        let mut set = self.set.lock();
        if !*set {
            let _ = self.cond.wait_for(&mut set, timeout);
        }
        *set
    }
}

/// Cloneable control over a running [`Session`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    stop: Arc<StopFlag>,
    state: Arc<Mutex<SessionState>>,
}

impl SessionHandle {
    fn new() -> Self {
        Self {
            stop: Arc::new(StopFlag::default()),
            state: Arc::new(Mutex::new(SessionState::Idle)),
        }
    }

    /// Request shutdown. Takes effect within one poll interval.
    pub fn stop(&self) {
        self.stop.set();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_set()
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }
}

/// Runs a capture producer and a viewer against one named pipe.
pub struct Session {
    logger: Logger,
    settings: SessionSettings,
    capture: ToolSlot,
    viewer: ToolSlot,
    handle: SessionHandle,
}

impl Session {
    pub fn new(logger: Logger, settings: SessionSettings, capture: ToolSlot, viewer: ToolSlot) -> Self {
        Self {
            logger,
            settings,
            capture,
            viewer,
            handle: SessionHandle::new(),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Run the session on a dedicated thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(self) -> std::io::Result<JoinHandle<Result<()>>> {
        thread::Builder::new()
            .name(self.logger.name().to_string())
            .spawn(move || self.run())
    }

    /// Run the session to completion on the current thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipe cannot be created, a tool cannot be
    /// spawned, or a process cannot be stopped.
    pub fn run(self) -> Result<()> {
        let Self {
            logger,
            settings,
            capture,
            viewer,
            handle,
        } = self;
        let component = logger.name();
        info!(component, "Starting ...");

        let pipe = NamedPipe::create_in(&settings.scratch_dir)?;
        let transition = |state: SessionState| {
            info!(component, ?state, "session state");
            *handle.state.lock() = state;
        };
        transition(SessionState::PipeOpen);

        let mut capture = capture.into_process(pipe.path(), &logger, &settings.process);
        if let Err(e) = capture.run() {
            transition(SessionState::Stopped);
            return Err(e);
        }

        let mut viewer = viewer.into_process(pipe.path(), &logger, &settings.process);
        if let Err(e) = viewer.run() {
            transition(SessionState::ShuttingDown);
            if let Err(stop_err) = capture.stop() {
                error!(component, error = %stop_err, "failed to stop capture after viewer spawn failure");
            }
            transition(SessionState::Stopped);
            return Err(e);
        }
        transition(SessionState::BothRunning);

        while !handle.stop.wait(settings.poll_interval) {
            for process in [&mut capture, &mut viewer] {
                if let Some(code) = process.returncode() {
                    info!(component, process = process.name(), code, "process exited");
                    handle.stop();
                }
            }
        }

        info!(component, "Stopping ...");
        transition(SessionState::ShuttingDown);
        let capture_result = capture.stop();
        let viewer_result = viewer.stop();
        transition(SessionState::Stopped);

        drop(pipe);
        capture_result.map_err(Error::from)?;
        viewer_result.map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_flag_wait() {
        let flag = StopFlag::default();
        assert!(!flag.wait(Duration::from_millis(10)));
        flag.set();
        assert!(flag.is_set());
        assert!(flag.wait(Duration::from_secs(10)));
    }

    #[test]
    fn test_stop_flag_wakes_waiter() {
        let flag = Arc::new(StopFlag::default());
        let waiter = {
            let flag = Arc::clone(&flag);
            thread::spawn(move || flag.wait(Duration::from_secs(30)))
        };
        thread::sleep(Duration::from_millis(50));
        flag.set();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_handle_starts_idle() {
        let handle = SessionHandle::new();
        assert_eq!(handle.state(), SessionState::Idle);
        assert!(!handle.is_stop_requested());
        handle.clone().stop();
        assert!(handle.is_stop_requested());
    }
}
