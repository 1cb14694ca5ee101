//! One supervised external process and its two output readers.

use std::fmt;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use super::reader::{DEFAULT_READ_TIMEOUT, LineHandler, LineReader};
use super::shutdown::{ShutdownPolicy, StopOutcome, escalate, exit_code, wait_timeout};
use crate::diagnostics::Logger;
use crate::error::{Error, Result, StopError};

/// Default bound on a single exit-code poll.
pub const DEFAULT_EXIT_POLL: Duration = Duration::from_millis(100);

/// What a supervised process runs and how its output is handled.
pub trait Tool: Send + Sync {
    /// Full argument vector, program first.
    fn args(&self) -> Vec<String>;

    fn handle_stdout(&self, line: &str);

    fn handle_stderr(&self, line: &str);
}

/// Timing knobs shared by every supervised process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSettings {
    /// Readiness wait of the output readers.
    pub read_timeout: Duration,
    /// Upper bound on how long [`SupervisedProcess::returncode`] blocks.
    pub exit_poll: Duration,
    pub shutdown: ShutdownPolicy,
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            exit_poll: DEFAULT_EXIT_POLL,
            shutdown: ShutdownPolicy::default(),
        }
    }
}

/// An external command under supervision.
///
/// Created idle; [`run`](Self::run) spawns it with stdin closed and both
/// output streams wired to the tool's handlers.
pub struct SupervisedProcess {
    logger: Logger,
    tool: Arc<dyn Tool>,
    settings: ProcessSettings,
    child: Option<Child>,
    stdout_reader: Option<LineReader>,
    stderr_reader: Option<LineReader>,
    returncode: Option<i32>,
}

impl SupervisedProcess {
    pub fn new(logger: Logger, tool: Arc<dyn Tool>, settings: ProcessSettings) -> Self {
        Self {
            logger,
            tool,
            settings,
            child: None,
            stdout_reader: None,
            stderr_reader: None,
            returncode: None,
        }
    }

    pub fn name(&self) -> &str {
        self.logger.name()
    }

    /// Process id once started.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Spawn the command and start both readers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`] if the command cannot be started, and
    /// [`Error::AlreadyStarted`] on a second call.
    pub fn run(&mut self) -> Result<()> {
        if self.child.is_some() {
            return Err(Error::AlreadyStarted {
                name: self.name().to_string(),
            });
        }

        let args = self.tool.args();
        let Some((program, rest)) = args.split_first() else {
            return Err(Error::Config(format!(
                "'{}' has an empty argument vector",
                self.name()
            )));
        };

        info!(component = %self.name(), args = ?args, "Starting ...");
        let mut child = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::spawn(self.name(), e))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        self.child = Some(child);

        if let Some(stdout) = stdout {
            let tool = Arc::clone(&self.tool);
            let handler: LineHandler = Box::new(move |line| tool.handle_stdout(line));
            self.stdout_reader = Some(self.spawn_reader("stdout_reader", stdout, handler)?);
        }
        if let Some(stderr) = stderr {
            let tool = Arc::clone(&self.tool);
            let handler: LineHandler = Box::new(move |line| tool.handle_stderr(line));
            self.stderr_reader = Some(self.spawn_reader("stderr_reader", stderr, handler)?);
        }

        Ok(())
    }

    fn spawn_reader<R>(&self, suffix: &str, stream: R, handler: LineHandler) -> Result<LineReader>
    where
        R: std::io::Read + std::os::fd::AsFd + Send + 'static,
    {
        let logger = self.logger.child(suffix);
        LineReader::spawn(&logger, stream, self.settings.read_timeout, Some(handler))
            .map_err(|e| Error::io(format!("starting {}", logger.name()), e))
    }

    /// Exit code if the process has exited, `None` while it runs.
    ///
    /// Blocks for at most the configured exit poll. A process that was
    /// never started reports `None`.
    pub fn returncode(&mut self) -> Option<i32> {
        if self.returncode.is_some() {
            return self.returncode;
        }
        let child = self.child.as_mut()?;
        match wait_timeout(child, self.settings.exit_poll) {
            Ok(status) => {
                self.returncode = status.map(exit_code);
            },
            Err(e) => {
                warn!(component = %self.logger.name(), error = %e, "failed to poll process");
            },
        }
        self.returncode
    }

    /// Stop the process, escalating through the shutdown policy.
    ///
    /// Does nothing if the process already exited or never started.
    ///
    /// # Errors
    ///
    /// Returns [`StopError`] if the process outlives every step.
    pub fn stop(&mut self) -> std::result::Result<(), StopError> {
        if self.returncode().is_some() {
            // A grandchild may still hold the output streams open.
            self.stop_readers();
            return Ok(());
        }
        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };

        info!(component = %self.logger.name(), "Stopping ...");
        let pid = child.id();
        match escalate(child, &self.settings.shutdown, self.logger.name()) {
            StopOutcome::Exited(code) => self.returncode = Some(code),
            StopOutcome::Exhausted => {
                error!(component = %self.logger.name(), pid, "Failed to stop process with pid {pid}");
                return Err(StopError {
                    name: self.name().to_string(),
                    pid,
                });
            },
        }

        self.stop_readers();
        Ok(())
    }

    #[cfg(test)]
    fn readers_running(&self) -> bool {
        [&self.stdout_reader, &self.stderr_reader]
            .into_iter()
            .flatten()
            .any(LineReader::is_running)
    }

    fn stop_readers(&self) {
        for reader in [&self.stdout_reader, &self.stderr_reader].into_iter().flatten() {
            reader.stop();
        }
    }
}

impl Drop for SupervisedProcess {
    fn drop(&mut self) {
        self.stop_readers();
        if self.returncode.is_none()
            && let Some(child) = self.child.as_mut()
            && let Ok(None) = child.try_wait()
        {
            warn!(component = %self.logger.name(), pid = child.id(), "killing process left running");
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl fmt::Debug for SupervisedProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisedProcess")
            .field("name", &self.name())
            .field("pid", &self.pid())
            .field("returncode", &self.returncode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shell(&'static str);

    impl Tool for Shell {
        fn args(&self) -> Vec<String> {
            vec!["/bin/sh".into(), "-c".into(), self.0.into()]
        }

        fn handle_stdout(&self, _line: &str) {}

        fn handle_stderr(&self, _line: &str) {}
    }

    fn process(script: &'static str) -> SupervisedProcess {
        SupervisedProcess::new(
            Logger::tracing("test"),
            Arc::new(Shell(script)),
            ProcessSettings::default(),
        )
    }

    #[test]
    fn test_not_started() {
        let mut proc = process("exit 0");
        assert_eq!(proc.pid(), None);
        assert_eq!(proc.returncode(), None);
        assert!(proc.stop().is_ok());
    }

    #[test]
    fn test_run_twice_is_rejected() {
        let mut proc = process("exec sleep 30");
        proc.run().unwrap();
        assert!(matches!(proc.run(), Err(Error::AlreadyStarted { .. })));
        proc.stop().unwrap();
    }

    #[test]
    fn test_spawn_failure() {
        struct Missing;
        impl Tool for Missing {
            fn args(&self) -> Vec<String> {
                vec!["/nonexistent/remote-pcap-tool".into()]
            }
            fn handle_stdout(&self, _line: &str) {}
            fn handle_stderr(&self, _line: &str) {}
        }

        let mut proc =
            SupervisedProcess::new(Logger::tracing("missing"), Arc::new(Missing), ProcessSettings::default());
        let err = proc.run().unwrap_err();
        assert!(matches!(err, Error::Spawn { ref name, .. } if name == "missing"));
        assert_eq!(proc.pid(), None);
    }

    #[test]
    fn test_stop_after_exit_releases_readers() {
        use std::time::Instant;

        let settings = ProcessSettings {
            read_timeout: Duration::from_millis(50),
            exit_poll: Duration::from_millis(50),
            ..ProcessSettings::default()
        };
        // The background sleep keeps both pipes open after the shell exits.
        let mut proc = SupervisedProcess::new(
            Logger::tracing("orphaned"),
            Arc::new(Shell("sleep 5 & exit 0")),
            settings,
        );
        proc.run().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while proc.returncode().is_none() && Instant::now() < deadline {}
        assert_eq!(proc.returncode(), Some(0));
        assert!(proc.readers_running());

        proc.stop().unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while proc.readers_running() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(!proc.readers_running());
    }

    #[test]
    fn test_empty_args() {
        struct Empty;
        impl Tool for Empty {
            fn args(&self) -> Vec<String> {
                Vec::new()
            }
            fn handle_stdout(&self, _line: &str) {}
            fn handle_stderr(&self, _line: &str) {}
        }

        let mut proc =
            SupervisedProcess::new(Logger::tracing("empty"), Arc::new(Empty), ProcessSettings::default());
        assert!(matches!(proc.run(), Err(Error::Config(_))));
    }
}
