//! Shared helpers for the integration tests.
//!
//! Tests drive `/bin/sh` scripts through the real supervisor so that spawning,
//! output readers and signal delivery are exercised end to end.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use remote_pcap::diagnostics::{LogRecord, LogSink, Logger, Severity};
use remote_pcap::supervisor::{ProcessSettings, ShutdownPolicy, Tool};

/// Everything a [`CollectingSink`] received, flattened to `(source, text)`.
#[derive(Debug, Default)]
pub struct CollectingSink {
    lines: Mutex<Vec<(String, String)>>,
}

impl CollectingSink {
    pub fn lines(&self) -> Vec<(String, String)> {
        self.lines.lock().clone()
    }
}

impl LogSink for CollectingSink {
    fn record(&self, source: &str, record: &LogRecord) {
        self.lines
            .lock()
            .push((source.to_string(), record.message.clone()));
    }

    fn raw(&self, source: &str, _level: Severity, line: &str) {
        self.lines.lock().push((source.to_string(), line.to_string()));
    }
}

/// A `/bin/sh -c` script; the pipe path, when set, is passed as `$1`.
pub struct ShellTool {
    script: String,
    pipe: Option<PathBuf>,
    stdout: Mutex<Vec<String>>,
    stderr: Mutex<Vec<String>>,
}

impl ShellTool {
    pub fn new(script: &str) -> Self {
        Self {
            script: script.to_string(),
            pipe: None,
            stdout: Mutex::new(Vec::new()),
            stderr: Mutex::new(Vec::new()),
        }
    }

    pub fn with_pipe(script: &str, pipe: &Path) -> Self {
        Self {
            pipe: Some(pipe.to_path_buf()),
            ..Self::new(script)
        }
    }

    pub fn stdout(&self) -> Vec<String> {
        self.stdout.lock().clone()
    }

    pub fn stderr(&self) -> Vec<String> {
        self.stderr.lock().clone()
    }
}

impl Tool for ShellTool {
    fn args(&self) -> Vec<String> {
        let mut args = vec!["/bin/sh".into(), "-c".into(), self.script.clone(), "tool".into()];
        if let Some(pipe) = &self.pipe {
            args.push(pipe.display().to_string());
        }
        args
    }

    fn handle_stdout(&self, line: &str) {
        self.stdout.lock().push(line.to_string());
    }

    fn handle_stderr(&self, line: &str) {
        self.stderr.lock().push(line.to_string());
    }
}

pub fn memory_logger(name: &str) -> (Logger, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::default());
    (Logger::new(name, sink.clone()), sink)
}

/// Short timings so tests do not sit through one-second waits.
pub fn fast_settings() -> ProcessSettings {
    ProcessSettings {
        read_timeout: Duration::from_millis(50),
        exit_poll: Duration::from_millis(50),
        shutdown: ShutdownPolicy::with_wait(Duration::from_millis(300)),
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}
