//! Background line reader for one output stream of a child process.
//!
//! The worker waits for readiness with `poll(2)` and a short timeout, so a
//! stop request is noticed within one timeout even when the stream is idle.

use std::io::{self, Read};
use std::os::fd::AsFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use tracing::{debug, info, warn};

use crate::diagnostics::Logger;

/// Callback invoked once per complete line, in stream order.
pub type LineHandler = Box<dyn FnMut(&str) + Send>;

/// Default readiness wait between stop-flag checks.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

const CHUNK_SIZE: usize = 4096;

/// A single-use worker delivering lines from one stream.
#[derive(Debug)]
pub struct LineReader {
    name: String,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl LineReader {
    /// Start reading `stream` on a new thread.
    ///
    /// Lines are decoded lossily as UTF-8 and trailing spaces and newlines
    /// are stripped. Bytes after the last newline are dropped at end of
    /// stream. Without a handler, lines are read and discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread cannot be spawned.
    pub fn spawn<R>(
        logger: &Logger,
        stream: R,
        timeout: Duration,
        handler: Option<LineHandler>,
    ) -> io::Result<Self>
    where
        R: Read + AsFd + Send + 'static,
    {
        let name = logger.name().to_string();
        let stop = Arc::new(AtomicBool::new(false));

        let worker = Worker {
            name: name.clone(),
            stop: Arc::clone(&stop),
            timeout: poll_timeout(timeout),
            handler: handler.unwrap_or_else(|| Box::new(|_| {})),
        };
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker.run(stream))?;

        Ok(Self {
            name,
            stop,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the worker thread is still alive.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Ask the worker to exit at its next wake-up.
    ///
    /// Safe to call any number of times, before or after the worker ended.
    pub fn stop(&self) {
        if self.is_running() && !self.stop.swap(true, Ordering::AcqRel) {
            info!(component = %self.name, "Stopping ...");
        }
    }

    /// Wait for the worker thread to exit.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!(component = %self.name, "line handler panicked");
        }
    }
}

impl Drop for LineReader {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

struct Worker {
    name: String,
    stop: Arc<AtomicBool>,
    timeout: PollTimeout,
    handler: LineHandler,
}

impl Worker {
    fn run<R: Read + AsFd>(mut self, mut stream: R) {
        info!(component = %self.name, "Starting ...");

        let mut pending = Vec::new();
        let mut chunk = [0u8; CHUNK_SIZE];

        while !self.stop.load(Ordering::Acquire) {
            let revents = {
                let mut fds = [PollFd::new(stream.as_fd(), PollFlags::POLLIN)];
                match poll(&mut fds, self.timeout) {
                    Ok(0) | Err(Errno::EINTR) => continue,
                    Ok(_) => fds[0].revents().unwrap_or_else(PollFlags::empty),
                    Err(errno) => {
                        warn!(component = %self.name, error = %errno, "poll failed");
                        break;
                    },
                }
            };

            if revents.contains(PollFlags::POLLIN) {
                match stream.read(&mut chunk) {
                    Ok(0) => {
                        info!(component = %self.name, "Received end of stream, terminating reader");
                        break;
                    },
                    Ok(n) => {
                        pending.extend_from_slice(&chunk[..n]);
                        drain_lines(&mut pending, &mut self.handler);
                    },
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
                    Err(e) => {
                        warn!(component = %self.name, error = %e, "read failed");
                        break;
                    },
                }
            } else if revents.intersects(PollFlags::POLLHUP | PollFlags::POLLERR) {
                info!(component = %self.name, "Received end of stream, terminating reader");
                break;
            } else if revents.contains(PollFlags::POLLNVAL) {
                warn!(component = %self.name, "stream descriptor is not open");
                break;
            }
        }

        if !pending.is_empty() {
            debug!(
                component = %self.name,
                bytes = pending.len(),
                "discarding unterminated trailing line"
            );
        }
    }
}

/// Hand every complete line in `pending` to `handler`, keeping the
/// unterminated tail.
fn drain_lines(pending: &mut Vec<u8>, handler: &mut LineHandler) {
    while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = pending.drain(..=pos).collect();
        let text = String::from_utf8_lossy(&line);
        handler(text.trim_end_matches([' ', '\n']));
    }
}

fn poll_timeout(timeout: Duration) -> PollTimeout {
    let millis = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
    PollTimeout::from(millis)
}
