//! Escalating shutdown of an external process.
//!
//! A [`ShutdownPolicy`] is a finite list of signal/wait pairs. Each signal is
//! sent only if the process outlived the previous step's wait.

use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{info, warn};

/// Wait applied after each signal by default.
pub const DEFAULT_STEP_WAIT: Duration = Duration::from_secs(1);

/// Granularity of the exit polling loop.
const WAIT_STEP: Duration = Duration::from_millis(10);

/// One signal and how long to wait for it to take effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationStep {
    pub signal: Signal,
    pub wait: Duration,
}

/// Ordered escalation steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownPolicy {
    steps: Vec<EscalationStep>,
}

impl Default for ShutdownPolicy {
    fn default() -> Self {
        Self::with_wait(DEFAULT_STEP_WAIT)
    }
}

impl ShutdownPolicy {
    /// `SIGUSR1`, then `SIGTERM`, then `SIGKILL`, each followed by `wait`.
    #[must_use]
    pub fn with_wait(wait: Duration) -> Self {
        Self::new(
            [Signal::SIGUSR1, Signal::SIGTERM, Signal::SIGKILL]
                .into_iter()
                .map(|signal| EscalationStep { signal, wait })
                .collect(),
        )
    }

    pub const fn new(steps: Vec<EscalationStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[EscalationStep] {
        &self.steps
    }
}

/// Result of running a [`ShutdownPolicy`] against a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The child exited with this code.
    Exited(i32),
    /// Every step ran and the child is still alive.
    Exhausted,
}

/// Signal `child` step by step until it exits or the policy runs out.
pub fn escalate(child: &mut Child, policy: &ShutdownPolicy, component: &str) -> StopOutcome {
    let pid = child.id();
    #[allow(clippy::cast_possible_wrap)]
    let target = Pid::from_raw(pid as i32);

    for step in policy.steps() {
        info!(component, pid, signal = %step.signal, "Sending {} to process with pid {pid}", step.signal);
        match signal::kill(target, step.signal) {
            // Already gone; reaping below reports the status
            Ok(()) | Err(Errno::ESRCH) => {},
            Err(errno) => warn!(component, pid, error = %errno, "failed to send signal"),
        }

        match wait_timeout(child, step.wait) {
            Ok(Some(status)) => {
                let code = exit_code(status);
                info!(component, pid, code, "Process with pid {pid} was stopped by exitcode {code}");
                return StopOutcome::Exited(code);
            },
            Ok(None) => {},
            Err(e) => warn!(component, pid, error = %e, "failed to wait for process"),
        }
    }

    StopOutcome::Exhausted
}

/// Wait up to `timeout` for `child` to exit.
///
/// Returns `Ok(None)` if it is still running when the timeout elapses.
pub fn wait_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(WAIT_STEP.min(deadline - now));
    }
}

/// Exit code of a finished process, or the negated signal number when it
/// was killed by a signal.
pub fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or_else(|| status.signal().map_or(-1, |sig| -sig))
}
