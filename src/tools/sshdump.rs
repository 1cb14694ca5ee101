//! sshdump as the capture producer.

use std::path::{Path, PathBuf};

use super::Credentials;
use crate::diagnostics::{Dialect, Logger, Severity};
use crate::supervisor::Tool;

/// Remote end of the capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub hostname: String,
    pub port: u16,
    pub user: String,
    pub credentials: Credentials,
    /// Interface captured on the remote host.
    pub interface: String,
    /// Path of tcpdump on the remote host.
    pub tcpdump: String,
}

impl RemoteTarget {
    /// Command sshdump runs remotely. SSH traffic is filtered out so the
    /// capture does not record its own transport.
    pub fn capture_command(&self) -> String {
        format!(
            "sudo {} -i {} -U -w - -f not tcp port 22",
            self.tcpdump, self.interface
        )
    }
}

/// Runs sshdump in capture mode with the pipe as its FIFO.
#[derive(Debug)]
pub struct SshdumpTool {
    logger: Logger,
    program: PathBuf,
    pipe: PathBuf,
    target: RemoteTarget,
}

impl SshdumpTool {
    pub fn new(logger: Logger, program: &Path, pipe: &Path, target: RemoteTarget) -> Self {
        Self {
            logger,
            program: program.to_path_buf(),
            pipe: pipe.to_path_buf(),
            target,
        }
    }
}

impl Tool for SshdumpTool {
    fn args(&self) -> Vec<String> {
        let t = &self.target;
        let mut args = vec![
            self.program.to_string_lossy().into_owned(),
            "--capture".into(),
            "--log-level".into(),
            "debug".into(),
            "--extcap-interface".into(),
            "ssh".into(),
            "--fifo".into(),
            self.pipe.to_string_lossy().into_owned(),
            "--remote-host".into(),
            t.hostname.clone(),
            "--remote-port".into(),
            t.port.to_string(),
            "--remote-username".into(),
            t.user.clone(),
        ];
        match &t.credentials {
            Credentials::IdentityFile(key) => {
                args.extend(["--sshkey".into(), key.to_string_lossy().into_owned()]);
            },
            Credentials::Password(password) => {
                args.extend(["--remote-password".into(), password.clone()]);
            },
        }
        args.extend(["--remote-capture-command".into(), t.capture_command()]);
        args
    }

    fn handle_stdout(&self, line: &str) {
        self.logger.translate(Dialect::Capture, line, Severity::Debug);
    }

    fn handle_stderr(&self, line: &str) {
        self.logger.translate(Dialect::Capture, line, Severity::Error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::testing::{Entry, MemorySink};
    use std::sync::Arc;

    fn target(credentials: Credentials) -> RemoteTarget {
        RemoteTarget {
            hostname: "10.0.0.5".into(),
            port: 2222,
            user: "ops".into(),
            credentials,
            interface: "eth1".into(),
            tcpdump: "/usr/sbin/tcpdump".into(),
        }
    }

    #[test]
    fn test_args_with_key() {
        let tool = SshdumpTool::new(
            Logger::tracing("dumper"),
            Path::new("/opt/sshdump"),
            Path::new("/tmp/pipe_abcde"),
            target(Credentials::IdentityFile("/home/ops/.ssh/id_rsa".into())),
        );
        assert_eq!(tool.args(), [
            "/opt/sshdump",
            "--capture",
            "--log-level",
            "debug",
            "--extcap-interface",
            "ssh",
            "--fifo",
            "/tmp/pipe_abcde",
            "--remote-host",
            "10.0.0.5",
            "--remote-port",
            "2222",
            "--remote-username",
            "ops",
            "--sshkey",
            "/home/ops/.ssh/id_rsa",
            "--remote-capture-command",
            "sudo /usr/sbin/tcpdump -i eth1 -U -w - -f not tcp port 22",
        ]);
    }

    #[test]
    fn test_args_with_password() {
        let tool = SshdumpTool::new(
            Logger::tracing("dumper"),
            Path::new("/opt/sshdump"),
            Path::new("/tmp/pipe_abcde"),
            target(Credentials::Password("hunter2".into())),
        );
        let args = tool.args();
        let pos = args.iter().position(|a| a == "--remote-password").unwrap();
        assert_eq!(args[pos + 1], "hunter2");
        assert!(!args.iter().any(|a| a == "--sshkey"));
    }

    #[test]
    fn test_capture_dialect_and_fallbacks() {
        let sink = Arc::new(MemorySink::default());
        let tool = SshdumpTool::new(
            Logger::new("dumper", sink.clone()),
            Path::new("/opt/sshdump"),
            Path::new("/tmp/pipe_abcde"),
            target(Credentials::Password("x".into())),
        );

        tool.handle_stdout("** (sshdump:1) 10:00:00.000001 [ssh INFO] -- connected");
        tool.handle_stderr("** (sshdump:1) 10:00:00.000001 [(none) INFO] -- no subsystem");
        tool.handle_stdout("not a diagnostic");

        let entries = sink.entries();
        assert!(matches!(&entries[0], Entry::Record { record, .. } if record.message == "connected"));
        assert!(matches!(&entries[1], Entry::Raw { level: Severity::Error, .. }));
        assert!(matches!(&entries[2], Entry::Raw { level: Severity::Debug, .. }));
    }
}
