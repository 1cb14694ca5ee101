//! Wireshark as the viewer.

use std::path::{Path, PathBuf};

use crate::diagnostics::{Dialect, Logger, Severity};
use crate::supervisor::Tool;

/// Starts Wireshark capturing immediately from the pipe.
#[derive(Debug)]
pub struct WiresharkTool {
    logger: Logger,
    program: PathBuf,
    pipe: PathBuf,
}

impl WiresharkTool {
    pub fn new(logger: Logger, program: &Path, pipe: &Path) -> Self {
        Self {
            logger,
            program: program.to_path_buf(),
            pipe: pipe.to_path_buf(),
        }
    }
}

impl Tool for WiresharkTool {
    fn args(&self) -> Vec<String> {
        vec![
            self.program.to_string_lossy().into_owned(),
            "-k".into(),
            "--log-level".into(),
            "info".into(),
            "--interface".into(),
            self.pipe.to_string_lossy().into_owned(),
        ]
    }

    fn handle_stdout(&self, line: &str) {
        self.logger.translate(Dialect::Viewer, line, Severity::Debug);
    }

    fn handle_stderr(&self, line: &str) {
        self.logger.translate(Dialect::Viewer, line, Severity::Error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::UNNAMED_SUBSYSTEM;
    use crate::diagnostics::testing::{Entry, MemorySink};
    use std::sync::Arc;

    #[test]
    fn test_args() {
        let tool = WiresharkTool::new(
            Logger::tracing("wireshark"),
            Path::new("/usr/bin/wireshark"),
            Path::new("/tmp/pipe_qwert"),
        );
        assert_eq!(tool.args(), [
            "/usr/bin/wireshark",
            "-k",
            "--log-level",
            "info",
            "--interface",
            "/tmp/pipe_qwert",
        ]);
    }

    #[test]
    fn test_unnamed_subsystem_is_translated() {
        let sink = Arc::new(MemorySink::default());
        let tool = WiresharkTool::new(
            Logger::new("wireshark", sink.clone()),
            Path::new("/usr/bin/wireshark"),
            Path::new("/tmp/pipe_qwert"),
        );

        tool.handle_stderr("** (wireshark:99) 01:02:03.000100 [(none) WARNING] -- low memory");
        tool.handle_stderr("(wireshark:99): Gtk-WARNING **: theme parsing error");

        let entries = sink.entries();
        let Entry::Record { record, .. } = &entries[0] else {
            panic!("expected record, got {entries:?}");
        };
        assert_eq!(record.subsystem, UNNAMED_SUBSYSTEM);
        assert_eq!(entries[1], Entry::Raw {
            source: "wireshark".into(),
            level: Severity::Error,
            line: "(wireshark:99): Gtk-WARNING **: theme parsing error".into(),
        });
    }
}
