//! sngrep as the viewer.
//!
//! sngrep is a curses application, so it runs inside a terminal emulator and
//! its own output never reaches us. Whatever the emulator prints is passed
//! through untranslated.

use std::path::{Path, PathBuf};

use crate::diagnostics::{Logger, Severity};
use crate::supervisor::Tool;

/// Opens sngrep on the pipe in a new terminal window.
#[derive(Debug)]
pub struct SngrepTool {
    logger: Logger,
    terminal: Vec<String>,
    program: PathBuf,
    pipe: PathBuf,
}

impl SngrepTool {
    /// `terminal` is the emulator invocation that precedes the sngrep
    /// command, e.g. `gnome-terminal --wait --`. It must wait for sngrep to
    /// exit so that the session can notice when the viewer is closed.
    pub fn new(logger: Logger, terminal: &[String], program: &Path, pipe: &Path) -> Self {
        Self {
            logger,
            terminal: terminal.to_vec(),
            program: program.to_path_buf(),
            pipe: pipe.to_path_buf(),
        }
    }
}

impl Tool for SngrepTool {
    fn args(&self) -> Vec<String> {
        let mut args = self.terminal.clone();
        args.extend([
            self.program.to_string_lossy().into_owned(),
            "--rtp".into(),
            "--input".into(),
            self.pipe.to_string_lossy().into_owned(),
        ]);
        args
    }

    fn handle_stdout(&self, line: &str) {
        self.logger.raw(Severity::NotSet, line);
    }

    fn handle_stderr(&self, line: &str) {
        self.logger.raw(Severity::NotSet, line);
    }
}
