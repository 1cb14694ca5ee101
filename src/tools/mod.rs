//! Concrete capture and viewer tools.
//!
//! - [`SshdumpTool`] - capture producer writing the remote capture into the pipe
//! - [`WiresharkTool`] - viewer reading the pipe
//! - [`SngrepTool`] - SIP viewer reading the pipe inside a terminal emulator

mod credentials;
mod sngrep;
mod sshdump;
mod wireshark;

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

pub use credentials::{Credentials, DEFAULT_IDENTITY_FILES};
pub use sngrep::SngrepTool;
pub use sshdump::{RemoteTarget, SshdumpTool};
pub use wireshark::WiresharkTool;

use crate::error::{Error, Result};

/// Packet analyzer used as the viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Analyzer {
    #[default]
    Wireshark,
    Sngrep,
}

impl Analyzer {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Wireshark => "wireshark",
            Self::Sngrep => "sngrep",
        }
    }
}

/// Check that `path` is a regular file with an execute bit set.
///
/// # Errors
///
/// Returns [`Error::NotExecutable`] otherwise.
pub fn ensure_executable(path: &Path) -> Result<()> {
    let executable = std::fs::metadata(path)
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0);
    if executable {
        Ok(())
    } else {
        Err(Error::NotExecutable {
            path: path.to_path_buf(),
        })
    }
}
