//! Named pipe shared by the capture producer and the viewer.
//!
//! The pipe only couples the two processes; no capture data passes through
//! this program.

use std::io;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Number of random letters after the `pipe_` prefix.
const NAME_LETTERS: usize = 5;

/// Attempts at finding a free name before giving up.
const MAX_ATTEMPTS: usize = 64;

/// A FIFO in a scratch directory, removed when dropped.
///
/// Removal also happens while unwinding from a panic.
#[derive(Debug)]
pub struct NamedPipe {
    path: PathBuf,
}

impl NamedPipe {
    /// Create a FIFO named `pipe_<5 lowercase letters>` inside `dir`.
    ///
    /// A relative `dir` is resolved against the working directory, so
    /// [`path`](Self::path) is always absolute.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pipe`] if the FIFO cannot be created or no free name
    /// was found.
    pub fn create_in(dir: &Path) -> Result<Self> {
        let dir = std::path::absolute(dir).map_err(|source| Error::Pipe {
            dir: dir.to_path_buf(),
            source,
        })?;
        for _ in 0..MAX_ATTEMPTS {
            let path = dir.join(random_name());
            if path.symlink_metadata().is_ok() {
                continue;
            }
            match mkfifo(&path, Mode::S_IRUSR | Mode::S_IWUSR) {
                Ok(()) => {
                    debug!(path = %path.display(), "created named pipe");
                    return Ok(Self { path });
                },
                Err(Errno::EEXIST) => {},
                Err(errno) => {
                    return Err(Error::Pipe {
                        dir: dir.to_path_buf(),
                        source: io::Error::from(errno),
                    });
                },
            }
        }

        Err(Error::Pipe {
            dir: dir.to_path_buf(),
            source: io::Error::new(io::ErrorKind::AlreadyExists, "no free pipe name"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for NamedPipe {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed named pipe"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {},
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove named pipe"),
        }
    }
}

fn random_name() -> String {
    let letters: String = Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(NAME_LETTERS)
        .map(|b| char::from(b'a' + b % 26))
        .collect();
    format!("pipe_{letters}")
}
