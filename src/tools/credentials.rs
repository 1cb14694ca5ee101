//! SSH login material for the capture producer.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Key files tried in `~/.ssh` when neither a password nor a key was given.
pub const DEFAULT_IDENTITY_FILES: [&str; 4] = ["id_rsa", "id_dsa", "id_ecdsa", "id_ed25519"];

/// How sshdump authenticates against the remote host.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Password(String),
    IdentityFile(PathBuf),
}

impl Credentials {
    /// Pick credentials from explicit options, falling back to the first
    /// default key found in `ssh_dir`.
    ///
    /// An explicit password wins over an explicit key file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Credentials`] if nothing usable is found or the
    /// chosen key file does not exist.
    pub fn resolve(
        password: Option<String>,
        identity_file: Option<PathBuf>,
        ssh_dir: Option<&Path>,
    ) -> Result<Self> {
        if let Some(password) = password {
            return Ok(Self::Password(password));
        }

        let identity_file = identity_file
            .or_else(|| ssh_dir.and_then(find_default_identity))
            .ok_or_else(|| Error::Credentials("public key or password is not set".to_string()))?;

        if !identity_file.is_file() {
            return Err(Error::Credentials(format!(
                "key file does not exist: {}",
                identity_file.display()
            )));
        }
        Ok(Self::IdentityFile(identity_file))
    }
}

fn find_default_identity(ssh_dir: &Path) -> Option<PathBuf> {
    let found = DEFAULT_IDENTITY_FILES
        .iter()
        .map(|name| ssh_dir.join(name))
        .find(|path| path.is_file());
    if let Some(path) = &found {
        debug!(path = %path.display(), "using default identity file");
    }
    found
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => f.write_str("Password(***)"),
            Self::IdentityFile(path) => f.debug_tuple("IdentityFile").field(path).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_password_wins() {
        let creds = Credentials::resolve(
            Some("secret".into()),
            Some(PathBuf::from("/nonexistent/key")),
            None,
        )
        .unwrap();
        assert_eq!(creds, Credentials::Password("secret".into()));
        assert_eq!(format!("{creds:?}"), "Password(***)");
    }

    #[test]
    fn test_explicit_key_must_exist() {
        let err = Credentials::resolve(None, Some(PathBuf::from("/nonexistent/key")), None)
            .unwrap_err();
        assert!(matches!(err, Error::Credentials(msg) if msg.contains("/nonexistent/key")));
    }

    #[test]
    fn test_default_key_lookup_order() {
        let ssh = TempDir::new().unwrap();
        fs::write(ssh.path().join("id_ed25519"), "key").unwrap();
        fs::write(ssh.path().join("id_ecdsa"), "key").unwrap();

        let creds = Credentials::resolve(None, None, Some(ssh.path())).unwrap();
        assert_eq!(creds, Credentials::IdentityFile(ssh.path().join("id_ecdsa")));
    }

    #[test]
    fn test_nothing_available() {
        let ssh = TempDir::new().unwrap();
        let err = Credentials::resolve(None, None, Some(ssh.path())).unwrap_err();
        assert!(matches!(err, Error::Credentials(_)));

        assert!(Credentials::resolve(None, None, None).is_err());
    }
}
