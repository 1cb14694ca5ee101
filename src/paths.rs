//! Path utilities for remote-pcap.
//!
//! - [`get_home_dir`] - `~/.remote-pcap/` (overridable with `REMOTE_PCAP_HOME`)
//! - [`get_config_path`] - `~/.remote-pcap/config.toml`
//! - [`get_ssh_dir`] - `~/.ssh/` (default identity files)

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable overriding the base directory.
pub const HOME_ENV: &str = "REMOTE_PCAP_HOME";

/// Get the remote-pcap base directory.
///
/// Resolution order:
/// 1. `REMOTE_PCAP_HOME` environment variable (if set and not empty)
/// 2. `~/.remote-pcap/` (default)
pub fn get_home_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var(HOME_ENV)
        && !home.is_empty()
    {
        return Ok(PathBuf::from(home));
    }

    let home = dirs::home_dir().context("Failed to get home directory")?;
    Ok(home.join(".remote-pcap"))
}

/// Get the configuration file path: `~/.remote-pcap/config.toml`
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("config.toml"))
}

/// Get the user's SSH directory: `~/.ssh/`
pub fn get_ssh_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Failed to get home directory")?;
    Ok(home.join(".ssh"))
}
