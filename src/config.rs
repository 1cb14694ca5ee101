//! Configuration for remote-pcap.
//!
//! Settings are read from an optional TOML file. Every field has a default,
//! so an absent file or an empty one is a valid configuration:
//!
//! ```toml
//! [tools]
//! sshdump = "/usr/lib/x86_64-linux-gnu/wireshark/extcap/sshdump"
//! wireshark = "/usr/bin/wireshark"
//! sngrep = "/usr/bin/sngrep"
//! terminal = ["gnome-terminal", "--wait", "--"]
//! tcpdump = "/usr/bin/tcpdump"
//!
//! [session]
//! scratch_dir = "/tmp"
//! poll_interval_ms = 1000
//! reader_timeout_ms = 1000
//! stop_wait_ms = 1000
//!
//! [logging]
//! level = "debug"
//! format = "text"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::session::SessionSettings;
use crate::supervisor::{ProcessSettings, ShutdownPolicy};
use crate::supervisor::process::DEFAULT_EXIT_POLL;

/// Intervals above this produce a warning.
const SLOW_INTERVAL_MS: u64 = 10_000;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Root configuration.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub tools: ToolsConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Locations of the local binaries and the remote tcpdump.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    pub sshdump: PathBuf,
    pub wireshark: PathBuf,
    pub sngrep: PathBuf,
    /// Terminal emulator prefix for sngrep.
    pub terminal: Vec<String>,
    /// tcpdump path on the remote host.
    pub tcpdump: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            sshdump: PathBuf::from("/usr/lib/x86_64-linux-gnu/wireshark/extcap/sshdump"),
            wireshark: PathBuf::from("/usr/bin/wireshark"),
            sngrep: PathBuf::from("/usr/bin/sngrep"),
            terminal: vec!["gnome-terminal".into(), "--wait".into(), "--".into()],
            tcpdump: "/usr/bin/tcpdump".into(),
        }
    }
}

/// Timing and scratch space for a capture session.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub scratch_dir: PathBuf,
    pub poll_interval_ms: u64,
    pub reader_timeout_ms: u64,
    /// Wait after each shutdown signal.
    pub stop_wait_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scratch_dir: PathBuf::from("/tmp"),
            poll_interval_ms: 1000,
            reader_timeout_ms: 1000,
            stop_wait_ms: 1000,
        }
    }
}

impl SessionConfig {
    /// Settings handed to [`Session`](crate::session::Session).
    pub fn settings(&self) -> SessionSettings {
        SessionSettings {
            scratch_dir: self.scratch_dir.clone(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            process: ProcessSettings {
                read_timeout: Duration::from_millis(self.reader_timeout_ms),
                exit_poll: DEFAULT_EXIT_POLL,
                shutdown: ShutdownPolicy::with_wait(Duration::from_millis(self.stop_wait_ms)),
            },
        }
    }
}

/// Output format of the stdout log.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging defaults; `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "debug".into(),
            format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Load configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - Fields have invalid types or are unknown
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load the explicit file if given, otherwise the default file if it
    /// exists, otherwise defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a file that should be read cannot be loaded.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        let default_path = crate::paths::get_config_path()?;
        if default_path.exists() {
            Self::load_from(default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error listing every problem found:
    /// - Zero poll, reader or stop intervals
    /// - Empty tool paths
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let intervals = [
            ("session.poll_interval_ms", self.session.poll_interval_ms),
            ("session.reader_timeout_ms", self.session.reader_timeout_ms),
            ("session.stop_wait_ms", self.session.stop_wait_ms),
        ];
        for (key, value) in intervals {
            if value == 0 {
                errors.push(format!("{key} cannot be 0"));
            } else if value > SLOW_INTERVAL_MS {
                warnings.push(format!(
                    "{key} is {value}ms\n  \
                     Recommendation: keep it near 1000ms so shutdown stays responsive"
                ));
            }
        }

        let paths = [
            ("tools.sshdump", &self.tools.sshdump),
            ("tools.wireshark", &self.tools.wireshark),
            ("tools.sngrep", &self.tools.sngrep),
        ];
        for (key, path) in paths {
            if path.as_os_str().is_empty() {
                errors.push(format!("{key} cannot be empty"));
            }
        }
        if self.tools.tcpdump.trim().is_empty() {
            errors.push("tools.tcpdump cannot be empty".to_string());
        }

        if !errors.is_empty() {
            anyhow::bail!("Invalid configuration:\n- {}", errors.join("\n- "));
        }

        Ok(ValidationResult { warnings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(!config.validate().unwrap().has_warnings());
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [tools]
            wireshark = "/opt/wireshark/bin/wireshark"

            [session]
            poll_interval_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.tools.wireshark, PathBuf::from("/opt/wireshark/bin/wireshark"));
        assert_eq!(config.tools.tcpdump, "/usr/bin/tcpdump");
        assert_eq!(config.session.poll_interval_ms, 250);
        assert_eq!(config.session.stop_wait_ms, 1000);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<Config>("[session]\npoll = 1").is_err());
    }

    #[test]
    fn test_settings_conversion() {
        let session = SessionConfig {
            scratch_dir: PathBuf::from("/var/tmp"),
            poll_interval_ms: 500,
            reader_timeout_ms: 200,
            stop_wait_ms: 300,
        };
        let settings = session.settings();
        assert_eq!(settings.scratch_dir, PathBuf::from("/var/tmp"));
        assert_eq!(settings.poll_interval, Duration::from_millis(500));
        assert_eq!(settings.process.read_timeout, Duration::from_millis(200));
        assert!(
            settings
                .process
                .shutdown
                .steps()
                .iter()
                .all(|s| s.wait == Duration::from_millis(300))
        );
    }

    #[test]
    fn test_validate_errors() {
        let mut config = Config::default();
        config.session.poll_interval_ms = 0;
        config.tools.sshdump = PathBuf::new();
        config.tools.tcpdump = " ".into();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("session.poll_interval_ms cannot be 0"));
        assert!(err.contains("tools.sshdump cannot be empty"));
        assert!(err.contains("tools.tcpdump cannot be empty"));
    }

    #[test]
    fn test_validate_warnings() {
        let mut config = Config::default();
        config.session.stop_wait_ms = 60_000;
        let result = config.validate().unwrap();
        assert!(result.has_warnings());
        assert!(result.warnings[0].contains("session.stop_wait_ms"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[logging]\nlevel = \"info\"\nformat = \"json\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Json);

        assert!(Config::load_from(dir.path().join("missing.toml")).is_err());
    }
}
