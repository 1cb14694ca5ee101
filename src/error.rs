//! Error types for typed error handling.
//!
//! Parsing failures ([`DiagnosticError`]) are always recovered where they
//! happen. Everything in [`Error`] propagates to the session owner.

use std::path::PathBuf;

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A diagnostic line could not be translated into a structured record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiagnosticError {
    /// The line matched no known segment grammar.
    #[error("failed to parse log message: \"{line}\"")]
    ParseMessage { line: String },

    /// The severity literal is not one the tools are known to emit.
    #[error("unknown log level: {level}")]
    ConvertLogLevel { level: String },
}

impl DiagnosticError {
    pub(crate) fn parse_message(line: impl Into<String>) -> Self {
        Self::ParseMessage { line: line.into() }
    }

    pub(crate) fn convert_log_level(level: impl Into<String>) -> Self {
        Self::ConvertLogLevel {
            level: level.into(),
        }
    }
}

/// Escalated shutdown did not terminate the process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to stop process '{name}' with pid {pid}")]
pub struct StopError {
    pub name: String,
    pub pid: u32,
}

/// Session errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Named pipe could not be created.
    #[error("failed to create named pipe in {dir:?}: {source}")]
    Pipe {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// External command could not be started.
    #[error("failed to spawn '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// `run` was called on a process that was already spawned.
    #[error("process '{name}' was already started")]
    AlreadyStarted { name: String },

    /// Process survived every escalation step.
    #[error(transparent)]
    Stop(#[from] StopError),

    /// Missing or unusable login material.
    #[error("credentials error: {0}")]
    Credentials(String),

    /// Local tool is missing or lacks the execute bit.
    #[error("not an executable file: {path:?}")]
    NotExecutable { path: PathBuf },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error with context.
    #[error("IO error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a spawn error for the named process.
    pub fn spawn(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            name: name.into(),
            source,
        }
    }
}
