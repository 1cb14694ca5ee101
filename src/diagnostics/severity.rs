//! Severity levels reported by the capture and viewer tools.

use std::fmt;
use std::str::FromStr;

use crate::error::DiagnosticError;

/// Ordered severity of a translated record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    NotSet,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Map a level literal as printed by the tools.
    ///
    /// `NONE` is `NotSet`, while `MESSAGE` and `NOISY` are both chatty
    /// enough to be treated as `Debug`.
    ///
    /// # Errors
    ///
    /// Returns [`DiagnosticError::ConvertLogLevel`] for any other literal.
    pub fn from_literal(level: &str) -> Result<Self, DiagnosticError> {
        match level {
            "NONE" => Ok(Self::NotSet),
            "DEBUG" | "MESSAGE" | "NOISY" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARNING" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            "CRITICAL" => Ok(Self::Critical),
            other => Err(DiagnosticError::convert_log_level(other)),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotSet => "NOTSET",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

impl FromStr for Severity {
    type Err = DiagnosticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_literal(s)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
