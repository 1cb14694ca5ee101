//! Structured records produced from diagnostic lines.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};

use super::Severity;
use super::parser::{Dialect, ParsedLine, TimeOfDay, parse_segments};
use crate::error::DiagnosticError;

/// One translated diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Local wall-clock time. Only the time of day comes from the line.
    pub timestamp: NaiveDateTime,
    pub level: Severity,
    pub subsystem: String,
    pub filename: String,
    /// `0` when the line carried no source location.
    pub lineno: u64,
    pub function: String,
    pub message: String,
}

impl LogRecord {
    /// Translate a line, dating it with today's local date.
    ///
    /// A line logged just before midnight and read just after it is dated
    /// one day late.
    ///
    /// # Errors
    ///
    /// See [`LogRecord::parse_on`].
    pub fn parse(line: &str, dialect: Dialect) -> Result<Self, DiagnosticError> {
        Self::parse_on(line, dialect, Local::now().date_naive())
    }

    /// Translate a line, dating it with `date`.
    ///
    /// # Errors
    ///
    /// Returns [`DiagnosticError::ParseMessage`] when the line does not fit
    /// the dialect or names an impossible time of day, and
    /// [`DiagnosticError::ConvertLogLevel`] for an unknown level literal.
    pub fn parse_on(line: &str, dialect: Dialect, date: NaiveDate) -> Result<Self, DiagnosticError> {
        let parsed = parse_segments(line, dialect)?;
        let level = Severity::from_literal(parsed.level)?;
        let time = time_of_day(parsed.time).ok_or_else(|| DiagnosticError::parse_message(line))?;

        let ParsedLine {
            subsystem,
            filename,
            lineno,
            function,
            message,
            ..
        } = parsed;

        Ok(Self {
            timestamp: date.and_time(time),
            level,
            subsystem: subsystem.to_string(),
            filename: filename.to_string(),
            lineno,
            function: function.to_string(),
            message: message.to_string(),
        })
    }
}

fn time_of_day(t: TimeOfDay) -> Option<NaiveTime> {
    NaiveTime::from_hms_micro_opt(t.hour, t.minute, t.second, t.microsecond)
}
