//! Translation of tool output into structured log records.
//!
//! The capture and viewer tools print free-text diagnostics. Each line is
//! segmented by [`parser`], turned into a [`LogRecord`], and handed to a
//! [`LogSink`]. Lines that do not parse still reach the sink as raw text.
//!
//! ## Module Structure
//!
//! - [`parser`]: Segment grammar for both dialects
//! - [`record`]: Structured record and timestamp reconstruction
//! - [`severity`]: Level literal mapping

pub mod parser;
pub mod record;
mod severity;

use std::fmt;
use std::sync::Arc;

pub use parser::{Dialect, UNNAMED_SUBSYSTEM};
pub use record::LogRecord;
pub use severity::Severity;

/// Receiver for translated tool output.
pub trait LogSink: Send + Sync {
    /// A line that parsed into a record.
    fn record(&self, source: &str, record: &LogRecord);

    /// A line that did not parse, with the severity chosen by the caller.
    fn raw(&self, source: &str, level: Severity, line: &str);
}

/// Sink that re-emits everything as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

macro_rules! emit {
    ($level:expr, $($rest:tt)+) => {
        match $level {
            Severity::NotSet => tracing::trace!($($rest)+),
            Severity::Debug => tracing::debug!($($rest)+),
            Severity::Info => tracing::info!($($rest)+),
            Severity::Warning => tracing::warn!($($rest)+),
            Severity::Error | Severity::Critical => tracing::error!($($rest)+),
        }
    };
}

impl LogSink for TracingSink {
    fn record(&self, source: &str, record: &LogRecord) {
        emit!(
            record.level,
            component = source,
            subsystem = %record.subsystem,
            file = %record.filename,
            line = record.lineno,
            function = %record.function,
            time = %record.timestamp.format("%H:%M:%S%.6f"),
            critical = record.level == Severity::Critical,
            "{} -- {}",
            record.subsystem,
            record.message
        );
    }

    fn raw(&self, source: &str, level: Severity, line: &str) {
        emit!(level, component = source, raw = true, "{line}");
    }
}

/// Named handle through which a component reports what its tool printed.
///
/// Components receive one at construction; names nest with dots, so the
/// stdout reader of `dumper` reports as `dumper.stdout_reader`.
#[derive(Clone)]
pub struct Logger {
    name: Arc<str>,
    sink: Arc<dyn LogSink>,
}

impl Logger {
    pub fn new(name: impl Into<Arc<str>>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            name: name.into(),
            sink,
        }
    }

    /// Logger backed by [`TracingSink`].
    pub fn tracing(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, Arc::new(TracingSink))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Derive a logger for a sub-component.
    #[must_use]
    pub fn child(&self, suffix: &str) -> Self {
        Self {
            name: format!("{}.{suffix}", self.name).into(),
            sink: Arc::clone(&self.sink),
        }
    }

    /// Logger with a different name and the same sink.
    #[must_use]
    pub fn sibling(&self, name: &str) -> Self {
        Self {
            name: name.into(),
            sink: Arc::clone(&self.sink),
        }
    }

    pub fn record(&self, record: &LogRecord) {
        self.sink.record(&self.name, record);
    }

    pub fn raw(&self, level: Severity, line: &str) {
        self.sink.raw(&self.name, level, line);
    }

    /// Parse `line` in `dialect` and forward it, falling back to raw text
    /// at `fallback` when the line cannot be translated.
    pub fn translate(&self, dialect: Dialect, line: &str, fallback: Severity) {
        match LogRecord::parse(line, dialect) {
            Ok(record) => self.record(&record),
            Err(_) => self.raw(fallback, line),
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("name", &self.name).finish()
    }
}
