//! Segment parser for the tools' free-text diagnostic lines.
//!
//! A line is read left to right as a fixed series of segments:
//!
//! ```text
//! ** (dumpcap:1234) 10:15:42.123456 [Capture INFO] sshdump.c:42 -- main(): started
//! |------------ timestamp ---------| |-- level ---| |------- location -----------|
//! ```
//!
//! Each segment is matched against the unconsumed suffix only. Within a
//! segment the alternatives are tried in order and the first match wins.

use crate::error::DiagnosticError;

/// Subsystem reported for viewer lines tagged `[(none) LEVEL]`.
pub const UNNAMED_SUBSYSTEM: &str = "wireshark";

/// Which producer emitted the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// sshdump: every line names its subsystem.
    Capture,
    /// wireshark: lines may carry `(none)` instead of a subsystem.
    Viewer,
}

/// Time of day taken from the timestamp segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub microsecond: u32,
}

/// Borrowed fields of a successfully segmented line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine<'a> {
    pub time: TimeOfDay,
    pub subsystem: &'a str,
    pub level: &'a str,
    pub filename: &'a str,
    pub lineno: u64,
    pub function: &'a str,
    pub message: &'a str,
}

/// Split a line into its segments.
///
/// The level literal is returned verbatim; mapping it to a
/// [`Severity`](super::Severity) is a separate step.
///
/// # Errors
///
/// Returns [`DiagnosticError::ParseMessage`] when any segment has no
/// matching alternative.
pub fn parse_segments(line: &str, dialect: Dialect) -> Result<ParsedLine<'_>, DiagnosticError> {
    let fail = || DiagnosticError::parse_message(line);
    let cursor = Cursor::new(line);

    let (time, cursor) = timestamp(cursor).ok_or_else(fail)?;

    let (subsystem, level, cursor) = match subsystem_level(cursor) {
        Some(found) => found,
        None if dialect == Dialect::Viewer => {
            let (level, cursor) = unnamed_level(cursor).ok_or_else(fail)?;
            (UNNAMED_SUBSYSTEM, level, cursor)
        },
        None => return Err(fail()),
    };

    if let Some(location) = detailed_location(cursor) {
        return Ok(ParsedLine {
            time,
            subsystem,
            level,
            filename: location.filename,
            lineno: location.lineno,
            function: location.function,
            message: location.message,
        });
    }

    let message = only_message(cursor).ok_or_else(fail)?;
    Ok(ParsedLine {
        time,
        subsystem,
        level,
        filename: subsystem,
        lineno: 0,
        function: subsystem,
        message,
    })
}

struct Location<'a> {
    filename: &'a str,
    lineno: u64,
    function: &'a str,
    message: &'a str,
}

/// `** (<process>:<pid>) HH:MM:SS.ffffff `
fn timestamp(c: Cursor<'_>) -> Option<(TimeOfDay, Cursor<'_>)> {
    let c = c.literal("** (")?;
    let (_process, c) = c.word()?;
    let c = c.literal(":")?;
    let (_pid, c) = c.digits()?;
    let c = c.literal(") ")?;
    let (hour, c) = c.fixed_digits(2)?;
    let c = c.literal(":")?;
    let (minute, c) = c.fixed_digits(2)?;
    let c = c.literal(":")?;
    let (second, c) = c.fixed_digits(2)?;
    let c = c.literal(".")?;
    let (microsecond, c) = c.fixed_digits(6)?;
    let c = c.literal(" ")?;

    let time = TimeOfDay {
        hour,
        minute,
        second,
        microsecond,
    };
    Some((time, c))
}

/// `[<subsystem> <LEVEL>] `
fn subsystem_level(c: Cursor<'_>) -> Option<(&str, &str, Cursor<'_>)> {
    let c = c.literal("[")?;
    let (subsystem, c) = c.word()?;
    let c = c.literal(" ")?;
    let (level, c) = c.word()?;
    let c = c.literal("] ")?;
    Some((subsystem, level, c))
}

/// `[(none) <LEVEL>] `
fn unnamed_level(c: Cursor<'_>) -> Option<(&str, Cursor<'_>)> {
    let c = c.literal("[(none) ")?;
    let (level, c) = c.word()?;
    let c = c.literal("] ")?;
    Some((level, c))
}

/// `<filename>:<lineno> -- <function>(): <message>`
fn detailed_location(c: Cursor<'_>) -> Option<Location<'_>> {
    let (filename, c) = c.until(':')?;
    let c = c.literal(":")?;
    let (lineno, c) = c.digits()?;
    // Only overflow can fail here; saturate.
    let lineno = lineno.parse().unwrap_or(u64::MAX);
    let c = c.literal(" -- ")?;
    let (function, c) = c.word()?;
    let c = c.literal("(): ")?;
    let message = c.remainder()?;
    Some(Location {
        filename,
        lineno,
        function,
        message,
    })
}

/// `-- <message>`
fn only_message(c: Cursor<'_>) -> Option<&str> {
    c.literal("-- ")?.remainder()
}

/// Read position over the unconsumed suffix of a line.
///
/// Every combinator takes the cursor by value, so a failed segment never
/// moves the caller's position.
#[derive(Debug, Clone, Copy)]
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    const fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    fn literal(self, lit: &str) -> Option<Self> {
        self.rest.strip_prefix(lit).map(|rest| Self { rest })
    }

    fn take_while(self, pred: impl Fn(char) -> bool) -> Option<(&'a str, Self)> {
        let end = self
            .rest
            .char_indices()
            .find(|&(_, ch)| !pred(ch))
            .map_or(self.rest.len(), |(idx, _)| idx);
        if end == 0 {
            return None;
        }
        let (taken, rest) = self.rest.split_at(end);
        Some((taken, Self { rest }))
    }

    /// One or more word characters.
    fn word(self) -> Option<(&'a str, Self)> {
        self.take_while(|ch| ch.is_alphanumeric() || ch == '_')
    }

    /// One or more ASCII digits.
    fn digits(self) -> Option<(&'a str, Self)> {
        self.take_while(|ch| ch.is_ascii_digit())
    }

    /// Exactly `n` ASCII digits.
    fn fixed_digits(self, n: usize) -> Option<(u32, Self)> {
        let head = self.rest.get(..n)?;
        if !head.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value = head.parse().ok()?;
        Some((value, Self {
            rest: &self.rest[n..],
        }))
    }

    /// One or more characters up to, not including, `stop`.
    fn until(self, stop: char) -> Option<(&'a str, Self)> {
        self.take_while(|ch| ch != stop)
    }

    /// Everything left, which must not be empty.
    fn remainder(self) -> Option<&'a str> {
        (!self.rest.is_empty()).then_some(self.rest)
    }
}
