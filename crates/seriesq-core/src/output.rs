//! Line-oriented report output.
//!
//! A report line may be assembled from several events, so the writer tracks
//! two bits across calls: whether a line is open (needs a newline) and whether
//! the next list item continues the current line with a comma.

use std::fmt;
use std::io::{self, Write};

use crossterm::style::Stylize;

/// Severity of a diagnostic forwarded from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "Debug"),
            Self::Info => write!(f, "Info"),
            Self::Warning => write!(f, "Warning"),
            Self::Error => write!(f, "Error"),
        }
    }
}

/// Write `Level: message` with an optionally coloured level tag.
pub fn write_log<W: Write>(w: &mut W, level: LogLevel, message: &str, colour: bool) -> io::Result<()> {
    let tag = level.to_string();
    if colour {
        let styled = match level {
            LogLevel::Debug => tag.dark_grey(),
            LogLevel::Info => tag.green(),
            LogLevel::Warning => tag.yellow(),
            LogLevel::Error => tag.red().bold(),
        };
        writeln!(w, "{styled}: {message}")
    } else {
        writeln!(w, "{tag}: {message}")
    }
}

/// Report writer with punctuation state.
///
/// Write failures are remembered rather than returned so that handler methods
/// stay infallible; the first failure is surfaced by [`take_error`].
///
/// [`take_error`]: ReportWriter::take_error
pub struct ReportWriter<W: Write> {
    out: W,
    line_open: bool,
    continuation: bool,
    error: Option<io::Error>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            line_open: false,
            continuation: false,
            error: None,
        }
    }

    pub fn emit(&mut self, args: fmt::Arguments<'_>) {
        if let Err(e) = self.out.write_fmt(args) {
            self.error.get_or_insert(e);
        }
    }

    /// Emit a complete line, terminating any open one first.
    pub fn line(&mut self, args: fmt::Arguments<'_>) {
        self.end_topic();
        self.emit(args);
        self.emit(format_args!("\n"));
    }

    /// Emit a diagnostic line on its own line.
    pub fn log(&mut self, level: LogLevel, message: &str, colour: bool) {
        self.end_topic();
        if let Err(e) = write_log(&mut self.out, level, message, colour) {
            self.error.get_or_insert(e);
        }
    }

    /// Append an item to a comma-joined `    Prefix: a, b` line. Once the
    /// line has been terminated the next item starts a labelled line again.
    pub fn list_item(&mut self, prefix: &str, item: &str) {
        if self.continuation && self.line_open {
            self.emit(format_args!(", {item}"));
        } else {
            self.emit(format_args!("    {prefix}: {item}"));
        }
        self.line_open = true;
        self.continuation = true;
    }

    /// Terminate the open line, if any.
    pub fn end_line(&mut self) {
        if self.line_open {
            self.line_open = false;
            self.emit(format_args!("\n"));
        }
    }

    /// Finish a topic: the next list item starts a fresh labelled line.
    pub fn end_topic(&mut self) {
        self.end_line();
        self.continuation = false;
    }

    pub fn clear_continuation(&mut self) {
        self.continuation = false;
    }

    pub fn flush(&mut self) {
        if let Err(e) = self.out.flush() {
            self.error.get_or_insert(e);
        }
    }

    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }
}
