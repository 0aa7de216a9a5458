//! Leveled, context-tagged console logger.
//!
//! Every emitted line has the shape
//!
//! ```text
//! [<ISO-8601 UTC timestamp>] [<SEVERITY>] [<context>] <message>
//! ```
//!
//! followed by any trailing arguments, which are handed to the sink
//! unformatted. Lines below the logger's threshold are dropped before any
//! formatting happens.
//!
//! # Usage
//!
//! ```
//! use ai_trading_bot::logger::{create_logger, Logger, MemorySink};
//! use ai_trading_bot::log_error;
//! use std::sync::Arc;
//!
//! let sink = Arc::new(MemorySink::new());
//! let log = Logger::with_sink("x", sink.clone());
//! log.set_level("WARN");
//! log.info("hello");
//! log.warn("bye");
//! log_error!(log, "Failed to start:", "timeout");
//!
//! assert_eq!(sink.len(), 2);
//! assert!(sink.contains("[WARN] [x] bye"));
//!
//! // Default logger writes to stdout/stderr
//! let _main = create_logger("main");
//! ```

mod memory;
mod sink;

pub use memory::{CapturedLine, MemorySink, DEFAULT_CAPACITY};
pub use sink::{ConsoleSink, NoOpSink, StdioSink, TracingSink, render};

use crate::domain::{FallbackStrategy, Severity, SeverityError};
use chrono::{SecondsFormat, Utc};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Create a logger for `context` writing to [`StdioSink`] at `INFO`.
pub fn create_logger(context: impl Into<String>) -> Logger {
    Logger::new(context)
}

/// Named, leveled logger.
///
/// The context is fixed at construction. The threshold lives in an atomic,
/// so a logger shared behind an `Arc` can still have its level changed
/// without locking the emission path.
pub struct Logger {
    context: String,
    level: AtomicU8,
    sink: Arc<dyn ConsoleSink>,
}

impl Logger {
    pub fn new(context: impl Into<String>) -> Self {
        Self::with_sink(context, Arc::new(StdioSink))
    }

    pub fn with_sink(context: impl Into<String>, sink: Arc<dyn ConsoleSink>) -> Self {
        Self {
            context: context.into(),
            level: AtomicU8::new(Severity::default().rank()),
            sink,
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn level(&self) -> Severity {
        Severity::from_rank(self.level.load(Ordering::Relaxed))
    }

    /// Set the threshold by name. Anything other than exactly `DEBUG`,
    /// `INFO`, `WARN` or `ERROR` resets it to `INFO`.
    pub fn set_level(&self, level_name: &str) {
        if let Err(e) = self.try_set_level(level_name)
            && e.fallback_strategy() == FallbackStrategy::UseDefaultLevel
        {
            self.store_level(Severity::default());
        }
    }

    /// Set the threshold by name, rejecting unknown names.
    ///
    /// On error the current threshold is left as it was.
    pub fn try_set_level(&self, level_name: &str) -> Result<(), SeverityError> {
        let severity = level_name.parse::<Severity>()?;
        self.store_level(severity);
        Ok(())
    }

    fn store_level(&self, severity: Severity) {
        self.level.store(severity.rank(), Ordering::Relaxed);
    }

    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.level()
    }

    /// Format a line for `severity` with the current wall-clock time.
    pub fn format(&self, severity: Severity, message: &dyn fmt::Display) -> String {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        format!("[{timestamp}] [{severity}] [{}] {message}", self.context)
    }

    /// Core emission path used by the severity methods and the `log_*!` macros.
    pub fn log(&self, severity: Severity, message: &dyn fmt::Display, args: &[&dyn fmt::Display]) {
        if !self.enabled(severity) {
            return;
        }

        let line = self.format(severity, message);
        match severity {
            Severity::Debug => self.sink.debug(&line, args),
            Severity::Info => self.sink.info(&line, args),
            Severity::Warn => self.sink.warn(&line, args),
            Severity::Error => self.sink.error(&line, args),
        }
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Severity::Debug, &message, &[]);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(Severity::Info, &message, &[]);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log(Severity::Warn, &message, &[]);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(Severity::Error, &message, &[]);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("context", &self.context)
            .field("level", &self.level())
            .finish_non_exhaustive()
    }
}

/// Log a message followed by trailing arguments.
///
/// `log_error!(logger, "Global error:", err)` writes the formatted
/// `"Global error:"` line and hands `err` to the sink unformatted.
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $message:expr $(, $arg:expr)* $(,)?) => {
        $logger.log(
            $crate::domain::Severity::Debug,
            &$message,
            &[$(&$arg as &dyn ::std::fmt::Display),*],
        )
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $message:expr $(, $arg:expr)* $(,)?) => {
        $logger.log(
            $crate::domain::Severity::Info,
            &$message,
            &[$(&$arg as &dyn ::std::fmt::Display),*],
        )
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $message:expr $(, $arg:expr)* $(,)?) => {
        $logger.log(
            $crate::domain::Severity::Warn,
            &$message,
            &[$(&$arg as &dyn ::std::fmt::Display),*],
        )
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $message:expr $(, $arg:expr)* $(,)?) => {
        $logger.log(
            $crate::domain::Severity::Error,
            &$message,
            &[$(&$arg as &dyn ::std::fmt::Display),*],
        )
    };
}
