//! Output sinks for [`Logger`](super::Logger).

use std::fmt::{self, Write as _};
use std::io::{self, Write};

/// Console-like output capability with one entry point per severity.
///
/// The logger hands each sink a fully formatted line plus the trailing
/// arguments of the call, unformatted. Entry points are kept separate so a
/// host can route them independently.
///
/// Implementations must be `Send + Sync` and must not panic.
pub trait ConsoleSink: Send + Sync {
    fn debug(&self, line: &str, args: &[&dyn fmt::Display]);
    fn info(&self, line: &str, args: &[&dyn fmt::Display]);
    fn warn(&self, line: &str, args: &[&dyn fmt::Display]);
    fn error(&self, line: &str, args: &[&dyn fmt::Display]);
}

/// Join a line and its trailing arguments with single spaces.
pub fn render(line: &str, args: &[&dyn fmt::Display]) -> String {
    let mut out = String::with_capacity(line.len() + args.len() * 16);
    out.push_str(line);
    for arg in args {
        let _ = write!(out, " {arg}");
    }
    out
}

/// Default sink: debug/info to stdout, warn/error to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioSink;

impl StdioSink {
    fn to_stdout(line: &str, args: &[&dyn fmt::Display]) {
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", render(line, args));
    }

    fn to_stderr(line: &str, args: &[&dyn fmt::Display]) {
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{}", render(line, args));
    }
}

impl ConsoleSink for StdioSink {
    fn debug(&self, line: &str, args: &[&dyn fmt::Display]) {
        Self::to_stdout(line, args);
    }

    fn info(&self, line: &str, args: &[&dyn fmt::Display]) {
        Self::to_stdout(line, args);
    }

    fn warn(&self, line: &str, args: &[&dyn fmt::Display]) {
        Self::to_stderr(line, args);
    }

    fn error(&self, line: &str, args: &[&dyn fmt::Display]) {
        Self::to_stderr(line, args);
    }
}

/// Sink that forwards every entry point to the matching `tracing` macro.
///
/// Lines are already timestamped and tagged by the logger, so the
/// subscriber only adds its own decoration on top.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ConsoleSink for TracingSink {
    fn debug(&self, line: &str, args: &[&dyn fmt::Display]) {
        tracing::debug!(target: "ai_trading_bot::console", "{}", render(line, args));
    }

    fn info(&self, line: &str, args: &[&dyn fmt::Display]) {
        tracing::info!(target: "ai_trading_bot::console", "{}", render(line, args));
    }

    fn warn(&self, line: &str, args: &[&dyn fmt::Display]) {
        tracing::warn!(target: "ai_trading_bot::console", "{}", render(line, args));
    }

    fn error(&self, line: &str, args: &[&dyn fmt::Display]) {
        tracing::error!(target: "ai_trading_bot::console", "{}", render(line, args));
    }
}

/// A sink that discards all lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSink;

impl ConsoleSink for NoOpSink {
    #[inline]
    fn debug(&self, _line: &str, _args: &[&dyn fmt::Display]) {}

    #[inline]
    fn info(&self, _line: &str, _args: &[&dyn fmt::Display]) {}

    #[inline]
    fn warn(&self, _line: &str, _args: &[&dyn fmt::Display]) {}

    #[inline]
    fn error(&self, _line: &str, _args: &[&dyn fmt::Display]) {}
}
