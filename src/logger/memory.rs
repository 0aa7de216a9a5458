use super::sink::ConsoleSink;
use crate::domain::Severity;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;

pub const DEFAULT_CAPACITY: usize = 1000;

/// One line as received by a [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedLine {
    pub severity: Severity,
    pub line: String,
    pub args: Vec<String>,
    pub captured_at: DateTime<Utc>,
}

impl CapturedLine {
    /// The line as a console would have printed it.
    pub fn rendered(&self) -> String {
        if self.args.is_empty() {
            return self.line.clone();
        }
        format!("{} {}", self.line, self.args.join(" "))
    }
}

/// Bounded in-memory sink. Once `capacity` is reached the oldest lines are
/// dropped first.
#[derive(Debug)]
pub struct MemorySink {
    capacity: usize,
    lines: Mutex<VecDeque<CapturedLine>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            lines: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn push(&self, severity: Severity, line: &str, args: &[&dyn fmt::Display]) {
        let entry = CapturedLine {
            severity,
            line: line.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            captured_at: Utc::now(),
        };

        let mut lines = self.lines.lock();
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(entry);
    }

    /// Snapshot of every captured line, oldest first.
    pub fn lines(&self) -> Vec<CapturedLine> {
        self.lines.lock().iter().cloned().collect()
    }

    pub fn by_severity(&self, severity: Severity) -> Vec<CapturedLine> {
        self.lines
            .lock()
            .iter()
            .filter(|entry| entry.severity == severity)
            .cloned()
            .collect()
    }

    pub fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<CapturedLine> {
        self.lines
            .lock()
            .iter()
            .filter(|entry| entry.captured_at >= start && entry.captured_at <= end)
            .cloned()
            .collect()
    }

    /// True if any rendered line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines
            .lock()
            .iter()
            .any(|entry| entry.rendered().contains(needle))
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleSink for MemorySink {
    fn debug(&self, line: &str, args: &[&dyn fmt::Display]) {
        self.push(Severity::Debug, line, args);
    }

    fn info(&self, line: &str, args: &[&dyn fmt::Display]) {
        self.push(Severity::Info, line, args);
    }

    fn warn(&self, line: &str, args: &[&dyn fmt::Display]) {
        self.push(Severity::Warn, line, args);
    }

    fn error(&self, line: &str, args: &[&dyn fmt::Display]) {
        self.push(Severity::Error, line, args);
    }
}
