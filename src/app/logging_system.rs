use super::initialization::InitializationError;
use crate::domain::Severity;
use clap::ValueEnum;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Output shape of the `tracing` subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracingFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDirective {
    pub target: String,
    pub level: Severity,
}

impl LogDirective {
    pub fn new(target: impl Into<String>, level: Severity) -> Self {
        Self {
            target: target.into(),
            level,
        }
    }

    pub fn to_filter_string(&self) -> String {
        format!("{}={}", self.target, self.level.as_filter_str())
    }
}

/// Builds and installs the global `tracing` subscriber.
pub struct LoggingSystem {
    directives: RwLock<Vec<LogDirective>>,
}

impl LoggingSystem {
    pub fn new() -> Self {
        Self {
            directives: RwLock::new(Vec::new()),
        }
    }

    pub fn add_directive(&self, target: &str, level: Severity) {
        self.directives.write().push(LogDirective::new(target, level));
    }

    /// Quiet the runtime crates unless explicitly asked for.
    pub fn add_default_directives(&self) {
        for target in ["tokio", "runtime", "mio"] {
            self.add_directive(target, Severity::Warn);
        }
    }

    pub fn build_filter_string(&self, default_level: Severity) -> String {
        let directives = self.directives.read();

        let mut filter_parts = Vec::with_capacity(directives.len() + 1);
        filter_parts.push(default_level.as_filter_str().to_string());
        filter_parts.extend(directives.iter().map(LogDirective::to_filter_string));
        filter_parts.join(",")
    }

    pub fn directive_count(&self) -> usize {
        self.directives.read().len()
    }

    pub fn initialize_tracing(
        &self,
        default_level: Severity,
        format: TracingFormat,
    ) -> Result<(), InitializationError> {
        let filter_string = self.build_filter_string(default_level);
        let env_filter = EnvFilter::try_new(&filter_string).map_err(|e| {
            InitializationError::LoggingInitFailed {
                details: format!("Failed to create EnvFilter with '{filter_string}'"),
                source: Box::new(e),
            }
        })?;

        let result = match format {
            TracingFormat::Compact => tracing::subscriber::set_global_default(
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_target(true).with_ansi(true).compact()),
            ),
            TracingFormat::Json => tracing::subscriber::set_global_default(
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json().with_target(true)),
            ),
        };

        result.map_err(|e| InitializationError::LoggingInitFailed {
            details: "Failed to set global tracing subscriber".to_string(),
            source: Box::new(e),
        })
    }
}

impl Default for LoggingSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Install the global subscriber once per process.
///
/// Later calls return the outcome of the first one.
pub fn setup_tracing(level: Severity, format: TracingFormat) -> Result<(), InitializationError> {
    static OUTCOME: OnceLock<Option<String>> = OnceLock::new();

    let outcome = OUTCOME.get_or_init(|| {
        let logging_system = LoggingSystem::new();
        logging_system.add_default_directives();
        logging_system
            .initialize_tracing(level, format)
            .err()
            .map(|e| e.to_string())
    });

    match outcome {
        None => Ok(()),
        Some(details) => Err(InitializationError::LoggingInitFailed {
            details: details.clone(),
            source: Box::new(std::io::Error::other("tracing initialization error")),
        }),
    }
}
