use thiserror::Error;

/// What a caller does instead of failing when a startup-time value is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackStrategy {
    UseDefaultLevel,
    UseStdioSink,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeverityError {
    #[error("Invalid severity '{input}'. Valid severities: {valid:?}")]
    Unknown {
        input: String,
        valid: Vec<&'static str>,
    },
}

impl SeverityError {
    pub fn fallback_strategy(&self) -> FallbackStrategy {
        match self {
            SeverityError::Unknown { .. } => FallbackStrategy::UseDefaultLevel,
        }
    }
}
