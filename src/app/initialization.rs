use crate::domain::FallbackStrategy;
use thiserror::Error;

/// Failure raised by a single initialization phase.
#[derive(Error, Debug)]
pub enum PhaseError {
    #[error("{reason}")]
    Failed { reason: String },

    #[error("{handler} handler is already installed")]
    AlreadyInstalled { handler: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PhaseError {
    pub fn failed(reason: impl Into<String>) -> Self {
        PhaseError::Failed {
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum InitializationError {
    #[error("Phase '{phase}' failed: {source}")]
    PhaseFailed {
        phase: String,
        #[source]
        source: PhaseError,
    },

    #[error("Logging system initialization failed: {details}")]
    LoggingInitFailed {
        details: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Configuration validation failed: {reason}")]
    ConfigValidationFailed { reason: String },
}

impl InitializationError {
    /// How startup can carry on past this error. `None` means it cannot.
    pub fn fallback_strategy(&self) -> Option<FallbackStrategy> {
        match self {
            InitializationError::LoggingInitFailed { .. } => Some(FallbackStrategy::UseStdioSink),
            InitializationError::PhaseFailed { .. }
            | InitializationError::ConfigValidationFailed { .. } => None,
        }
    }

    /// Name of the failing phase, if this error came from one.
    pub fn phase(&self) -> Option<&str> {
        match self {
            InitializationError::PhaseFailed { phase, .. } => Some(phase),
            _ => None,
        }
    }
}
