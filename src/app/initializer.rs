use super::events::ErrorEventHub;
use super::initialization::InitializationError;
use super::phase::{ErrorHandlersPhase, ForcedFailure, InitPhase, MonitoringPhase, SystemsPhase};
use crate::log_error;
use crate::logger::Logger;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializationReport {
    pub phases_completed: Vec<String>,
    pub initialization_time_ms: u64,
}

/// Called once when startup fails, after the failure has been logged.
pub trait RecoveryHook: Send + Sync {
    fn recover(&self, error: &InitializationError);
}

/// Default recovery: log the error and leave the process running.
pub struct LogRecovery {
    logger: Arc<Logger>,
}

impl LogRecovery {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }
}

impl RecoveryHook for LogRecovery {
    fn recover(&self, error: &InitializationError) {
        log_error!(self.logger, "Initialization error:", error);
    }
}

/// Runs the startup phases in order.
pub struct BotInitializer {
    logger: Arc<Logger>,
    phases: Vec<Box<dyn InitPhase>>,
    recovery: Box<dyn RecoveryHook>,
}

impl BotInitializer {
    /// An initializer with no phases and the logging recovery hook.
    pub fn new(logger: Arc<Logger>) -> Self {
        Self {
            recovery: Box::new(LogRecovery::new(logger.clone())),
            logger,
            phases: Vec::new(),
        }
    }

    /// systems → error-handlers → monitoring.
    pub fn with_default_phases(logger: Arc<Logger>, hub: ErrorEventHub, install_panic_hook: bool) -> Self {
        let mut error_handlers = ErrorHandlersPhase::new(logger.clone(), hub.clone());
        if !install_panic_hook {
            error_handlers = error_handlers.without_panic_hook();
        }

        Self::new(logger.clone())
            .with_phase(SystemsPhase::new(logger.clone(), hub.clone()))
            .with_phase(error_handlers)
            .with_phase(MonitoringPhase::new(logger, hub))
    }

    pub fn with_phase(mut self, phase: impl InitPhase + 'static) -> Self {
        self.phases.push(Box::new(phase));
        self
    }

    pub fn with_recovery(mut self, recovery: impl RecoveryHook + 'static) -> Self {
        self.recovery = Box::new(recovery);
        self
    }

    /// Replace the phase named `name` with one that fails without running.
    /// Unknown names leave the sequence unchanged.
    pub fn fail_phase(mut self, name: &str) -> Self {
        self.phases = self
            .phases
            .into_iter()
            .map(|phase| -> Box<dyn InitPhase> {
                if phase.name() == name {
                    Box::new(ForcedFailure::new(phase))
                } else {
                    phase
                }
            })
            .collect();
        self
    }

    pub fn phase_names(&self) -> Vec<&str> {
        self.phases.iter().map(|phase| phase.name()).collect()
    }

    /// Run every phase, stopping at the first failure.
    ///
    /// The failing phase is logged here; the caller decides what to do with
    /// the returned error.
    pub async fn initialize_detailed(&self) -> Result<InitializationReport, InitializationError> {
        let start_time = Instant::now();
        self.logger.info("Initializing AI Trading Bot...");

        let mut phases_completed = Vec::with_capacity(self.phases.len());
        for phase in &self.phases {
            let name = phase.name().to_string();
            if let Err(source) = phase.run().await {
                log_error!(self.logger, format!("{} initialization failed:", phase.label()), source);
                return Err(InitializationError::PhaseFailed {
                    phase: name,
                    source,
                });
            }
            tracing::debug!(phase = %name, "initialization phase completed");
            phases_completed.push(name);
        }

        self.logger.info("AI Trading Bot initialized successfully");
        Ok(InitializationReport {
            phases_completed,
            initialization_time_ms: start_time.elapsed().as_millis() as u64,
        })
    }

    /// Run the startup sequence and report the outcome as a boolean.
    ///
    /// Failures are logged and handed to the recovery hook; they never
    /// propagate out of this call.
    pub async fn initialize(&self) -> bool {
        match self.initialize_detailed().await {
            Ok(_) => true,
            Err(error) => {
                log_error!(self.logger, "Failed to initialize bot:", error);
                self.recovery.recover(&error);
                false
            }
        }
    }
}

impl std::fmt::Debug for BotInitializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotInitializer")
            .field("logger", &self.logger)
            .field("phases", &self.phase_names())
            .finish_non_exhaustive()
    }
}
