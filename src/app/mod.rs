pub mod config;
pub mod events;
pub mod initialization;
pub mod initializer;
pub mod logging_system;
pub mod panic_bridge;
pub mod phase;

pub use config::{Config, ConfigError, SinkKind};
pub use events::{ErrorEventHub, FaultEvent, FaultKind, Subscription, spawn_reported, subscribe_logger};
pub use initialization::{InitializationError, PhaseError};
pub use initializer::{BotInitializer, InitializationReport, LogRecovery, RecoveryHook};
pub use logging_system::{LoggingSystem, TracingFormat, setup_tracing};
pub use panic_bridge::PanicBridge;
pub use phase::{DEFAULT_PHASES, ErrorHandlersPhase, InitPhase, MonitoringPhase, SystemsPhase};

use crate::domain::FallbackStrategy;
use crate::logger::{ConsoleSink, Logger, StdioSink, TracingSink};
use clap::error::ErrorKind;
use std::process;
use std::sync::Arc;

pub struct App {
    config: Config,
    logger: Arc<Logger>,
    hub: ErrorEventHub,
    initializer: BotInitializer,
    _subscriptions: Vec<Subscription>,
}

impl App {
    pub fn from_args<I, T>(args: I) -> Result<Self, Box<dyn std::error::Error + Send + Sync>>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::from_args_and_file(args)?;
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        config
            .validate()
            .map_err(|e| InitializationError::ConfigValidationFailed {
                reason: e.to_string(),
            })?;

        let sink = Self::build_sink(&config)?;

        let logger = Arc::new(Logger::with_sink("main", sink.clone()));
        logger.set_level(config.log_level.as_str());

        let core_logger = Arc::new(Logger::with_sink("core:initialize", sink));
        core_logger.set_level(config.log_level.as_str());

        // Handlers go in before anything else can fail.
        let hub = ErrorEventHub::new();
        let subscriptions = subscribe_logger(&hub, logger.clone());

        let mut initializer =
            BotInitializer::with_default_phases(core_logger, hub.clone(), config.install_panic_hook);
        if let Some(phase) = &config.fail_phase {
            initializer = initializer.fail_phase(phase);
        }

        Ok(Self {
            config,
            logger,
            hub,
            initializer,
            _subscriptions: subscriptions,
        })
    }

    fn build_sink(config: &Config) -> Result<Arc<dyn ConsoleSink>, InitializationError> {
        match config.sink {
            SinkKind::Stdio => Ok(Arc::new(StdioSink)),
            SinkKind::Tracing => match setup_tracing(config.log_level, config.tracing_format) {
                Ok(()) => Ok(Arc::new(TracingSink)),
                Err(e) if e.fallback_strategy() == Some(FallbackStrategy::UseStdioSink) => {
                    eprintln!("Warning: {e}, falling back to stdio output");
                    Ok(Arc::new(StdioSink))
                }
                Err(e) => Err(e),
            },
        }
    }

    /// Start the bot. Returns whether initialization succeeded.
    pub async fn run(&self) -> bool {
        self.logger.info("Starting AI Trading Bot...");
        self.initializer.initialize().await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    pub fn hub(&self) -> &ErrorEventHub {
        &self.hub
    }

    pub fn initializer(&self) -> &BotInitializer {
        &self.initializer
    }
}

/// The clap error, if `error` is clap asking to print help or version text.
fn is_informational<'a>(error: &'a (dyn std::error::Error + 'static)) -> Option<&'a clap::Error> {
    match error.downcast_ref::<ConfigError>() {
        Some(ConfigError::Cli(e))
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) =>
        {
            Some(e)
        }
        _ => None,
    }
}

// Main entry point for the application
pub async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = match App::from_args(std::env::args()) {
        Ok(app) => app,
        Err(e) => {
            if let Some(display) = is_informational(&*e) {
                display.exit();
            }
            eprintln!("Configuration error: {e}");
            process::exit(2);
        }
    };

    if !app.run().await {
        process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_error(args: &[&str]) -> Box<dyn std::error::Error + Send + Sync> {
        match App::from_args(args.iter().copied()) {
            Ok(_) => panic!("expected {args:?} to stop before building the app"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_help_anywhere_is_informational() {
        for args in [
            &["ai-trading-bot", "--help"][..],
            &["ai-trading-bot", "--sink", "stdio", "--help"][..],
            &["ai-trading-bot", "--log-level", "warn", "-V"][..],
        ] {
            let error = app_error(args);
            assert!(is_informational(&*error).is_some(), "{args:?}");
        }
    }

    #[test]
    fn test_bad_arguments_are_not_informational() {
        let error = app_error(&["ai-trading-bot", "--sink", "syslog"]);
        assert!(is_informational(&*error).is_none());

        let error = app_error(&["ai-trading-bot", "--fail-phase", "trading"]);
        assert!(is_informational(&*error).is_none());
    }
}
