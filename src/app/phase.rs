//! Initialization phases.
//!
//! A phase is one awaited step of startup. [`BotInitializer`](super::BotInitializer)
//! runs its phases strictly in order and stops at the first failure.

use super::events::{ErrorEventHub, FaultKind, Subscription, subscribe_logger};
use super::initialization::PhaseError;
use super::panic_bridge::PanicBridge;
use crate::logger::Logger;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

pub const SYSTEMS: &str = "systems";
pub const ERROR_HANDLERS: &str = "error-handlers";
pub const MONITORING: &str = "monitoring";

/// Names of the default phases, in execution order.
pub const DEFAULT_PHASES: [&str; 3] = [SYSTEMS, ERROR_HANDLERS, MONITORING];

#[async_trait]
pub trait InitPhase: Send + Sync {
    /// Stable identifier, as accepted by `--fail-phase`.
    fn name(&self) -> &str;

    /// Human-facing name used in log lines.
    fn label(&self) -> &str {
        self.name()
    }

    async fn run(&self) -> Result<(), PhaseError>;
}

/// Registers the logger-backed fault subscriptions, unless the hub already
/// has handlers of its own.
///
/// The subscriptions are owned by the phase and released when it is dropped
/// or when [`SystemsPhase::release`] is called.
pub struct SystemsPhase {
    logger: Arc<Logger>,
    hub: ErrorEventHub,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl SystemsPhase {
    pub fn new(logger: Arc<Logger>, hub: ErrorEventHub) -> Self {
        Self {
            logger,
            hub,
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    pub fn installed(&self) -> usize {
        self.subscriptions.lock().len()
    }

    pub fn release(&self) {
        self.subscriptions.lock().clear();
    }
}

#[async_trait]
impl InitPhase for SystemsPhase {
    fn name(&self) -> &str {
        SYSTEMS
    }

    fn label(&self) -> &str {
        "System"
    }

    async fn run(&self) -> Result<(), PhaseError> {
        self.logger.info("Initializing core systems...");

        let unwatched = self.hub.subscriber_count(FaultKind::UncaughtError) == 0
            && self.hub.subscriber_count(FaultKind::UnhandledRejection) == 0;
        if unwatched {
            self.subscriptions
                .lock()
                .extend(subscribe_logger(&self.hub, self.logger.clone()));
        } else {
            self.logger.debug("Fault handlers already registered");
        }
        Ok(())
    }
}

/// Installs the panic bridge so panics reach the hub.
pub struct ErrorHandlersPhase {
    logger: Arc<Logger>,
    hub: ErrorEventHub,
    install_panic_hook: bool,
    bridge: Mutex<Option<PanicBridge>>,
}

impl ErrorHandlersPhase {
    pub fn new(logger: Arc<Logger>, hub: ErrorEventHub) -> Self {
        Self {
            logger,
            hub,
            install_panic_hook: true,
            bridge: Mutex::new(None),
        }
    }

    /// Skip the process-wide panic hook. Useful when the host owns it.
    pub fn without_panic_hook(mut self) -> Self {
        self.install_panic_hook = false;
        self
    }

    pub fn bridge_installed(&self) -> bool {
        self.bridge.lock().is_some()
    }
}

#[async_trait]
impl InitPhase for ErrorHandlersPhase {
    fn name(&self) -> &str {
        ERROR_HANDLERS
    }

    fn label(&self) -> &str {
        "Error handler"
    }

    async fn run(&self) -> Result<(), PhaseError> {
        self.logger.info("Setting up error handlers...");

        if !self.install_panic_hook {
            self.logger.debug("Panic hook installation disabled");
            return Ok(());
        }

        let mut bridge = self.bridge.lock();
        if bridge.is_some() {
            return Err(PhaseError::AlreadyInstalled {
                handler: "panic".to_string(),
            });
        }
        *bridge = Some(PanicBridge::install(self.hub.clone()));
        Ok(())
    }
}

/// Records when monitoring started and reports what is being watched.
pub struct MonitoringPhase {
    logger: Arc<Logger>,
    hub: ErrorEventHub,
    started_at: OnceLock<Instant>,
}

impl MonitoringPhase {
    pub fn new(logger: Arc<Logger>, hub: ErrorEventHub) -> Self {
        Self {
            logger,
            hub,
            started_at: OnceLock::new(),
        }
    }

    /// Time since the phase ran, or `None` if it has not run yet.
    pub fn uptime(&self) -> Option<Duration> {
        self.started_at.get().map(Instant::elapsed)
    }
}

#[async_trait]
impl InitPhase for MonitoringPhase {
    fn name(&self) -> &str {
        MONITORING
    }

    fn label(&self) -> &str {
        "Monitoring"
    }

    async fn run(&self) -> Result<(), PhaseError> {
        self.logger.info("Starting monitoring systems...");
        self.started_at.get_or_init(Instant::now);
        self.logger.debug(format!(
            "Watching {} uncaught-error and {} unhandled-rejection subscribers",
            self.hub.subscriber_count(FaultKind::UncaughtError),
            self.hub.subscriber_count(FaultKind::UnhandledRejection),
        ));
        Ok(())
    }
}

/// Wraps a phase and fails in its place without running it.
///
/// Used to exercise the startup failure path from the command line.
pub struct ForcedFailure {
    inner: Box<dyn InitPhase>,
}

impl ForcedFailure {
    pub fn new(inner: Box<dyn InitPhase>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl InitPhase for ForcedFailure {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn label(&self) -> &str {
        self.inner.label()
    }

    async fn run(&self) -> Result<(), PhaseError> {
        Err(anyhow::anyhow!("forced failure requested for phase '{}'", self.inner.name()).into())
    }
}
