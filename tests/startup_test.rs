// End-to-end startup sequence tests
use ai_trading_bot::app::{
    App, BotInitializer, Config, ErrorEventHub, FaultKind, InitPhase, InitializationError,
    PhaseError, RecoveryHook, SinkKind, spawn_reported, subscribe_logger,
};
use ai_trading_bot::logger::{Logger, MemorySink};
use ai_trading_bot::Severity;
use async_trait::async_trait;
use parking_lot::Mutex;
use serial_test::serial;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::NamedTempFile;

fn core_logger() -> (Arc<Logger>, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let logger = Arc::new(Logger::with_sink("core:initialize", sink.clone()));
    (logger, sink)
}

struct CountingPhase {
    name: &'static str,
    runs: Arc<AtomicUsize>,
    fail: bool,
}

#[async_trait]
impl InitPhase for CountingPhase {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self) -> Result<(), PhaseError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PhaseError::failed("exchange unreachable"));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
struct RecordingRecovery {
    seen: Arc<Mutex<Vec<String>>>,
}

impl RecoveryHook for RecordingRecovery {
    fn recover(&self, error: &InitializationError) {
        self.seen.lock().push(error.to_string());
    }
}

#[tokio::test]
#[serial(panic_hook)]
async fn test_default_sequence_succeeds() {
    let (logger, sink) = core_logger();
    let hub = ErrorEventHub::new();
    let initializer = BotInitializer::with_default_phases(logger, hub.clone(), true);

    let report = initializer.initialize_detailed().await.unwrap();

    assert_eq!(
        report.phases_completed,
        vec!["systems", "error-handlers", "monitoring"]
    );
    assert!(sink.contains("Initializing AI Trading Bot..."));
    assert!(sink.contains("Initializing core systems..."));
    assert!(sink.contains("Setting up error handlers..."));
    assert!(sink.contains("Starting monitoring systems..."));
    assert!(sink.contains("AI Trading Bot initialized successfully"));
    assert!(sink.by_severity(Severity::Error).is_empty());
    assert!(hub.subscriber_count(FaultKind::UncaughtError) > 0);
}

#[tokio::test]
async fn test_failing_phase_stops_sequence_and_returns_false() {
    let (logger, sink) = core_logger();
    let before = Arc::new(AtomicUsize::new(0));
    let failing = Arc::new(AtomicUsize::new(0));
    let after = Arc::new(AtomicUsize::new(0));
    let recovery = RecordingRecovery::default();

    let initializer = BotInitializer::new(logger)
        .with_phase(CountingPhase {
            name: "systems",
            runs: before.clone(),
            fail: false,
        })
        .with_phase(CountingPhase {
            name: "error-handlers",
            runs: failing.clone(),
            fail: true,
        })
        .with_phase(CountingPhase {
            name: "monitoring",
            runs: after.clone(),
            fail: false,
        })
        .with_recovery(recovery.clone());

    assert!(!initializer.initialize().await);

    assert_eq!(before.load(Ordering::SeqCst), 1);
    assert_eq!(failing.load(Ordering::SeqCst), 1);
    assert_eq!(after.load(Ordering::SeqCst), 0, "later phases must not run");

    let errors = sink.by_severity(Severity::Error);
    assert!(!errors.is_empty());
    assert!(errors.iter().all(|e| e.line.contains("[ERROR] [core:initialize]")));
    assert!(sink.contains("error-handlers initialization failed: exchange unreachable"));
    assert!(sink.contains("Failed to initialize bot:"));
    assert!(!sink.contains("initialized successfully"));

    let seen = recovery.seen.lock();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].contains("error-handlers"));
}

#[tokio::test]
async fn test_default_recovery_logs_initialization_error() {
    let (logger, sink) = core_logger();
    let initializer =
        BotInitializer::with_default_phases(logger, ErrorEventHub::new(), false).fail_phase("systems");

    assert!(!initializer.initialize().await);
    assert!(sink.contains("Initialization error:"));
    assert!(!sink.contains("Setting up error handlers..."));
}

#[tokio::test]
async fn test_default_phases_log_readable_failure_lines() {
    for (phase, expected) in [
        ("systems", "System initialization failed:"),
        ("error-handlers", "Error handler initialization failed:"),
        ("monitoring", "Monitoring initialization failed:"),
    ] {
        let (logger, sink) = core_logger();
        let initializer = BotInitializer::with_default_phases(logger, ErrorEventHub::new(), false)
            .fail_phase(phase);

        assert!(!initializer.initialize().await);
        let errors = sink.by_severity(Severity::Error);
        assert!(
            errors[0].line.ends_with(expected),
            "{phase}: {}",
            errors[0].line
        );
    }
}

#[tokio::test]
async fn test_detailed_error_names_phase() {
    let (logger, _sink) = core_logger();
    let initializer =
        BotInitializer::with_default_phases(logger, ErrorEventHub::new(), false).fail_phase("monitoring");

    let err = initializer.initialize_detailed().await.unwrap_err();
    assert_eq!(err.phase(), Some("monitoring"));
    assert!(err.fallback_strategy().is_none());
}

#[tokio::test]
async fn test_task_failure_is_logged_as_unhandled_rejection() {
    let sink = Arc::new(MemorySink::new());
    let logger = Arc::new(Logger::with_sink("main", sink.clone()));
    let hub = ErrorEventHub::new();
    let _subscriptions = subscribe_logger(&hub, logger);

    let handle = spawn_reported(&hub, async { Err::<(), _>("order book stream closed") });
    assert_eq!(handle.await.unwrap(), None);

    let errors = sink.by_severity(Severity::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].line.contains("[ERROR] [main] Unhandled rejection:"));
    assert!(errors[0].rendered().contains("order book stream closed"));
}

async fn crashing_strategy() -> Result<(), String> {
    panic!("strategy worker crashed")
}

#[tokio::test]
#[serial(panic_hook)]
async fn test_task_panic_is_logged_as_unhandled_rejection() {
    let sink = Arc::new(MemorySink::new());
    let logger = Arc::new(Logger::with_sink("main", sink.clone()));
    let hub = ErrorEventHub::new();
    let _subscriptions = subscribe_logger(&hub, logger);

    let handle = spawn_reported(&hub, crashing_strategy());
    assert_eq!(handle.await.unwrap(), None);

    let errors = sink.by_severity(Severity::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].line.contains("Unhandled rejection:"));
    assert_eq!(errors[0].args, vec!["strategy worker crashed".to_string()]);
}

#[tokio::test]
async fn test_app_reports_forced_failure() {
    let app = App::from_args([
        "ai-trading-bot",
        "--sink",
        "stdio",
        "--install-panic-hook",
        "false",
        "--fail-phase",
        "error-handlers",
    ])
    .unwrap();

    assert_eq!(app.logger().context(), "main");
    assert_eq!(
        app.initializer().phase_names(),
        vec!["systems", "error-handlers", "monitoring"]
    );
    assert!(!app.run().await);
}

#[tokio::test]
async fn test_app_rejects_unknown_phase() {
    assert!(App::from_args(["ai-trading-bot", "--fail-phase", "trading"]).is_err());
}

#[tokio::test]
async fn test_app_from_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
log_level = "error"
sink = "stdio"
install_panic_hook = false
"#
    )
    .unwrap();

    let path = file.path().to_string_lossy().to_string();
    let app = App::from_args(["ai-trading-bot", "--config-file", path.as_str()]).unwrap();

    assert_eq!(app.config().log_level, Severity::Error);
    assert_eq!(app.config().sink, SinkKind::Stdio);
    assert!(!app.config().install_panic_hook);
    assert_eq!(app.logger().level(), Severity::Error);
    assert!(app.run().await);
    // Startup reuses the handlers App registered up front
    assert_eq!(app.hub().subscriber_count(FaultKind::UncaughtError), 1);
    assert_eq!(app.hub().subscriber_count(FaultKind::UnhandledRejection), 1);
}

#[test]
fn test_missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    let result = Config::from_args_and_file([
        "ai-trading-bot".to_string(),
        "--config-file".to_string(),
        missing.to_string_lossy().to_string(),
    ]);
    assert!(result.is_err());
}
