//! Process-wide fault notifications.
//!
//! Instead of overwriting a single global handler slot, interested parties
//! subscribe to an [`ErrorEventHub`] and receive a [`Subscription`] back.
//! Dropping the subscription (or calling [`Subscription::unsubscribe`])
//! removes the handler before the call returns.

use crate::log_error;
use crate::logger::Logger;
use futures::FutureExt;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// A synchronous failure nobody caught (a panic).
    UncaughtError,
    /// A detached async task that finished with an error.
    UnhandledRejection,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::UncaughtError => "uncaught-error",
            FaultKind::UnhandledRejection => "unhandled-rejection",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultEvent {
    pub kind: FaultKind,
    pub message: String,
    pub location: Option<String>,
}

impl FaultEvent {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl fmt::Display for FaultEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} (at {})", self.message, location),
            None => f.write_str(&self.message),
        }
    }
}

type Handler = Arc<dyn Fn(&FaultEvent) + Send + Sync>;

struct HubInner {
    next_id: AtomicU64,
    // BTreeMap keeps dispatch in registration order.
    handlers: RwLock<BTreeMap<u64, (FaultKind, Handler)>>,
}

impl HubInner {
    fn remove(&self, id: u64) -> bool {
        self.handlers.write().remove(&id).is_some()
    }
}

/// Registry of fault handlers. Cloning shares the same registry.
#[derive(Clone)]
pub struct ErrorEventHub {
    inner: Arc<HubInner>,
}

impl ErrorEventHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                next_id: AtomicU64::new(1),
                handlers: RwLock::new(BTreeMap::new()),
            }),
        }
    }

    pub fn subscribe<F>(&self, kind: FaultKind, handler: F) -> Subscription
    where
        F: Fn(&FaultEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .handlers
            .write()
            .insert(id, (kind, Arc::new(handler)));
        tracing::debug!(id, kind = kind.as_str(), "fault handler subscribed");

        Subscription {
            id,
            kind,
            hub: Arc::downgrade(&self.inner),
            active: true,
        }
    }

    /// Deliver `event` to every handler subscribed to its kind.
    ///
    /// Handlers run outside the registry lock, so a handler may subscribe or
    /// unsubscribe without deadlocking. Returns the number of handlers called.
    pub fn report(&self, event: FaultEvent) -> usize {
        let handlers: Vec<Handler> = self
            .inner
            .handlers
            .read()
            .values()
            .filter(|(kind, _)| *kind == event.kind)
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in &handlers {
            handler(&event);
        }
        handlers.len()
    }

    pub fn subscriber_count(&self, kind: FaultKind) -> usize {
        self.inner
            .handlers
            .read()
            .values()
            .filter(|(k, _)| *k == kind)
            .count()
    }
}

impl Default for ErrorEventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ErrorEventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorEventHub")
            .field(
                "uncaught_error",
                &self.subscriber_count(FaultKind::UncaughtError),
            )
            .field(
                "unhandled_rejection",
                &self.subscriber_count(FaultKind::UnhandledRejection),
            )
            .finish()
    }
}

/// Handle to a registered fault handler. The handler stays registered for
/// as long as this value is alive.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    kind: FaultKind,
    hub: Weak<HubInner>,
    active: bool,
}

impl Subscription {
    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.active && self.hub.strong_count() > 0
    }

    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(hub) = self.hub.upgrade()
            && hub.remove(self.id)
        {
            tracing::debug!(id = self.id, kind = self.kind.as_str(), "fault handler removed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Forward both fault kinds to `logger.error`.
pub fn subscribe_logger(hub: &ErrorEventHub, logger: Arc<Logger>) -> Vec<Subscription> {
    let uncaught = {
        let logger = logger.clone();
        hub.subscribe(FaultKind::UncaughtError, move |event| {
            log_error!(logger, "Global error:", event);
        })
    };
    let rejection = hub.subscribe(FaultKind::UnhandledRejection, move |event| {
        log_error!(logger, "Unhandled rejection:", event);
    });

    vec![uncaught, rejection]
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Spawn a detached task whose failure is reported to `hub` instead of being
/// silently dropped.
///
/// An `Err` result or a panic inside the task is reported as
/// [`FaultKind::UnhandledRejection`]; the join handle then yields `None`.
pub fn spawn_reported<F, T, E>(hub: &ErrorEventHub, future: F) -> JoinHandle<Option<T>>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let hub = hub.clone();
    tokio::spawn(async move {
        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(error)) => {
                hub.report(FaultEvent::new(
                    FaultKind::UnhandledRejection,
                    error.to_string(),
                ));
                None
            }
            Err(payload) => {
                hub.report(FaultEvent::new(
                    FaultKind::UnhandledRejection,
                    panic_message(payload.as_ref()),
                ));
                None
            }
        }
    })
}
