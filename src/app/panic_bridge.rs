//! Bridge from Rust panics to [`FaultKind::UncaughtError`] reports.
//!
//! The bridge chains onto whatever panic hook is installed, so the default
//! panic message still reaches stderr after subscribers have been notified.
//! Dropping the bridge puts the previous hook back. Bridges must be dropped
//! in reverse order of installation for the restore to be exact.

use super::events::{ErrorEventHub, FaultEvent, FaultKind, panic_message};
use std::panic::{self, PanicHookInfo};
use std::sync::Arc;

type PanicHook = dyn Fn(&PanicHookInfo<'_>) + Send + Sync + 'static;

pub struct PanicBridge {
    previous: Option<Arc<PanicHook>>,
}

impl PanicBridge {
    pub fn install(hub: ErrorEventHub) -> Self {
        let previous: Arc<PanicHook> = Arc::from(panic::take_hook());
        let chained = previous.clone();

        panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
            hub.report(fault_from_panic(info));
            chained(info);
        }));
        tracing::debug!("panic bridge installed");

        Self {
            previous: Some(previous),
        }
    }

    pub fn is_installed(&self) -> bool {
        self.previous.is_some()
    }
}

impl Drop for PanicBridge {
    fn drop(&mut self) {
        // take_hook/set_hook panic when called from a panicking thread.
        if std::thread::panicking() {
            return;
        }
        if let Some(previous) = self.previous.take() {
            drop(panic::take_hook());
            panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| previous(info)));
            tracing::debug!("panic bridge removed");
        }
    }
}

impl std::fmt::Debug for PanicBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanicBridge")
            .field("installed", &self.is_installed())
            .finish()
    }
}

fn fault_from_panic(info: &PanicHookInfo<'_>) -> FaultEvent {
    let event = FaultEvent::new(FaultKind::UncaughtError, panic_message(info.payload()));
    match info.location() {
        Some(location) => event.with_location(format!(
            "{}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        )),
        None => event,
    }
}
