//! Domain layer for ai-trading-bot.
//!
//! Contains the types shared across the logger and the startup sequence:
//! - `Severity`: ordered log severity (Debug/Info/Warn/Error)
//! - `SeverityError`: rejected severity names
//! - `FallbackStrategy`: how startup code recovers from rejected values

pub mod error;
pub mod severity;

pub use error::{FallbackStrategy, SeverityError};
pub use severity::Severity;
