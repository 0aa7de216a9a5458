// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Elapsed milliseconds fit in u64
    clippy::missing_errors_doc,       // Internal API
    clippy::missing_panics_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. PhaseError in phase module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod domain;
pub mod logger;

// Re-export main types for easy access
pub use app::{App, BotInitializer, Config, ErrorEventHub};
pub use domain::Severity;
pub use logger::{Logger, create_logger};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
