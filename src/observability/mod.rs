//! Observability for the conversion engine
//!
//! - Structured logging (JSON lines on stderr)
//! - Typed lifecycle events
//! - Atomic conversion counters
//! - The diagnostic hook fed by generated routines
//!
//! Observability is read-only: nothing here changes the outcome of a
//! conversion.
//!
//! # Usage
//!
//! ```ignore
//! use fieldgen::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::SchemaDefined, &[("struct", "User")]);
//! ```

mod diagnostics;
mod events;
mod logger;
mod metrics;

pub use diagnostics::{Diagnostic, DiagnosticSink, LogSink, MemorySink};
pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{ConversionMetrics, MetricsSnapshot};

/// Log a lifecycle event at its default severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
