//! Observability for the execution engine
//!
//! - Structured JSON logging with a process-wide minimum severity
//! - Typed lifecycle events
//! - Relaxed atomic counters
//!
//! Observability never alters execution: logging failures are swallowed and
//! counters are write-only from the engine's point of view.

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;

/// Log a lifecycle event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
