//! Observability subsystem for classkv
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//! - Per-call scopes with request ids
//!
//! # Usage
//!
//! ```ignore
//! use classkv::observability::{log_event_with_fields, CallScope, Event, Logger};
//!
//! log_event_with_fields(Event::EngineOpened, &[("keys", "42")]);
//!
//! let scope = CallScope::begin("RPC_GET", &[("id", "cs101")]);
//! // ... handle call ...
//! scope.complete(&[]);
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::{CallScope, Timer};

fn event_severity(event: Event) -> Severity {
    if event.is_fatal() {
        Severity::Fatal
    } else if event.is_failure() {
        Severity::Error
    } else {
        Severity::Info
    }
}

/// Log a lifecycle event
pub fn log_event(event: Event) {
    Logger::log(event_severity(event), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event_severity(event), event.as_str(), fields);
}
