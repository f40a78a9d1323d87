//! Lifecycle events for classkv
//!
//! Per-call RPC events and store failures are logged by name from their
//! own modules; this enum covers process lifecycle only.

use std::fmt;

/// Observable lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Boot & Lifecycle
    /// Startup begins
    BootStart,
    /// Configuration loaded and validated
    ConfigLoaded,
    /// Temporary data directory created because none was configured
    TempDataDirCreated,
    /// Engine opened and commit log replayed
    EngineOpened,
    /// Engine failed to open (FATAL)
    EngineOpenFailed,
    /// Listener bound, serving requests
    Serving,

    // Shutdown
    /// Shutdown initiated
    ShutdownStart,
    /// Engine closed
    EngineClosed,
    /// Engine close failed
    EngineCloseFailed,
    /// Temporary data directory removed
    TempDataDirRemoved,
    /// Temporary data directory could not be removed
    TempDataDirRemoveFailed,
    /// Shutdown complete
    ShutdownComplete,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "CLASSKV_STARTUP_BEGIN",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::TempDataDirCreated => "TEMP_DATA_DIR_CREATED",
            Event::EngineOpened => "ENGINE_OPENED",
            Event::EngineOpenFailed => "ENGINE_OPEN_FAILED",
            Event::Serving => "CLASSKV_SERVING",

            Event::ShutdownStart => "SHUTDOWN_START",
            Event::EngineClosed => "ENGINE_CLOSED",
            Event::EngineCloseFailed => "ENGINE_CLOSE_FAILED",
            Event::TempDataDirRemoved => "TEMP_DATA_DIR_REMOVED",
            Event::TempDataDirRemoveFailed => "TEMP_DATA_DIR_REMOVE_FAILED",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::EngineOpenFailed)
    }

    /// Returns true if this event reports a non-fatal failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::EngineCloseFailed | Event::TempDataDirRemoveFailed
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_screaming_snake_case() {
        let events = [
            Event::BootStart,
            Event::ConfigLoaded,
            Event::TempDataDirCreated,
            Event::EngineOpened,
            Event::EngineOpenFailed,
            Event::Serving,
            Event::ShutdownStart,
            Event::EngineClosed,
            Event::EngineCloseFailed,
            Event::TempDataDirRemoved,
            Event::TempDataDirRemoveFailed,
            Event::ShutdownComplete,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_fatal_events() {
        assert!(Event::EngineOpenFailed.is_fatal());
        assert!(!Event::EngineCloseFailed.is_fatal());
        assert!(Event::EngineCloseFailed.is_failure());
    }
}
