//! Per-call observation scope
//!
//! - Logs `{name}_BEGIN` with a fresh request id on creation
//! - Logs `{name}_COMPLETE` (with elapsed time) when `complete()` is called
//! - Logs `{name}_FAILED` at ERROR level when `fail()` is called
//! - Logs `{name}_INCOMPLETE` at WARN level if dropped without either,
//!   e.g. when the client disconnects and the handler future is dropped

use std::time::Instant;

use uuid::Uuid;

use super::logger::Logger;

/// Observation scope for one RPC call.
pub struct CallScope {
    name: &'static str,
    request_id: String,
    fields: Vec<(&'static str, String)>,
    timer: Timer,
    completed: bool,
}

impl CallScope {
    /// Opens a scope and logs `{name}_BEGIN`.
    pub fn begin(name: &'static str, fields: &[(&'static str, &str)]) -> Self {
        let scope = Self {
            name,
            request_id: Uuid::new_v4().to_string(),
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            timer: Timer::new(),
            completed: false,
        };
        scope.log_info("BEGIN", &[]);
        scope
    }

    /// Request id attached to every line of this scope.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Logs `{name}_COMPLETE` with `elapsed_ms` and any extra fields.
    pub fn complete(mut self, extra_fields: &[(&str, &str)]) {
        self.completed = true;
        let elapsed = self.timer.elapsed_ms();
        let mut fields = extra_fields.to_vec();
        fields.push(("elapsed_ms", elapsed.as_str()));
        self.log_info("COMPLETE", &fields);
    }

    /// Logs `{name}_FAILED` at ERROR level.
    pub fn fail(mut self, reason: &str) {
        self.completed = true;
        let event = format!("{}_FAILED", self.name);
        let mut fields = self.base_fields();
        fields.push(("reason", reason));
        Logger::error(&event, &fields);
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    fn base_fields(&self) -> Vec<(&str, &str)> {
        let mut fields: Vec<(&str, &str)> = self
            .fields
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .collect();
        fields.push(("request_id", self.request_id.as_str()));
        fields
    }

    fn log_info(&self, suffix: &str, extra_fields: &[(&str, &str)]) {
        let event = format!("{}_{}", self.name, suffix);
        let mut fields = self.base_fields();
        fields.extend(extra_fields.iter().copied());
        Logger::info(&event, &fields);
    }
}

impl Drop for CallScope {
    fn drop(&mut self) {
        if !self.completed {
            let event = format!("{}_INCOMPLETE", self.name);
            let mut fields = self.base_fields();
            fields.push(("reason", "scope dropped without completion"));
            Logger::warn(&event, &fields);
        }
    }
}

/// A simple duration timer for logging elapsed time
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed milliseconds as a string
    pub fn elapsed_ms(&self) -> String {
        self.start.elapsed().as_millis().to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_has_uuid_request_id() {
        let scope = CallScope::begin("RPC_TEST", &[("id", "cs101")]);
        assert!(Uuid::parse_str(scope.request_id()).is_ok());
        assert!(!scope.is_completed());
        scope.complete(&[]);
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = CallScope::begin("RPC_TEST", &[]);
        let b = CallScope::begin("RPC_TEST", &[]);
        assert_ne!(a.request_id(), b.request_id());
        a.complete(&[("count", "0")]);
        b.fail("forced");
    }

    #[test]
    fn test_scope_drop_without_complete() {
        let scope = CallScope::begin("RPC_TEST", &[]);
        drop(scope);
    }

    #[test]
    fn test_timer() {
        let timer = Timer::new();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let ms: u64 = timer.elapsed_ms().parse().unwrap();
        assert!(ms >= 10);
    }
}
