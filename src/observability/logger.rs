//! Structured JSON logger for classkv
//!
//! - One log line = one event
//! - `event`, `severity` and `ts` come first, remaining fields sorted by key
//! - Synchronous, one write per line
//! - INFO and WARN go to stdout, ERROR and FATAL to stderr

use std::fmt;
use std::io::{self, Write};

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    /// Caller-visible misses (not found) and recoverable issues
    Warn,
    /// Operation failures
    Error,
    /// The process cannot continue
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writes one JSON object per event
pub struct Logger;

impl Logger {
    /// Log an event with the given severity and fields
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let line = render(severity, event, &ts, fields);

        // Logging never fails the caller.
        let _ = if severity >= Severity::Error {
            io::stderr().lock().write_all(line.as_bytes())
        } else {
            io::stdout().lock().write_all(line.as_bytes())
        };
    }

    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }
}

/// Renders a complete line, newline included, so it is written with a
/// single `write_all`.
fn render(severity: Severity, event: &str, ts: &str, fields: &[(&str, &str)]) -> String {
    let mut sorted = fields.to_vec();
    sorted.sort_by_key(|(key, _)| *key);

    let mut line = String::with_capacity(128 + 32 * sorted.len());
    line.push('{');
    push_pair(&mut line, "event", event);
    line.push(',');
    push_pair(&mut line, "severity", severity.as_str());
    line.push(',');
    push_pair(&mut line, "ts", ts);
    for (key, value) in sorted {
        line.push(',');
        push_pair(&mut line, key, value);
    }
    line.push_str("}\n");
    line
}

fn push_pair(line: &mut String, key: &str, value: &str) {
    line.push_str(&Value::from(key).to_string());
    line.push(':');
    line.push_str(&Value::from(value).to_string());
}

#[cfg(test)]
fn capture_log(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    render(severity, event, "2023-09-01T00:00:00.000Z", fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn test_log_json_format() {
        let output = capture_log(Severity::Info, "RPC_GET_BEGIN", &[("id", "cs101")]);

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["event"], "RPC_GET_BEGIN");
        assert_eq!(parsed["severity"], "INFO");
        assert_eq!(parsed["ts"], "2023-09-01T00:00:00.000Z");
        assert_eq!(parsed["id"], "cs101");
    }

    #[test]
    fn test_log_deterministic_ordering() {
        let output1 = capture_log(
            Severity::Info,
            "TEST",
            &[("zebra", "1"), ("apple", "2"), ("mango", "3")],
        );
        let output2 = capture_log(
            Severity::Info,
            "TEST",
            &[("apple", "2"), ("mango", "3"), ("zebra", "1")],
        );
        assert_eq!(output1, output2);

        let apple_pos = output1.find("apple").unwrap();
        let zebra_pos = output1.find("zebra").unwrap();
        assert!(apple_pos < zebra_pos);
    }

    #[test]
    fn test_log_escapes_special_chars() {
        let output = capture_log(
            Severity::Error,
            "STORE_CREATE_FAILED",
            &[("name", "Intro \"CS\"\n\tpart 2")],
        );

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["name"], "Intro \"CS\"\n\tpart 2");
    }

    #[test]
    fn test_log_one_line_event_first() {
        let output = capture_log(Severity::Info, "MY_EVENT", &[("a", "1"), ("b", "2")]);

        assert_eq!(output.chars().filter(|c| *c == '\n').count(), 1);
        assert!(output.starts_with("{\"event\":\"MY_EVENT\""));
    }
}
