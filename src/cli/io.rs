//! JSON output for one-shot CLI commands
//!
//! - Output: one JSON envelope per command on stdout, newline terminated
//! - `{"status": "ok", "data": ...}` on success
//! - `{"status": "error", "data": ..., "error": {"code", "message"}}` when a
//!   command fails after producing partial data
//! - UTF-8 only

use std::io::Write;

use serde::Serialize;

use super::errors::{CliError, CliResult};

/// Write a success envelope
pub(crate) fn write_to<W: Write, T: Serialize>(writer: &mut W, data: &T) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data,
    });
    write_line(writer, &response)
}

/// Write an error envelope carrying whatever data was produced
pub(crate) fn write_error_to<W: Write, T: Serialize>(
    writer: &mut W,
    data: &T,
    err: &CliError,
) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "data": data,
        "error": {
            "code": err.code(),
            "message": err.to_string(),
        },
    });
    write_line(writer, &response)
}

fn write_line<W: Write>(writer: &mut W, response: &serde_json::Value) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, response)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
