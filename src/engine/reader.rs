//! Sequential commit log reader used for replay on open.
//!
//! Every record is checksum-verified. A torn or corrupted record is reported
//! as `CLASSKV_DATA_CORRUPTION`; the engine refuses to open on top of it.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::errors::{EngineError, EngineResult};
use super::record::{CommitRecord, MIN_RECORD_SIZE};

/// Commit log reader for full sequential scans.
pub struct LogReader {
    reader: BufReader<File>,
    current_offset: u64,
    file_size: u64,
}

impl LogReader {
    /// Opens the commit log for reading.
    pub fn open(log_path: &Path) -> EngineResult<Self> {
        let file = File::open(log_path).map_err(|e| {
            EngineError::read_failed(
                format!("Failed to open commit log: {}", log_path.display()),
                e,
            )
        })?;

        let file_size = file
            .metadata()
            .map_err(|e| EngineError::read_failed("Failed to read commit log metadata", e))?
            .len();

        Ok(Self {
            reader: BufReader::new(file),
            current_offset: 0,
            file_size,
        })
    }

    /// Reads the next record.
    ///
    /// - `Ok(Some(record))` if a record was read
    /// - `Ok(None)` at end of file
    /// - `Err(CLASSKV_DATA_CORRUPTION)` on framing or checksum failure
    pub fn read_next(&mut self) -> EngineResult<Option<CommitRecord>> {
        if self.current_offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.current_offset;
        if remaining < MIN_RECORD_SIZE as u64 {
            return Err(EngineError::corruption_at_offset(
                self.current_offset,
                format!(
                    "Truncated commit log: {} bytes remaining, minimum record size is {}",
                    remaining, MIN_RECORD_SIZE
                ),
            ));
        }

        let mut len_buf = [0u8; 4];
        self.reader.read_exact(&mut len_buf).map_err(|e| {
            EngineError::corruption_at_offset(
                self.current_offset,
                format!("Failed to read record length: {}", e),
            )
        })?;
        let record_length = u32::from_le_bytes(len_buf) as u64;

        if record_length < MIN_RECORD_SIZE as u64 {
            return Err(EngineError::corruption_at_offset(
                self.current_offset,
                format!("Invalid record length: {}", record_length),
            ));
        }

        if record_length > remaining {
            return Err(EngineError::corruption_at_offset(
                self.current_offset,
                format!(
                    "Record length {} exceeds remaining file size {}",
                    record_length, remaining
                ),
            ));
        }

        let mut record_buf = vec![0u8; record_length as usize];
        record_buf[0..4].copy_from_slice(&len_buf);
        self.reader.read_exact(&mut record_buf[4..]).map_err(|e| {
            EngineError::corruption_at_offset(
                self.current_offset,
                format!("Failed to read record body: {}", e),
            )
        })?;

        let (record, consumed) = CommitRecord::deserialize(&record_buf)
            .map_err(|e| EngineError::corruption_at_offset(self.current_offset, e.to_string()))?;

        self.current_offset += consumed as u64;

        Ok(Some(record))
    }

    /// Reads all remaining records. Any corruption fails the whole read.
    #[cfg(test)]
    pub fn read_all(&mut self) -> EngineResult<Vec<CommitRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_next()? {
            records.push(record);
        }
        Ok(records)
    }
}
