//! Commit log writer
//!
//! The log is append-only and every append is followed by fsync; a write
//! transaction is not applied to the in-memory index until its record is
//! durable.
//!
//! A failed append is rolled back by truncating the file to the offset the
//! record started at, so the log never keeps a partial record behind an
//! acknowledged one. If the truncation itself fails the writer reports
//! `CLASSKV_ENGINE_UNRECOVERABLE` and must not be used again.
//!
//! Compaction replaces the whole log with a single snapshot record. The
//! snapshot is written to `commit.log.compact`, fsynced, renamed over
//! `commit.log`, and the directory is fsynced.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::errors::{EngineError, EngineResult};
use super::record::CommitRecord;

/// Directory below the data directory that holds the commit log
pub const ENGINE_DIR: &str = "engine";
/// Commit log file name
pub const LOG_FILE: &str = "commit.log";
/// Scratch file a compaction writes before renaming it over the log
pub const COMPACT_FILE: &str = "commit.log.compact";

/// Returns `<data_dir>/engine/commit.log`.
pub fn log_path(data_dir: &Path) -> PathBuf {
    data_dir.join(ENGINE_DIR).join(LOG_FILE)
}

/// Append-only commit log writer with fsync after every append.
pub struct LogWriter {
    engine_dir: PathBuf,
    log_path: PathBuf,
    file: File,
    current_offset: u64,
    #[cfg(test)]
    fault: Option<Fault>,
}

impl LogWriter {
    /// Opens or creates the commit log below `data_dir`, creating parent
    /// directories if needed. A compaction scratch file left by a crash is
    /// removed; the log it was meant to replace is still intact.
    pub fn open(data_dir: &Path) -> EngineResult<Self> {
        let engine_dir = data_dir.join(ENGINE_DIR);
        let log_path = engine_dir.join(LOG_FILE);

        if !engine_dir.exists() {
            fs::create_dir_all(&engine_dir).map_err(|e| {
                EngineError::io_error(
                    format!("Failed to create engine directory: {}", engine_dir.display()),
                    e,
                )
            })?;
        }

        let scratch = engine_dir.join(COMPACT_FILE);
        if scratch.exists() {
            fs::remove_file(&scratch).map_err(|e| {
                EngineError::io_error(
                    format!("Failed to remove stale compaction file: {}", scratch.display()),
                    e,
                )
            })?;
        }

        let file = open_append(&log_path)?;
        let current_offset = file_len(&file)?;

        Ok(Self {
            engine_dir,
            log_path,
            file,
            current_offset,
            #[cfg(test)]
            fault: None,
        })
    }

    /// Returns the path to the commit log.
    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// Returns the current end-of-log offset.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Appends one commit record and fsyncs.
    ///
    /// On failure the log is truncated back to where the record started and
    /// `CLASSKV_ENGINE_WRITE_FAILED` is returned. If that truncation fails
    /// too, the error is `CLASSKV_ENGINE_UNRECOVERABLE`.
    ///
    /// Returns the byte offset the record was written at.
    pub fn append(&mut self, record: &CommitRecord) -> EngineResult<u64> {
        let serialized = record.serialize();
        let offset = self.current_offset;

        if let Err(e) = self.write_durably(&serialized) {
            if let Err(rollback) = self.truncate_to(offset) {
                return Err(EngineError::unrecoverable(
                    format!(
                        "Commit {} failed ({}) and the log could not be truncated back to offset {}",
                        record.sequence, e, offset
                    ),
                    rollback,
                ));
            }
            return Err(EngineError::write_failed(
                format!("Failed to append commit {}", record.sequence),
                e,
            ));
        }

        self.current_offset += serialized.len() as u64;
        Ok(offset)
    }

    /// Replaces the whole log with `snapshot`.
    ///
    /// If anything fails before the rename, the current log stays in use
    /// and the error is `CLASSKV_ENGINE_WRITE_FAILED`. A failure after the
    /// rename is `CLASSKV_ENGINE_UNRECOVERABLE`.
    pub fn replace_with(&mut self, snapshot: &CommitRecord) -> EngineResult<()> {
        let scratch = self.engine_dir.join(COMPACT_FILE);
        let serialized = snapshot.serialize();

        if let Err(e) = write_new_file(&scratch, &serialized) {
            let _ = fs::remove_file(&scratch);
            return Err(EngineError::write_failed(
                format!("Failed to write compaction file: {}", scratch.display()),
                e,
            ));
        }

        if let Err(e) = fs::rename(&scratch, &self.log_path) {
            let _ = fs::remove_file(&scratch);
            return Err(EngineError::write_failed(
                format!("Failed to rename compaction file over {}", self.log_path.display()),
                e,
            ));
        }

        let reopened = sync_dir(&self.engine_dir).and_then(|_| {
            let file = OpenOptions::new().append(true).open(&self.log_path)?;
            let len = file.metadata()?.len();
            Ok((file, len))
        });

        match reopened {
            Ok((file, len)) => {
                self.file = file;
                self.current_offset = len;
                Ok(())
            }
            Err(e) => Err(EngineError::unrecoverable(
                format!(
                    "Commit log {} was compacted but could not be reopened",
                    self.log_path.display()
                ),
                e,
            )),
        }
    }

    /// Flushes and fsyncs the log file.
    pub fn sync(&mut self) -> EngineResult<()> {
        self.file
            .flush()
            .and_then(|_| self.file.sync_all())
            .map_err(|e| EngineError::write_failed("Failed to sync commit log", e))
    }

    fn write_durably(&mut self, bytes: &[u8]) -> io::Result<()> {
        #[cfg(test)]
        {
            if let Some(fault) = self.fault {
                return fault.on_write(&mut self.file, bytes);
            }
        }

        self.file.write_all(bytes)?;
        self.file.sync_all()
    }

    fn truncate_to(&mut self, offset: u64) -> io::Result<()> {
        #[cfg(test)]
        {
            if matches!(self.fault, Some(Fault::TornWriteNoRollback(_))) {
                return Err(io::Error::new(io::ErrorKind::Other, "injected rollback failure"));
            }
        }

        self.file.set_len(offset)?;
        self.file.sync_all()
    }

    #[cfg(test)]
    pub(crate) fn inject_fault(&mut self, fault: Option<Fault>) {
        self.fault = fault;
    }
}

fn open_append(path: &Path) -> EngineResult<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            EngineError::write_failed(format!("Failed to open commit log: {}", path.display()), e)
        })
}

fn file_len(file: &File) -> EngineResult<u64> {
    file.metadata()
        .map(|m| m.len())
        .map_err(|e| EngineError::io_error("Failed to read commit log metadata", e))
}

fn write_new_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// Write failures injected by tests.
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fault {
    /// Write only the first `n` bytes of the record, then fail
    TornWrite(usize),
    /// Write the whole record, then fail the fsync
    SyncFailure,
    /// Like `TornWrite`, and the rollback truncation fails as well
    TornWriteNoRollback(usize),
}

#[cfg(test)]
impl Fault {
    fn on_write(self, file: &mut File, bytes: &[u8]) -> io::Result<()> {
        let written = match self {
            Fault::TornWrite(n) | Fault::TornWriteNoRollback(n) => &bytes[..n.min(bytes.len())],
            Fault::SyncFailure => bytes,
        };
        file.write_all(written)?;
        Err(io::Error::new(io::ErrorKind::Other, "injected write failure"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::reader::LogReader;
    use crate::engine::record::LogOp;
    use tempfile::TempDir;

    fn set(key: &str, value: &str) -> LogOp {
        LogOp::Set {
            key: key.as_bytes().to_vec(),
            value: value.as_bytes().to_vec(),
        }
    }

    fn read_back(data_dir: &Path) -> Vec<CommitRecord> {
        LogReader::open(&log_path(data_dir))
            .unwrap()
            .read_all()
            .unwrap()
    }

    #[test]
    fn test_writer_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        assert!(!temp_dir.path().join(ENGINE_DIR).exists());

        let _writer = LogWriter::open(temp_dir.path()).unwrap();

        assert!(log_path(temp_dir.path()).exists());
    }

    #[test]
    fn test_append_and_read_back() {
        let temp_dir = TempDir::new().unwrap();

        {
            let mut writer = LogWriter::open(temp_dir.path()).unwrap();
            let first = writer
                .append(&CommitRecord::new(1, vec![set("a.Name", "Algebra")]))
                .unwrap();
            let second = writer
                .append(&CommitRecord::new(2, vec![set("b.Name", "Biology")]))
                .unwrap();
            assert_eq!(first, 0);
            assert!(second > first);
        }

        let records = read_back(temp_dir.path());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sequence, 1);
        assert_eq!(records[1].ops, vec![set("b.Name", "Biology")]);
    }

    #[test]
    fn test_reopen_appends_after_existing_records() {
        let temp_dir = TempDir::new().unwrap();

        let end = {
            let mut writer = LogWriter::open(temp_dir.path()).unwrap();
            writer
                .append(&CommitRecord::new(1, vec![set("a.Name", "Algebra")]))
                .unwrap();
            writer.current_offset()
        };

        let writer = LogWriter::open(temp_dir.path()).unwrap();
        assert_eq!(writer.current_offset(), end);
    }

    #[test]
    fn test_torn_append_is_truncated() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = LogWriter::open(temp_dir.path()).unwrap();
        writer
            .append(&CommitRecord::new(1, vec![set("a.Name", "Algebra")]))
            .unwrap();
        let end = writer.current_offset();

        writer.inject_fault(Some(Fault::TornWrite(9)));
        let err = writer
            .append(&CommitRecord::new(2, vec![set("b.Name", "Biology")]))
            .unwrap_err();
        assert_eq!(err.code(), crate::engine::EngineErrorCode::WriteFailed);
        assert_eq!(writer.current_offset(), end);
        assert_eq!(fs::metadata(log_path(temp_dir.path())).unwrap().len(), end);

        writer.inject_fault(None);
        writer
            .append(&CommitRecord::new(2, vec![set("c.Name", "Chemistry")]))
            .unwrap();

        let records = read_back(temp_dir.path());
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].ops, vec![set("c.Name", "Chemistry")]);
    }

    #[test]
    fn test_failed_fsync_removes_complete_record() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = LogWriter::open(temp_dir.path()).unwrap();

        writer.inject_fault(Some(Fault::SyncFailure));
        assert!(writer
            .append(&CommitRecord::new(1, vec![set("a.Name", "Algebra")]))
            .is_err());

        assert_eq!(writer.current_offset(), 0);
        assert_eq!(fs::metadata(log_path(temp_dir.path())).unwrap().len(), 0);
    }

    #[test]
    fn test_failed_rollback_is_unrecoverable() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = LogWriter::open(temp_dir.path()).unwrap();

        writer.inject_fault(Some(Fault::TornWriteNoRollback(5)));
        let err = writer
            .append(&CommitRecord::new(1, vec![set("a.Name", "Algebra")]))
            .unwrap_err();
        assert_eq!(err.code(), crate::engine::EngineErrorCode::Unrecoverable);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_replace_with_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = LogWriter::open(temp_dir.path()).unwrap();
        for seq in 1..=50 {
            writer
                .append(&CommitRecord::new(seq, vec![set("a.Name", "Algebra")]))
                .unwrap();
        }
        let before = writer.current_offset();

        let snapshot = CommitRecord::new(50, vec![set("a.Name", "Algebra")]);
        writer.replace_with(&snapshot).unwrap();
        assert!(writer.current_offset() < before);
        assert!(!temp_dir.path().join(ENGINE_DIR).join(COMPACT_FILE).exists());

        writer
            .append(&CommitRecord::new(51, vec![set("b.Name", "Biology")]))
            .unwrap();

        let records = read_back(temp_dir.path());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], snapshot);
        assert_eq!(records[1].sequence, 51);
    }

    #[test]
    fn test_open_removes_stale_compaction_file() {
        let temp_dir = TempDir::new().unwrap();
        let engine_dir = temp_dir.path().join(ENGINE_DIR);
        fs::create_dir_all(&engine_dir).unwrap();
        fs::write(engine_dir.join(COMPACT_FILE), b"half written").unwrap();

        let _writer = LogWriter::open(temp_dir.path()).unwrap();
        assert!(!engine_dir.join(COMPACT_FILE).exists());
    }
}
