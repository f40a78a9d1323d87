//! Ordered transactional key-value engine
//!
//! The engine keeps the full key space in an ordered in-memory index and
//! makes it durable through the commit log. Open replays the log; every
//! committed write transaction appends one record before it becomes
//! visible.
//!
//! # Concurrency
//!
//! - Write transactions are serialized by the commit log mutex.
//! - Read transactions hold a shared lock on the index for their whole
//!   duration and therefore see one point-in-time state.
//! - A writer only takes the exclusive index lock to apply an already
//!   durable batch, so readers are never blocked behind an fsync.
//!
//! # Compaction
//!
//! Overwrites and deletes leave dead records behind. Once the log reaches
//! twice its size after the previous compaction (and at least
//! `compact_min_bytes`), the live index is written out as one snapshot
//! record that replaces the log. Open compacts a log that is already past
//! `compact_min_bytes`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard};

use crate::observability::Logger;

use super::errors::{EngineError, EngineErrorCode, EngineResult};
use super::reader::LogReader;
use super::record::{CommitRecord, LogOp};
use super::writer::LogWriter;

type Index = BTreeMap<Vec<u8>, Vec<u8>>;

/// Default log size below which the engine never compacts (4 MiB)
pub const DEFAULT_COMPACT_MIN_BYTES: u64 = 4 * 1024 * 1024;

/// Tuning for a durable engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Log size below which compaction never runs
    pub compact_min_bytes: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            compact_min_bytes: DEFAULT_COMPACT_MIN_BYTES,
        }
    }
}

struct LogState {
    writer: Option<LogWriter>,
    next_sequence: u64,
    compact_at: u64,
}

/// Embedded ordered key-value engine handle.
///
/// Safe to share between threads (`Arc<Engine>`); all synchronization is
/// internal.
pub struct Engine {
    index: RwLock<Index>,
    log: Mutex<LogState>,
    closed: AtomicBool,
    options: EngineOptions,
}

impl Engine {
    /// Opens or creates a durable engine in `data_dir` with default options.
    ///
    /// Replays `<data_dir>/engine/commit.log`. Any corruption in the log
    /// aborts the open.
    pub fn open(data_dir: &Path) -> EngineResult<Self> {
        Self::open_with(data_dir, EngineOptions::default())
    }

    /// Opens or creates a durable engine in `data_dir`.
    pub fn open_with(data_dir: &Path, options: EngineOptions) -> EngineResult<Self> {
        let writer = LogWriter::open(data_dir)?;

        let mut index = Index::new();
        let mut last_sequence = 0u64;

        if writer.current_offset() > 0 {
            let mut reader = LogReader::open(writer.path())?;
            while let Some(record) = reader.read_next()? {
                last_sequence = last_sequence.max(record.sequence);
                apply_ops(&mut index, record.ops);
            }
        }

        let replayed_bytes = writer.current_offset();
        let engine = Self {
            index: RwLock::new(index),
            log: Mutex::new(LogState {
                writer: Some(writer),
                next_sequence: last_sequence + 1,
                compact_at: options.compact_min_bytes,
            }),
            closed: AtomicBool::new(false),
            options,
        };

        if replayed_bytes >= options.compact_min_bytes {
            let compacted = {
                let mut log = engine.lock_log()?;
                engine.compact(&mut log)
            };
            if let Err(e) = compacted {
                if engine.is_closed() {
                    return Err(e);
                }
                Logger::warn(
                    "ENGINE_COMPACTION_FAILED",
                    &[("code", e.code().code()), ("error", e.to_string().as_str())],
                );
            }
        }

        Ok(engine)
    }

    /// Creates an engine without a commit log. Nothing survives drop.
    pub fn in_memory() -> Self {
        Self {
            index: RwLock::new(Index::new()),
            log: Mutex::new(LogState {
                writer: None,
                next_sequence: 1,
                compact_at: u64::MAX,
            }),
            closed: AtomicBool::new(false),
            options: EngineOptions::default(),
        }
    }

    /// Number of live keys.
    pub fn len(&self) -> EngineResult<usize> {
        Ok(self.read_index()?.len())
    }

    /// Returns true if the engine holds no keys.
    pub fn is_empty(&self) -> EngineResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Sequence number of the last committed write transaction (0 if none).
    pub fn last_sequence(&self) -> EngineResult<u64> {
        Ok(self.lock_log()?.next_sequence - 1)
    }

    /// Current size of the commit log in bytes (0 for in-memory engines).
    pub fn log_size(&self) -> EngineResult<u64> {
        Ok(self
            .lock_log()?
            .writer
            .as_ref()
            .map_or(0, LogWriter::current_offset))
    }

    /// Runs `f` inside a read transaction.
    pub fn view<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&ReadTxn<'_>) -> Result<T, E>,
        E: From<EngineError>,
    {
        self.ensure_open()?;
        let index = self.read_index()?;
        let txn = ReadTxn { index: &*index };
        f(&txn)
    }

    /// Runs `f` inside a write transaction.
    ///
    /// If `f` returns `Ok`, all buffered mutations are committed as a single
    /// log record and then applied. If `f` fails, nothing is written.
    ///
    /// A commit whose log append fails is not applied. If the log cannot be
    /// restored after the failure the engine closes itself.
    pub fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> Result<T, E>,
        E: From<EngineError>,
    {
        let mut log = self.lock_log()?;
        self.ensure_open()?;

        let (value, ops) = {
            let index = self.read_index()?;
            let mut txn = WriteTxn::new(&*index);
            let value = f(&mut txn)?;
            (value, txn.ops)
        };

        if ops.is_empty() {
            return Ok(value);
        }

        let record = CommitRecord::new(log.next_sequence, ops);
        let appended = match log.writer.as_mut() {
            Some(writer) => writer.append(&record).map(|_| ()),
            None => Ok(()),
        };
        if let Err(e) = appended {
            self.shut_down_if_unrecoverable(&mut log, &e);
            return Err(e.into());
        }
        log.next_sequence += 1;

        {
            let mut index = self
                .index
                .write()
                .map_err(|_| EngineError::lock_poisoned("index"))?;
            apply_ops(&mut index, record.ops);
        }

        let log_size = log.writer.as_ref().map_or(0, LogWriter::current_offset);
        if log_size >= log.compact_at {
            // The commit is already durable; a failed compaction only
            // leaves the longer log in place.
            if let Err(e) = self.compact(&mut log) {
                Logger::warn(
                    "ENGINE_COMPACTION_FAILED",
                    &[("code", e.code().code()), ("error", e.to_string().as_str())],
                );
            }
        }

        Ok(value)
    }

    /// Syncs and releases the commit log. Later transactions fail with
    /// `CLASSKV_ENGINE_CLOSED`. Closing twice is a no-op.
    pub fn close(&self) -> EngineResult<()> {
        let mut log = self.lock_log()?;
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(mut writer) = log.writer.take() {
            writer.sync()?;
        }
        Ok(())
    }

    /// Returns true once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Rewrites the log as one snapshot record of the live index.
    fn compact(&self, log: &mut LogState) -> EngineResult<()> {
        let snapshot = {
            let index = self.read_index()?;
            let ops = index
                .iter()
                .map(|(key, value)| LogOp::Set {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect();
            CommitRecord::new(log.next_sequence - 1, ops)
        };

        let Some(writer) = log.writer.as_mut() else {
            return Ok(());
        };
        let before = writer.current_offset();

        if let Err(e) = writer.replace_with(&snapshot) {
            self.shut_down_if_unrecoverable(log, &e);
            return Err(e);
        }

        let after = writer.current_offset();
        log.compact_at = after.saturating_mul(2).max(self.options.compact_min_bytes);

        let keys = snapshot.ops.len().to_string();
        let before = before.to_string();
        let after = after.to_string();
        Logger::info(
            "ENGINE_LOG_COMPACTED",
            &[
                ("keys", keys.as_str()),
                ("before_bytes", before.as_str()),
                ("after_bytes", after.as_str()),
            ],
        );
        Ok(())
    }

    fn shut_down_if_unrecoverable(&self, log: &mut LogState, err: &EngineError) {
        if err.code() == EngineErrorCode::Unrecoverable {
            self.closed.store(true, Ordering::SeqCst);
            log.writer = None;
            Logger::error(
                "ENGINE_LOG_UNRECOVERABLE",
                &[("code", err.code().code()), ("error", err.to_string().as_str())],
            );
        }
    }

    fn lock_log(&self) -> EngineResult<MutexGuard<'_, LogState>> {
        self.log
            .lock()
            .map_err(|_| EngineError::lock_poisoned("commit log"))
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.is_closed() {
            return Err(EngineError::closed());
        }
        Ok(())
    }

    fn read_index(&self) -> EngineResult<RwLockReadGuard<'_, Index>> {
        self.index
            .read()
            .map_err(|_| EngineError::lock_poisoned("index"))
    }
}

fn apply_ops(index: &mut Index, ops: Vec<LogOp>) {
    for op in ops {
        match op {
            LogOp::Set { key, value } => {
                index.insert(key, value);
            }
            LogOp::Delete { key } => {
                index.remove(&key);
            }
        }
    }
}

/// Read-only view of the key space at transaction start.
pub struct ReadTxn<'a> {
    index: &'a Index,
}

impl<'a> ReadTxn<'a> {
    /// Returns the value stored under `key`, or `CLASSKV_KEY_NOT_FOUND`.
    pub fn get(&self, key: &[u8]) -> EngineResult<&'a [u8]> {
        self.index
            .get(key)
            .map(Vec::as_slice)
            .ok_or_else(|| EngineError::key_not_found(key))
    }

    /// Iterates every pair in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        self.index.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}

/// Buffered write transaction. Reads observe the transaction's own writes.
pub struct WriteTxn<'a> {
    base: &'a Index,
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    ops: Vec<LogOp>,
}

impl<'a> WriteTxn<'a> {
    fn new(base: &'a Index) -> Self {
        Self {
            base,
            pending: BTreeMap::new(),
            ops: Vec::new(),
        }
    }

    /// Returns the value for `key` as this transaction currently sees it.
    pub fn get(&self, key: &[u8]) -> EngineResult<&[u8]> {
        let value = match self.pending.get(key) {
            Some(pending) => pending.as_deref(),
            None => self.base.get(key).map(Vec::as_slice),
        };
        value.ok_or_else(|| EngineError::key_not_found(key))
    }

    /// Buffers an insert or overwrite.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.pending.insert(key.to_vec(), Some(value.to_vec()));
        self.ops.push(LogOp::Set {
            key: key.to_vec(),
            value: value.to_vec(),
        });
        Ok(())
    }

    /// Buffers a delete. Deleting an absent key is not an error.
    pub fn delete(&mut self, key: &[u8]) -> EngineResult<()> {
        self.pending.insert(key.to_vec(), None);
        self.ops.push(LogOp::Delete { key: key.to_vec() });
        Ok(())
    }
}
