//! Embedded ordered key-value engine for classkv
//!
//! Keys and values are raw bytes. The engine offers:
//!
//! - Read transactions with a consistent point-in-time view and ordered
//!   iteration
//! - Atomic write transactions (all buffered ops commit as one record)
//! - Durability through an append-only, checksummed commit log that is
//!   replayed on open
//! - Rollback of failed appends and compaction of the log into a snapshot
//!   of the live keys
//!
//! # Layout
//!
//! ```text
//! <data_dir>/
//!   engine/
//!     commit.log
//!     commit.log.compact   (only while a compaction is in flight)
//! ```
//!
//! Corruption anywhere in the commit log is fatal: the engine does not
//! open on top of a log it cannot fully verify.

mod checksum;
mod db;
mod errors;
mod reader;
mod record;
mod writer;

pub use db::{Engine, EngineOptions, ReadTxn, WriteTxn, DEFAULT_COMPACT_MIN_BYTES};
pub use errors::{EngineError, EngineErrorCode, EngineResult, Severity};
pub use writer::log_path;
