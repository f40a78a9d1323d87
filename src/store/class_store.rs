//! Record store operations
//!
//! Each operation runs as exactly one engine transaction. Failures are
//! logged here and handed back inside an [`Outcome`] together with the
//! response value the caller would get anyway, so the RPC boundary can
//! decide whether to surface them.
//!
//! | Operation | Transaction                          |
//! |-----------|--------------------------------------|
//! | get       | read `id.Name`, then `id.Semester`   |
//! | create    | write `id.Name`, `id.Semester`       |
//! | update    | identical to create                  |
//! | delete    | delete `id.Name`, `id.Semester`      |
//! | list      | full forward scan + assembler        |
//!
//! Transactions only make one operation's key set atomic. Two concurrent
//! writers of the same id may still leave a record mixing both writes
//! across calls; no per-record locking is layered on top.

use std::sync::Arc;

use crate::engine::Engine;
use crate::observability::Logger;

use super::assembler::RecordAssembler;
use super::errors::{StoreError, StoreResult};
use super::key::{field_key, Field};
use super::record::ClassRecord;

/// Response value of a store operation plus the error, if any, that
/// occurred while producing it.
#[derive(Debug)]
pub struct Outcome<T> {
    value: T,
    error: Option<StoreError>,
}

impl<T> Outcome<T> {
    fn new(value: T, result: StoreResult<()>) -> Self {
        Self {
            value,
            error: result.err(),
        }
    }

    /// The response value (possibly partial when an error occurred).
    pub fn value(&self) -> &T {
        &self.value
    }

    /// The suppressed error, if any.
    pub fn error(&self) -> Option<&StoreError> {
        self.error.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Drops the error and keeps the value.
    pub fn into_value(self) -> T {
        self.value
    }

    pub fn into_parts(self) -> (T, Option<StoreError>) {
        (self.value, self.error)
    }
}

/// Class record store over an injected engine handle.
#[derive(Clone)]
pub struct ClassStore {
    engine: Arc<Engine>,
}

impl ClassStore {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// The underlying engine handle.
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Reads both fields of `id`.
    ///
    /// The read stops at the first missing key; fields read before it stay
    /// populated, the rest stay empty.
    pub fn get(&self, id: &str) -> Outcome<ClassRecord> {
        let mut record = ClassRecord::placeholder(id);

        let result = self.engine.view(|txn| -> StoreResult<()> {
            for field in Field::ALL {
                let key = field_key(id, field);
                let value = txn.get(key.as_bytes())?;
                let value = std::str::from_utf8(value)
                    .map_err(|_| StoreError::InvalidValue { what: "value", key })?;
                record.set_field(field, value.to_string());
            }
            Ok(())
        });

        if let Err(ref e) = result {
            let error = e.to_string();
            let fields = [("id", id), ("error", error.as_str()), ("code", e.code())];
            if e.is_not_found() {
                Logger::warn("STORE_GET_FAILED", &fields);
            } else {
                Logger::error("STORE_GET_FAILED", &fields);
            }
        }

        Outcome::new(record, result)
    }

    /// Writes both fields of `record`, overwriting whatever was stored.
    /// Echoes the input record.
    pub fn create(&self, record: ClassRecord) -> Outcome<ClassRecord> {
        let result = self.write_fields(&record);
        self.log_write("STORE_CREATE", &record, &result);
        Outcome::new(record, result)
    }

    /// Same semantics as [`ClassStore::create`]; there is no existence check.
    pub fn update(&self, record: ClassRecord) -> Outcome<ClassRecord> {
        let result = self.write_fields(&record);
        self.log_write("STORE_UPDATE", &record, &result);
        Outcome::new(record, result)
    }

    /// Deletes both fields of `record.id`. Absent keys are not an error.
    pub fn delete(&self, record: &ClassRecord) -> Outcome<()> {
        let id = record.id.as_str();
        let result = self.engine.update(|txn| -> StoreResult<()> {
            for field in Field::ALL {
                txn.delete(field_key(id, field).as_bytes())?;
            }
            Ok(())
        });

        match result {
            Ok(()) => Logger::info("STORE_DELETE_COMPLETE", &[("id", id)]),
            Err(ref e) => Logger::error(
                "STORE_DELETE_FAILED",
                &[("id", id), ("error", e.to_string().as_str()), ("code", e.code())],
            ),
        }

        Outcome::new((), result)
    }

    /// Scans the whole key space and regroups it into records.
    ///
    /// On error the records assembled before the failing pair are still
    /// returned.
    pub fn list(&self) -> Outcome<Vec<ClassRecord>> {
        let mut assembler = RecordAssembler::new();

        let result = self.engine.view(|txn| -> StoreResult<()> {
            for (key, value) in txn.iter() {
                assembler.push(key, value)?;
            }
            Ok(())
        });

        if let Err(ref e) = result {
            Logger::error(
                "STORE_LIST_FAILED",
                &[
                    ("assembled", assembler.len().to_string().as_str()),
                    ("error", e.to_string().as_str()),
                    ("code", e.code()),
                ],
            );
        }

        Outcome::new(assembler.finish(), result)
    }

    fn write_fields(&self, record: &ClassRecord) -> StoreResult<()> {
        self.engine.update(|txn| -> StoreResult<()> {
            for field in Field::ALL {
                txn.set(
                    field_key(&record.id, field).as_bytes(),
                    record.field(field).as_bytes(),
                )?;
            }
            Ok(())
        })
    }

    fn log_write(&self, operation: &str, record: &ClassRecord, result: &StoreResult<()>) {
        match result {
            Ok(()) => Logger::info(
                &format!("{}_COMPLETE", operation),
                &[("id", record.id.as_str()), ("name", record.name.as_str())],
            ),
            Err(e) => Logger::error(
                &format!("{}_FAILED", operation),
                &[
                    ("id", record.id.as_str()),
                    ("name", record.name.as_str()),
                    ("error", e.to_string().as_str()),
                    ("code", e.code()),
                ],
            ),
        }
    }
}
