//! Class record store
//!
//! Maps each `ClassRecord` onto one stored pair per field and rebuilds
//! records from a full key scan.
//!
//! # Stored pairs
//!
//! ```text
//! cs101.Name      -> "Intro to CS"
//! cs101.Semester  -> "Fall2023"
//! ```
//!
//! There is no per-record existence marker: a record exists while at least
//! one of its field pairs does. Values are raw UTF-8 with no header or
//! version byte.

mod assembler;
mod class_store;
mod errors;
mod key;
mod record;

pub use assembler::RecordAssembler;
pub use class_store::{ClassStore, Outcome};
pub use errors::{StoreError, StoreResult};
pub use key::{decode_key, encode_key, field_key, Field, SEPARATOR};
pub use record::ClassRecord;
