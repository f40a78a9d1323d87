//! Field-to-key codec
//!
//! Every record field is stored under its own flat key:
//!
//! ```text
//! <id>.<FieldName>      e.g. "cs101.Name", "cs101.Semester"
//! ```
//!
//! Neither part is escaped. Decoding splits at the *last* separator, so an
//! id that itself contains `.` still decodes to the full id as long as the
//! field name does not contain one (`x.y.Name` -> `x.y` + `Name`).

use std::fmt;

use super::errors::{StoreError, StoreResult};

/// Joins record id and field name inside a storage key.
pub const SEPARATOR: char = '.';

/// Fields of a class record that are persisted as stored pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Semester,
}

impl Field {
    /// All persisted fields, in write order.
    pub const ALL: [Field; 2] = [Field::Name, Field::Semester];

    /// Field name as it appears in the storage key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Semester => "Semester",
        }
    }

    /// Parses a decoded field name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Name" => Some(Field::Name),
            "Semester" => Some(Field::Semester),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the storage key for `field_name` of record `id`.
pub fn encode_key(id: &str, field_name: &str) -> String {
    let mut key = String::with_capacity(id.len() + 1 + field_name.len());
    key.push_str(id);
    key.push(SEPARATOR);
    key.push_str(field_name);
    key
}

/// Storage key for a known field.
pub fn field_key(id: &str, field: Field) -> String {
    encode_key(id, field.as_str())
}

/// Splits a storage key into `(id, field_name)` at the last separator.
///
/// A key without any separator was not written by this codec and yields
/// `MalformedKey`.
pub fn decode_key(key: &str) -> StoreResult<(&str, &str)> {
    key.rfind(SEPARATOR)
        .map(|at| (&key[..at], &key[at + SEPARATOR.len_utf8()..]))
        .ok_or_else(|| StoreError::MalformedKey(key.to_string()))
}
