//! Class record type

use serde::{Deserialize, Serialize};

use super::key::Field;

/// A class record as exposed to callers.
///
/// Missing fields deserialize as empty strings, matching the RPC message
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassRecord {
    pub id: String,
    pub name: String,
    pub semester: String,
}

impl ClassRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        semester: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            semester: semester.into(),
        }
    }

    /// Record with only the id set; both fields empty.
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Value of a persisted field.
    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Semester => &self.semester,
        }
    }

    /// Overwrites a persisted field.
    pub fn set_field(&mut self, field: Field, value: String) {
        match field {
            Field::Name => self.name = value,
            Field::Semester => self.semester = value,
        }
    }
}
