//! RPC request and response messages
//!
//! Every field is optional on the wire and defaults to its zero value, so
//! `{}` is a valid message of any type.

use serde::{Deserialize, Serialize};

use crate::store::ClassRecord;

/// Request for `List`. Carries no fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {}

/// Request for `Get`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetRequest {
    pub id: String,
}

/// A class on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Class {
    pub id: String,
    pub name: String,
    pub semester: String,
}

/// Response for `List`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Classes {
    pub classes: Vec<Class>,
}

/// Response for `Delete`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

impl From<ClassRecord> for Class {
    fn from(record: ClassRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            semester: record.semester,
        }
    }
}

impl From<Class> for ClassRecord {
    fn from(class: Class) -> Self {
        ClassRecord::new(class.id, class.name, class.semester)
    }
}

impl From<Vec<ClassRecord>> for Classes {
    fn from(records: Vec<ClassRecord>) -> Self {
        Self {
            classes: records.into_iter().map(Class::from).collect(),
        }
    }
}
