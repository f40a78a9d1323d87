//! Record reconstruction from scanned stored pairs
//!
//! The engine yields pairs in ascending key order, so all fields of one id
//! are adjacent only when no other id sorts between them. The assembler
//! therefore tracks the output position of every id it has seen instead of
//! relying on adjacency, and emits records in first-seen order.

use std::collections::HashMap;

use super::errors::{StoreError, StoreResult};
use super::key::{decode_key, Field};
use super::record::ClassRecord;

/// Groups stored pairs into class records.
#[derive(Debug, Default)]
pub struct RecordAssembler {
    positions: HashMap<String, usize>,
    records: Vec<ClassRecord>,
}

impl RecordAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one stored pair into the output.
    ///
    /// A new id gets an empty placeholder record before its value is
    /// decoded. Unknown field names leave the placeholder untouched.
    pub fn push(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        let key = std::str::from_utf8(key).map_err(|_| StoreError::InvalidValue {
            what: "key",
            key: String::from_utf8_lossy(key).into_owned(),
        })?;
        let (id, field_name) = decode_key(key)?;

        let index = match self.positions.get(id) {
            Some(&index) => index,
            None => {
                let index = self.records.len();
                self.positions.insert(id.to_string(), index);
                self.records.push(ClassRecord::placeholder(id));
                index
            }
        };

        let value = std::str::from_utf8(value).map_err(|_| StoreError::InvalidValue {
            what: "value",
            key: key.to_string(),
        })?;

        if let Some(field) = Field::parse(field_name) {
            self.records[index].set_field(field, value.to_string());
        }

        Ok(())
    }

    /// Number of distinct ids seen so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records assembled so far, in first-seen order.
    pub fn finish(self) -> Vec<ClassRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble(pairs: &[(&str, &str)]) -> Vec<ClassRecord> {
        let mut assembler = RecordAssembler::new();
        for (key, value) in pairs {
            assembler.push(key.as_bytes(), value.as_bytes()).unwrap();
        }
        assembler.finish()
    }

    #[test]
    fn test_groups_fields_by_id() {
        let records = assemble(&[
            ("a.Name", "Algebra"),
            ("a.Semester", "Fall"),
            ("b.Name", "Biology"),
            ("b.Semester", "Spring"),
        ]);
        assert_eq!(
            records,
            vec![
                ClassRecord::new("a", "Algebra", "Fall"),
                ClassRecord::new("b", "Biology", "Spring"),
            ]
        );
    }

    #[test]
    fn test_interleaved_ids_keep_first_seen_order() {
        // "a.b.Name" sorts between "a.Name" and "a.Semester"
        let records = assemble(&[
            ("a.Name", "Algebra"),
            ("a.b.Name", "Nested"),
            ("a.Semester", "Fall"),
        ]);
        assert_eq!(
            records,
            vec![
                ClassRecord::new("a", "Algebra", "Fall"),
                ClassRecord::new("a.b", "Nested", ""),
            ]
        );
    }

    #[test]
    fn test_unknown_field_only_yields_empty_placeholder() {
        let records = assemble(&[("ghost.Other", "ignored")]);
        assert_eq!(records, vec![ClassRecord::placeholder("ghost")]);
    }

    #[test]
    fn test_unknown_field_does_not_overwrite_known() {
        let records = assemble(&[
            ("a.Name", "Algebra"),
            ("a.Other", "noise"),
            ("a.Semester", "Fall"),
        ]);
        assert_eq!(records, vec![ClassRecord::new("a", "Algebra", "Fall")]);
    }

    #[test]
    fn test_malformed_key_keeps_partial_output() {
        let mut assembler = RecordAssembler::new();
        assembler.push(b"a.Name", b"Algebra").unwrap();

        let err = assembler.push(b"noseparator", b"x").unwrap_err();
        assert!(matches!(err, StoreError::MalformedKey(_)));
        assert_eq!(assembler.finish(), vec![ClassRecord::new("a", "Algebra", "")]);
    }

    #[test]
    fn test_invalid_value_still_registers_id() {
        let mut assembler = RecordAssembler::new();
        let err = assembler.push(b"a.Name", &[0xFF, 0xFE]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidValue { what: "value", .. }));
        assert_eq!(assembler.len(), 1);
    }
}
