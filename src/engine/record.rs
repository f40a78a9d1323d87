//! Commit log record format
//!
//! Every committed write transaction becomes exactly one record:
//!
//! ```text
//! +------------------+
//! | Record Length    | (u32 LE, includes itself and the checksum)
//! +------------------+
//! | Sequence Number  | (u64 LE)
//! +------------------+
//! | Op Count         | (u32 LE)
//! +------------------+
//! | Ops              | (op_count times)
//! +------------------+
//! | Checksum         | (u32 LE)
//! +------------------+
//! ```
//!
//! Each op is `kind (u8: 0 = set, 1 = delete) | key (length-prefixed)`
//! followed, for sets only, by the length-prefixed value.
//!
//! Checksum covers all bytes except the checksum itself.

use std::io::{self, Cursor, Read};

use super::checksum::compute_checksum;

/// Smallest possible record: length + sequence + op count + checksum
pub const MIN_RECORD_SIZE: usize = 4 + 8 + 4 + 4;

const OP_SET: u8 = 0;
const OP_DELETE: u8 = 1;

/// A single mutation inside a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOp {
    /// Insert or overwrite a key
    Set { key: Vec<u8>, value: Vec<u8> },
    /// Remove a key (absent keys are not an error)
    Delete { key: Vec<u8> },
}

/// One committed transaction as stored in the commit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    /// Monotonic sequence number, starting at 1
    pub sequence: u64,
    /// Mutations in the order the transaction applied them
    pub ops: Vec<LogOp>,
}

impl CommitRecord {
    pub fn new(sequence: u64, ops: Vec<LogOp>) -> Self {
        Self { sequence, ops }
    }

    fn serialize_body(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.extend_from_slice(&(self.ops.len() as u32).to_le_bytes());

        for op in &self.ops {
            match op {
                LogOp::Set { key, value } => {
                    buf.push(OP_SET);
                    write_bytes(&mut buf, key);
                    write_bytes(&mut buf, value);
                }
                LogOp::Delete { key } => {
                    buf.push(OP_DELETE);
                    write_bytes(&mut buf, key);
                }
            }
        }

        buf
    }

    /// Serialize the complete record, length prefix and checksum included.
    pub fn serialize(&self) -> Vec<u8> {
        let body = self.serialize_body();
        let record_length = (4 + body.len() + 4) as u32;

        let mut record = Vec::with_capacity(record_length as usize);
        record.extend_from_slice(&record_length.to_le_bytes());
        record.extend_from_slice(&body);

        let checksum = compute_checksum(&record);
        record.extend_from_slice(&checksum.to_le_bytes());

        record
    }

    /// Deserialize a record from bytes, verifying checksum.
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        if data.len() < MIN_RECORD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Record too short",
            ));
        }

        let record_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

        if record_length < MIN_RECORD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid record length: {}", record_length),
            ));
        }

        if data.len() < record_length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Record truncated: expected {} bytes, got {}",
                    record_length,
                    data.len()
                ),
            ));
        }

        let checksum_offset = record_length - 4;
        let stored_checksum = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        let computed_checksum = compute_checksum(&data[0..checksum_offset]);

        if computed_checksum != stored_checksum {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Checksum mismatch: computed {:08x}, stored {:08x}",
                    computed_checksum, stored_checksum
                ),
            ));
        }

        let mut cursor = Cursor::new(&data[4..checksum_offset]);

        let mut seq_buf = [0u8; 8];
        cursor.read_exact(&mut seq_buf)?;
        let sequence = u64::from_le_bytes(seq_buf);

        let mut count_buf = [0u8; 4];
        cursor.read_exact(&mut count_buf)?;
        let op_count = u32::from_le_bytes(count_buf) as usize;

        let mut ops = Vec::with_capacity(op_count.min(1024));
        for _ in 0..op_count {
            let mut kind = [0u8; 1];
            cursor.read_exact(&mut kind)?;
            let key = read_bytes(&mut cursor)?;
            let op = match kind[0] {
                OP_SET => LogOp::Set {
                    key,
                    value: read_bytes(&mut cursor)?,
                },
                OP_DELETE => LogOp::Delete { key },
                other => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("Unknown op kind: {}", other),
                    ))
                }
            };
            ops.push(op);
        }

        Ok((Self { sequence, ops }, record_length))
    }
}

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn read_bytes<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;

    Ok(buf)
}
