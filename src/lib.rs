//! classkv - class records over an embedded ordered key-value engine
//!
//! Each record `{id, name, semester}` is stored as one key per field
//! (`<id>.Name`, `<id>.Semester`) and served through a five-method RPC
//! service: List, Get, Create, Update, Delete.

pub mod cli;
pub mod engine;
pub mod observability;
pub mod rpc;
pub mod store;
