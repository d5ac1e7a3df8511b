//! In-memory wide-column store for dynaquery.
//!
//! [`MemoryStore`] keeps tables in process and implements
//! [`dynaquery_core::QueryExecutor`], parsing and evaluating the same
//! key-condition, filter and projection expressions a remote store accepts.
//! Sort keys order strings by UTF-8 bytes, numbers numerically and binary
//! bytewise. `Limit` counts items read before the filter is applied, and a
//! `LastEvaluatedKey` is only returned while more items remain.
#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod error;
pub mod expression;
pub mod key_condition;
pub mod storage;
pub mod store;

pub use error::MemoryError;
pub use storage::{KeyAttribute, KeySchema, ScalarType, TableStorage};
pub use store::{MemoryStore, TableDefinition};
