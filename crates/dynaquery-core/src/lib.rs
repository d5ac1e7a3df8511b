//! Fluent query-expression builder for DynamoDB-style stores.
//!
//! A [`QueryBuilder`] (or an [`ItemLookup`] for point reads) accumulates
//! table, key conditions, filter, projection, paging and read options, and
//! renders them into the request mapping a store expects: key-condition and
//! filter expressions with `#name` / `:value` placeholders, reserved words
//! aliased, and placeholder maps merged without collisions. Execution goes
//! through a [`QueryExecutor`], and [`QueryBuilder::execute_paginated`] walks
//! continuation cursors lazily.
#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod condition;
pub mod error;
pub mod executor;
pub mod filter;
pub mod item;
pub mod page;
pub mod paginator;
pub mod params;
pub mod query;
pub mod reserved;
pub mod resolver;
pub mod table;

pub use condition::{Condition, KeyCondition, KeyOperand, KeyOperator, MAX_KEY_CONDITIONS};
pub use error::{BoxError, QueryError};
pub use executor::QueryExecutor;
pub use filter::{CompiledFilter, ExpressionCompiler, FilterCompiler, Predicate, attr};
pub use item::ItemLookup;
pub use page::ResultPage;
pub use paginator::collect_pages;
pub use params::Params;
pub use query::{QueryBuilder, ScanDirection};
pub use resolver::{NameResolver, ResolvedName};
pub use table::Table;

pub use dynaquery_model as model;
