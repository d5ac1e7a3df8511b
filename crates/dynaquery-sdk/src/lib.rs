//! [`QueryExecutor`](dynaquery_core::QueryExecutor) over the AWS DynamoDB SDK.
//!
//! [`SdkConfig`] reads the endpoint, region and credential mode from the
//! environment and builds a client; [`SdkExecutor`] runs built requests with
//! it, one SDK call per page.
#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod config;
pub mod convert;
pub mod error;
pub mod executor;

pub use config::SdkConfig;
pub use error::SdkExecutorError;
pub use executor::SdkExecutor;
