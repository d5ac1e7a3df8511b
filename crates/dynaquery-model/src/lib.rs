//! Wire and semantic value types for dynaquery.
//!
//! This crate holds everything that crosses the boundary between the request
//! builder and a store executor: the tagged `AttributeValue` wire union, the
//! plain application `Value` it decodes into, the request parameter mappings
//! handed to executors, and the page/cursor types they hand back.
// "DynamoDB" appears in a good share of the doc comments in this crate.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute_value;
pub mod codec;
pub mod cursor;
pub mod error;
pub mod output;
pub mod request;
pub mod value;

pub use attribute_value::{AttributeValue, Item};
pub use cursor::Cursor;
pub use error::ModelError;
pub use output::{GetItemOutput, QueryOutput, RawPage};
pub use request::{GetItemRequest, PaginationConfig, QueryRequest};
pub use value::{Document, Number, Value};
