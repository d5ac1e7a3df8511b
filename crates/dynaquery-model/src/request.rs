//! Request parameter mappings handed to executors.
//!
//! Field names serialize in `PascalCase` to match the store's API. Optional
//! fields are omitted when `None`, and empty placeholder maps are omitted, so
//! the JSON form of a request contains exactly the parameters a builder set.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::attribute_value::{AttributeValue, Item};
use crate::cursor::Cursor;

/// Paginator settings attached to a query when a page size is configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PaginationConfig {
    /// Maximum number of items returned by one `execute` call.
    pub max_items: u32,

    /// Number of items evaluated per underlying store request.
    pub page_size: u32,

    /// Cursor to resume from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_token: Option<Cursor>,
}

/// Parameters of a `Query` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryRequest {
    /// Table to query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,

    /// Secondary index to query instead of the base table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,

    /// Partition/sort key conditions joined with `AND`.
    pub key_condition_expression: String,

    /// Condition applied to items after the key lookup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,

    /// Comma separated attributes to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    /// `#alias` to attribute name substitutions.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,

    /// `:placeholder` to value substitutions.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,

    /// Present (and `true`) only for strongly consistent reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,

    /// Present (and `false`) only for descending scans.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_index_forward: Option<bool>,

    /// Present only when the builder has a page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination_config: Option<PaginationConfig>,
}

impl QueryRequest {
    /// Whether the scan runs in ascending sort key order.
    #[must_use]
    pub fn is_forward(&self) -> bool {
        self.scan_index_forward.unwrap_or(true)
    }
}

/// Parameters of a `GetItem` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemRequest {
    /// Table holding the item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,

    /// Full primary key of the item, by raw attribute name.
    pub key: Item,

    /// Comma separated attributes to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    /// `#alias` to attribute name substitutions used by the projection.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,

    /// Present (and `true`) only for strongly consistent reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,
}
