//! Executor results.

use serde::{Deserialize, Serialize};

use crate::attribute_value::Item;
use crate::cursor::Cursor;

/// One raw store response: the items of a single request and the key to
/// continue from, if the store stopped early.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPage {
    /// Items returned by this request, already filtered and projected.
    pub items: Vec<Item>,
    /// Key of the last evaluated item when more items remain.
    pub last_evaluated_key: Option<Item>,
}

/// Result of executing a [`QueryRequest`](crate::QueryRequest).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryOutput {
    /// Wire items in store order.
    #[serde(default)]
    pub items: Vec<Item>,

    /// Cursor for the next page; absent once the query is exhausted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<Cursor>,
}

/// Result of executing a [`GetItemRequest`](crate::GetItemRequest).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemOutput {
    /// The item, or `None` when no item has the requested key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,
}
