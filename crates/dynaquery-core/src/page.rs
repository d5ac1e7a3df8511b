//! Decoded result pages.

use dynaquery_model::{Cursor, Document, QueryOutput, codec};
use serde::de::DeserializeOwned;

use crate::error::QueryError;

/// One page of decoded items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultPage {
    /// Items in store order.
    pub items: Vec<Document>,
    /// Number of items on this page.
    pub count: usize,
    /// Resume point; `None` once the query is exhausted.
    pub next_cursor: Option<Cursor>,
}

impl ResultPage {
    /// Map every item onto a typed model through serde.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Serialization` if an item does not fit `T`.
    pub fn items_as<T: DeserializeOwned>(&self) -> Result<Vec<T>, QueryError> {
        self.items
            .iter()
            .map(|item| Ok(serde_json::from_value(serde_json::to_value(item)?)?))
            .collect()
    }

    /// Whether another page can be requested.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}

impl From<QueryOutput> for ResultPage {
    fn from(output: QueryOutput) -> Self {
        let items: Vec<Document> = output.items.into_iter().map(codec::deserialize_item).collect();
        Self {
            count: items.len(),
            items,
            next_cursor: output.next_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use dynaquery_model::{AttributeValue, Item};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        #[serde(rename = "SK")]
        sk: String,
        number: u32,
    }

    #[test]
    fn test_should_decode_output_and_map_to_models() {
        let item = Item::from([
            ("SK".to_owned(), AttributeValue::S("A".to_owned())),
            ("number".to_owned(), AttributeValue::N("3".to_owned())),
        ]);
        let page = ResultPage::from(QueryOutput {
            items: vec![item],
            next_token: Some(Cursor::new("c")),
        });
        assert_eq!(page.count, 1);
        assert!(page.has_more());
        assert_eq!(
            page.items_as::<Row>().unwrap(),
            vec![Row {
                sk: "A".to_owned(),
                number: 3
            }]
        );
    }

    #[test]
    fn test_should_report_model_mismatch() {
        let item = Item::from([("SK".to_owned(), AttributeValue::Bool(true))]);
        let page = ResultPage::from(QueryOutput {
            items: vec![item],
            next_token: None,
        });
        assert!(matches!(
            page.items_as::<Row>(),
            Err(QueryError::Serialization(_))
        ));
    }
}
