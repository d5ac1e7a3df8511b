//! Table handles and request rendering.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dynaquery_core::{KeyCondition, Params, QueryError, Table, attr};
    use dynaquery_memory::{KeyAttribute, MemoryStore, ScalarType, TableDefinition};
    use dynaquery_model::Value;

    use crate::{PARTITION, TABLE_NAME, init_tracing, memory_table};

    #[test]
    fn test_should_share_executor_between_clones() {
        let table = memory_table();
        let copy = table.clone();
        assert!(Arc::ptr_eq(
            table.executor().unwrap(),
            copy.executor().unwrap()
        ));
        assert_eq!(copy.name(), TABLE_NAME);
    }

    #[test]
    fn test_should_bind_query_to_table_name() {
        let table = memory_table();
        let request = table
            .query()
            .key([KeyCondition::eq("PK", PARTITION)])
            .unwrap()
            .build(&Params::new(), None)
            .unwrap();
        assert_eq!(request.table_name.as_deref(), Some(TABLE_NAME));
        assert_eq!(request.key_condition_expression, "PK = :k_PK");
    }

    #[test]
    fn test_should_leave_builder_untouched_by_derived_copies() {
        let table = memory_table();
        let base = table
            .query()
            .key([KeyCondition::eq("PK", PARTITION)])
            .unwrap();
        let narrowed = base.filter(attr("number").gt(3)).page_size(5).backward();

        let first = base.build(&Params::new(), None).unwrap();
        let second = base.build(&Params::new(), None).unwrap();
        assert_eq!(first, second);
        assert!(first.filter_expression.is_none());
        assert!(first.pagination_config.is_none());

        let request = narrowed.build(&Params::new(), None).unwrap();
        assert!(request.filter_expression.is_some());
        assert_eq!(request.scan_index_forward, Some(false));
    }

    #[test]
    fn test_should_preview_request_as_json() {
        let table = memory_table();
        let preview = table
            .query()
            .key([KeyCondition::eq("PK", "{pk}")])
            .unwrap()
            .attributes(["number"])
            .preview(&Params::new().with("pk", PARTITION), None)
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&preview).unwrap();
        assert_eq!(json["TableName"], TABLE_NAME);
        assert_eq!(json["ExpressionAttributeValues"][":k_PK"]["S"], PARTITION);
        assert_eq!(json["ExpressionAttributeNames"]["#number"], "number");
    }

    #[tokio::test]
    async fn test_should_require_executor_on_bare_table() {
        let table = Table::new(TABLE_NAME);
        let query = table
            .query()
            .key([KeyCondition::eq("PK", PARTITION)])
            .unwrap();
        assert!(matches!(
            table.execute(&query, &Params::new(), None).await,
            Err(QueryError::NoExecutor)
        ));
    }

    #[tokio::test]
    async fn test_should_query_table_keyed_on_awkward_names() {
        #[derive(serde::Serialize)]
        struct Session<'a> {
            #[serde(rename = "user-id")]
            user: &'a str,
            #[serde(rename = "v0")]
            seq: u32,
            number: u32,
        }

        init_tracing();
        let store = MemoryStore::new();
        store
            .create_table(
                TableDefinition::new("Sessions", KeyAttribute::new("user-id", ScalarType::S))
                    .sort_key(KeyAttribute::new("v0", ScalarType::N)),
            )
            .unwrap();
        for seq in 0..6 {
            let session = Session {
                user: "u1",
                seq,
                number: seq * 10,
            };
            let Value::Map(document) = Value::from_serializable(&session).unwrap() else {
                panic!("session did not serialize to a map");
            };
            store.put_document("Sessions", &document).unwrap();
        }

        let table = Table::new("Sessions").with_executor(Arc::new(store));
        let query = table
            .query()
            .key([KeyCondition::eq("user-id", "u1"), KeyCondition::gte("v0", 2)])
            .unwrap()
            .filter(attr("number").lt(50));
        let page = table.execute(&query, &Params::new(), None).await.unwrap();

        let sort_keys: Vec<i64> = page
            .items
            .iter()
            .filter_map(|item| item["v0"].as_number().and_then(|n| n.as_i64()))
            .collect();
        assert_eq!(sort_keys, [2, 3, 4]);
    }
}
