//! Point lookups by full primary key.

#[cfg(test)]
mod tests {
    use dynaquery_core::{QueryError, Table};
    use dynaquery_model::Value;

    use crate::{PARTITION, TABLE_NAME, drop_sdk_table, memory_table, sdk_table};

    fn sort_key(n: u32) -> String {
        format!("{PARTITION}{n:02}SK")
    }

    #[tokio::test]
    async fn test_should_get_item_by_key() {
        let table = memory_table();
        let item = table
            .item([("PK", PARTITION.to_owned()), ("SK", sort_key(7))])
            .unwrap()
            .get(None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item["number"], Value::from(7));
        assert_eq!(item["GSI1SK"], Value::from("12"));
    }

    #[tokio::test]
    async fn test_should_project_item_attributes() {
        let table = memory_table();
        let item = table
            .item([("PK", PARTITION.to_owned()), ("SK", sort_key(3))])
            .unwrap()
            .attributes(["number"])
            .get(Some(true))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.len(), 1);
        assert_eq!(item["number"], Value::from(3));
    }

    #[tokio::test]
    async fn test_should_return_none_for_missing_item() {
        let table = memory_table();
        let found = table
            .item([("PK", PARTITION.to_owned()), ("SK", sort_key(42))])
            .unwrap()
            .get(None)
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_should_reject_partial_key() {
        let table = memory_table();
        let err = table
            .item([("PK", PARTITION)])
            .unwrap()
            .get(None)
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Executor(_)), "{err:?}");
    }

    #[test]
    fn test_should_reject_three_key_pairs() {
        let table = memory_table();
        let result = table.item([("PK", "a"), ("SK", "b"), ("GSI1PK", "c")]);
        assert!(matches!(
            result,
            Err(QueryError::TooManyKeyConditions { max: 2, count: 3 })
        ));
    }

    #[tokio::test]
    async fn test_should_require_executor() {
        let table = Table::new(TABLE_NAME);
        let lookup = table.item([("PK", PARTITION)]).unwrap();
        assert!(matches!(lookup.get(None).await, Err(QueryError::NoExecutor)));
    }

    #[tokio::test]
    #[ignore = "requires running DynamoDB endpoint"]
    async fn test_should_get_item_with_sdk() {
        let table = sdk_table("item").await.unwrap();
        let item = table
            .item([("PK", PARTITION.to_owned()), ("SK", sort_key(7))])
            .unwrap()
            .get(Some(true))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item["number"], Value::from(7));

        let missing = table
            .item([("PK", PARTITION.to_owned()), ("SK", sort_key(42))])
            .unwrap()
            .get(None)
            .await
            .unwrap();
        assert!(missing.is_none());

        drop_sdk_table(&table).await.unwrap();
    }
}
