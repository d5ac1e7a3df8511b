//! Query scenarios over the 20-item fixture.

#[cfg(test)]
mod tests {
    use dynaquery_core::{KeyCondition, Params, QueryBuilder, QueryError, ResultPage, Table, attr};
    use futures::TryStreamExt;

    use crate::{FIXTURE_SIZE, GSI_PARTITION, PARTITION, drop_sdk_table, memory_table, sdk_table};

    fn by_partition(table: &Table) -> QueryBuilder {
        table
            .query()
            .key([KeyCondition::eq("PK", "{pk}")])
            .unwrap_or_else(|e| panic!("key condition rejected: {e}"))
    }

    fn params() -> Params {
        Params::new().with("pk", PARTITION)
    }

    fn numbers(page: &ResultPage) -> Vec<i64> {
        page.items
            .iter()
            .map(|item| {
                item["number"]
                    .as_number()
                    .and_then(|n| n.as_i64())
                    .unwrap_or_else(|| panic!("item without number: {item:?}"))
            })
            .collect()
    }

    async fn run(table: &Table, query: &QueryBuilder) -> ResultPage {
        table
            .execute(query, &params(), None)
            .await
            .unwrap_or_else(|e| panic!("query failed: {e}"))
    }

    #[tokio::test]
    async fn test_should_page_through_fixture_with_cursor() {
        let table = memory_table();
        let query = by_partition(&table).page_size(10);

        let first = run(&table, &query).await;
        assert_eq!(first.count, 10);
        assert_eq!(numbers(&first), (0..10).collect::<Vec<_>>());
        let cursor = first.next_cursor.clone().unwrap();

        let second = table.execute(&query, &params(), Some(&cursor)).await.unwrap();
        assert_eq!(numbers(&second), (10..20).collect::<Vec<_>>());
        assert!(second.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_should_stream_pages_until_exhausted() {
        let table = memory_table();
        let query = by_partition(&table).limit(7);
        let executor = table.executor().unwrap();
        let params = params();

        let pages: Vec<ResultPage> = query
            .execute_paginated(executor, &params, None)
            .try_collect()
            .await
            .unwrap();
        let counts: Vec<usize> = pages.iter().map(|p| p.count).collect();
        assert_eq!(counts, [7, 7, 6]);
        assert!(pages.last().unwrap().next_cursor.is_none());
        assert_eq!(pages.iter().map(|p| p.count).sum::<usize>(), FIXTURE_SIZE);
    }

    #[tokio::test]
    async fn test_should_filter_number_between_5_and_10() {
        let table = memory_table();
        let query = by_partition(&table).filter(attr("number").between(5, 10));
        let page = run(&table, &query).await;
        assert_eq!(numbers(&page), [5, 6, 7, 8, 9, 10]);
    }

    #[tokio::test]
    async fn test_should_combine_filters() {
        let table = memory_table();
        let query = by_partition(&table)
            .filter(attr("number").gte(15) | attr("number").lt(2))
            .filter(!attr("number").eq(17));
        let page = run(&table, &query).await;
        assert_eq!(numbers(&page), [0, 1, 15, 16, 18, 19]);

        let query = by_partition(&table).filter(attr("number").is_in([3, 4, 99]));
        assert_eq!(numbers(&run(&table, &query).await), [3, 4]);
    }

    #[tokio::test]
    async fn test_should_match_sort_key_prefix() {
        let table = memory_table();
        let query = by_partition(&table)
            .key([KeyCondition::begins_with("SK", "FluentAPITest0")])
            .unwrap();
        let page = run(&table, &query).await;
        assert_eq!(numbers(&page), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_should_compare_sort_keys_bytewise() {
        let table = memory_table();
        let cases = [
            (KeyCondition::gt("SK", "FluentAPITest05"), 15),
            (KeyCondition::gte("SK", "FluentAPITest05"), 15),
            (KeyCondition::lt("SK", "FluentAPITest05"), 5),
            (KeyCondition::lte("SK", "FluentAPITest05"), 5),
            (KeyCondition::gte("SK", "FluentAPITest05SK"), 15),
            (KeyCondition::gt("SK", "FluentAPITest05SK"), 14),
        ];
        for (condition, expected) in cases {
            let query = by_partition(&table).key([condition]).unwrap();
            assert_eq!(run(&table, &query).await.count, expected);
        }
    }

    #[tokio::test]
    async fn test_should_query_sort_key_range() {
        let table = memory_table();
        let query = by_partition(&table)
            .key([KeyCondition::between("SK", "FluentAPITest03SK", "FluentAPITest06SK")])
            .unwrap();
        assert_eq!(numbers(&run(&table, &query).await), [3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_should_scan_backward() {
        let table = memory_table();
        let page = run(&table, &by_partition(&table).backward()).await;
        assert_eq!(numbers(&page), (0..20).rev().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_should_project_reserved_attribute() {
        let table = memory_table();
        let query = by_partition(&table).attributes(["number"]);
        let page = run(&table, &query).await;
        assert_eq!(page.count, FIXTURE_SIZE);
        for item in &page.items {
            assert_eq!(item.keys().collect::<Vec<_>>(), ["number"]);
        }
    }

    #[tokio::test]
    async fn test_should_query_global_index() {
        let table = memory_table();
        let query = table
            .query()
            .index("GSI1")
            .key([KeyCondition::eq("GSI1PK", GSI_PARTITION)])
            .unwrap()
            .page_size(5);
        let first = run(&table, &query).await;
        assert_eq!(numbers(&first), [19, 18, 17, 16, 15]);

        let cursor = first.next_cursor.unwrap();
        let second = table.execute(&query, &params(), Some(&cursor)).await.unwrap();
        assert_eq!(numbers(&second), [14, 13, 12, 11, 10]);
    }

    #[tokio::test]
    async fn test_should_reject_three_key_conditions() {
        let table = memory_table();
        let result = table.query().key([
            KeyCondition::eq("PK", 1),
            KeyCondition::eq("SK", 1),
            KeyCondition::eq("GSI1PK", 1),
        ]);
        assert!(matches!(
            result,
            Err(QueryError::TooManyKeyConditions { max: 2, count: 3 })
        ));
    }

    #[tokio::test]
    async fn test_should_report_missing_template_parameter() {
        let table = memory_table();
        let query = by_partition(&table);
        let result = table.execute(&query, &Params::new(), None).await;
        assert!(matches!(result, Err(QueryError::TemplateSubstitution { key, .. }) if key == "pk"));
    }

    #[tokio::test]
    async fn test_should_pass_store_errors_through() {
        let table = memory_table();
        let query = table
            .query()
            .index("NoSuchIndex")
            .key([KeyCondition::eq("PK", PARTITION)])
            .unwrap();
        let err = table.execute(&query, &params(), None).await.unwrap_err();
        let QueryError::Executor(source) = err else {
            panic!("expected executor error, got {err:?}");
        };
        assert!(source.to_string().contains("NoSuchIndex"));
    }

    #[tokio::test]
    async fn test_should_map_items_to_typed_models() {
        #[derive(Debug, serde::Deserialize)]
        struct Row {
            #[serde(rename = "SK")]
            sort_key: String,
            number: u32,
        }

        let table = memory_table();
        let query = by_partition(&table).page_size(3);
        let rows: Vec<Row> = run(&table, &query).await.items_as().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].sort_key, "FluentAPITest01SK");
        assert_eq!(rows[2].number, 2);
    }

    #[tokio::test]
    #[ignore = "requires running DynamoDB endpoint"]
    async fn test_should_page_through_fixture_with_sdk() {
        let table = sdk_table("paging").await.unwrap();
        let query = by_partition(&table).page_size(10);

        let first = run(&table, &query).await;
        assert_eq!(first.count, 10);
        let cursor = first.next_cursor.clone().unwrap();
        let second = table.execute(&query, &params(), Some(&cursor)).await.unwrap();
        assert_eq!(second.count, 10);

        let filtered = run(&table, &by_partition(&table).filter(attr("number").between(5, 10))).await;
        assert_eq!(filtered.count, 6);

        drop_sdk_table(&table).await.unwrap();
    }
}
