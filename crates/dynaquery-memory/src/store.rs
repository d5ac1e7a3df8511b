//! The in-memory store and its executor implementation.

use std::collections::{HashMap, HashSet};
use std::future::ready;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use dynaquery_core::{BoxError, QueryExecutor, collect_pages};
use dynaquery_model::{
    AttributeValue, Document, GetItemOutput, GetItemRequest, Item, QueryOutput, QueryRequest,
    RawPage, codec,
};
use tracing::debug;

use crate::error::MemoryError;
use crate::expression::ast::{
    collect_names, collect_projection_names, collect_top_level_names, collect_values,
};
use crate::expression::{AttributePath, EvalContext, Expr, parse_condition, parse_projection};
use crate::key_condition::{KeyLookup, extract_key_lookup};
use crate::storage::{KeyAttribute, KeyQuery, KeySchema, TableStorage, extract_primary_key};

/// Shape of a table to create.
#[derive(Debug, Clone)]
pub struct TableDefinition {
    name: String,
    key_schema: KeySchema,
    indexes: Vec<(String, KeySchema)>,
}

impl TableDefinition {
    /// A table keyed by `partition_key` only.
    #[must_use]
    pub fn new(name: impl Into<String>, partition_key: KeyAttribute) -> Self {
        Self {
            name: name.into(),
            key_schema: KeySchema::new(partition_key),
            indexes: Vec::new(),
        }
    }

    /// Add a sort key.
    #[must_use]
    pub fn sort_key(mut self, sort_key: KeyAttribute) -> Self {
        self.key_schema = self.key_schema.with_sort_key(sort_key);
        self
    }

    /// Add a global secondary index (all attributes projected).
    #[must_use]
    pub fn global_index(mut self, name: impl Into<String>, key_schema: KeySchema) -> Self {
        self.indexes.push((name.into(), key_schema));
        self
    }

    /// The table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An in-process store holding any number of tables.
///
/// Implements [`QueryExecutor`], so it can stand in for a real endpoint in
/// tests and local tooling.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: DashMap<String, Arc<TableStorage>>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table.
    ///
    /// # Errors
    ///
    /// Returns `MemoryError::TableExists` if the name is taken.
    pub fn create_table(&self, definition: TableDefinition) -> Result<Arc<TableStorage>, MemoryError> {
        let TableDefinition {
            name,
            key_schema,
            indexes,
        } = definition;
        let storage = indexes
            .into_iter()
            .fold(TableStorage::new(key_schema), |storage, (index, schema)| {
                storage.with_index(index, schema)
            });

        match self.tables.entry(name) {
            Entry::Occupied(e) => Err(MemoryError::TableExists(e.key().clone())),
            Entry::Vacant(e) => {
                debug!(table = %e.key(), "created table");
                let storage = Arc::new(storage);
                e.insert(Arc::clone(&storage));
                Ok(storage)
            }
        }
    }

    /// Look up a table.
    ///
    /// # Errors
    ///
    /// Returns `MemoryError::TableNotFound` for an unknown name.
    pub fn table(&self, name: &str) -> Result<Arc<TableStorage>, MemoryError> {
        self.tables
            .get(name)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| MemoryError::TableNotFound(name.to_owned()))
    }

    /// All table names, sorted.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    /// Insert or replace a wire item, returning the replaced one.
    ///
    /// # Errors
    ///
    /// Returns `TableNotFound` or the storage error for bad keys.
    pub fn put_item(&self, table: &str, item: Item) -> Result<Option<Item>, MemoryError> {
        Ok(self.table(table)?.put_item(item)?)
    }

    /// Insert or replace an application document.
    ///
    /// # Errors
    ///
    /// Same as [`MemoryStore::put_item`].
    pub fn put_document(&self, table: &str, document: &Document) -> Result<Option<Item>, MemoryError> {
        self.put_item(table, codec::serialize_document(document))
    }

    fn run_get_item(&self, request: &GetItemRequest) -> Result<Option<Item>, MemoryError> {
        let name = request
            .table_name
            .as_deref()
            .ok_or(MemoryError::MissingTableName)?;
        let table = self.table(name)?;

        let schema = table.key_schema();
        let matches_schema = request.key.len() == schema.attribute_names().count()
            && schema.attribute_names().all(|n| request.key.contains_key(n));
        if !matches_schema {
            return Err(MemoryError::validation(
                "the provided key element does not match the schema",
            ));
        }
        let key = extract_primary_key(schema, &request.key)?;

        let projection = request
            .projection_expression
            .as_deref()
            .map(parse_projection)
            .transpose()?;
        let mut used_names = HashSet::new();
        if let Some(paths) = &projection {
            collect_projection_names(paths, &mut used_names);
        }
        validate_names(&request.expression_attribute_names, &used_names)?;

        let item = table.get_item(&key);
        debug!(table = name, found = item.is_some(), "get item");
        Ok(item.map(|item| match &projection {
            Some(paths) => project(&item, paths, &request.expression_attribute_names),
            None => item,
        }))
    }
}

/// A validated query, ready to read pages.
struct QueryPlan<'r> {
    table: Arc<TableStorage>,
    index: Option<&'r str>,
    lookup: KeyLookup,
    filter: Option<Expr>,
    projection: Option<Vec<AttributePath>>,
    forward: bool,
    names: &'r HashMap<String, String>,
    values: &'r HashMap<String, AttributeValue>,
}

impl<'r> QueryPlan<'r> {
    fn prepare(store: &MemoryStore, request: &'r QueryRequest) -> Result<Self, MemoryError> {
        let name = request
            .table_name
            .as_deref()
            .ok_or(MemoryError::MissingTableName)?;
        let table = store.table(name)?;
        let index = request.index_name.as_deref();
        if index.is_some() && request.consistent_read == Some(true) {
            return Err(MemoryError::validation(
                "consistent reads are not supported on global secondary indexes",
            ));
        }
        if request.key_condition_expression.trim().is_empty() {
            return Err(MemoryError::validation("the key condition expression can not be empty"));
        }

        let key_expr = parse_condition(&request.key_condition_expression)?;
        let filter = request
            .filter_expression
            .as_deref()
            .map(parse_condition)
            .transpose()?;
        let projection = request
            .projection_expression
            .as_deref()
            .map(parse_projection)
            .transpose()?;

        let mut used_names = HashSet::new();
        let mut used_values = HashSet::new();
        for expr in std::iter::once(&key_expr).chain(&filter) {
            collect_names(expr, &mut used_names);
            collect_values(expr, &mut used_values);
        }
        if let Some(paths) = &projection {
            collect_projection_names(paths, &mut used_names);
        }
        validate_names(&request.expression_attribute_names, &used_names)?;
        validate_values(&request.expression_attribute_values, &used_values)?;

        let schema = table.schema_for(index)?;
        if let Some(filter) = &filter {
            reject_key_attributes_in_filter(filter, schema, &request.expression_attribute_names)?;
        }
        let lookup = extract_key_lookup(
            &key_expr,
            schema,
            &request.expression_attribute_names,
            &request.expression_attribute_values,
        )?;

        Ok(Self {
            table,
            index,
            lookup,
            filter,
            projection,
            forward: request.is_forward(),
            names: &request.expression_attribute_names,
            values: &request.expression_attribute_values,
        })
    }

    /// Read one page. The limit bounds items read, before the filter.
    fn page(&self, limit: Option<usize>, start: Option<&Item>) -> Result<RawPage, MemoryError> {
        let raw = self.table.query(&KeyQuery {
            index: self.index,
            partition: self.lookup.partition.clone(),
            sort: self.lookup.sort.clone(),
            forward: self.forward,
            limit,
            exclusive_start: start,
        })?;

        let mut items = Vec::with_capacity(raw.items.len());
        for item in raw.items {
            if let Some(filter) = &self.filter {
                let ctx = EvalContext {
                    item: &item,
                    names: self.names,
                    values: self.values,
                };
                if !ctx.evaluate(filter)? {
                    continue;
                }
            }
            items.push(match &self.projection {
                Some(paths) => project(&item, paths, self.names),
                None => item,
            });
        }

        Ok(RawPage {
            items,
            last_evaluated_key: raw.last_evaluated_key,
        })
    }
}

#[async_trait]
impl QueryExecutor for MemoryStore {
    async fn query(&self, request: QueryRequest) -> Result<QueryOutput, BoxError> {
        let plan = QueryPlan::prepare(self, &request)?;
        debug!(
            table = request.table_name.as_deref(),
            index = plan.index,
            forward = plan.forward,
            "running query"
        );
        let output = collect_pages(request.pagination_config.as_ref(), |limit, start| {
            ready(plan.page(limit, start.as_ref()).map_err(BoxError::from))
        })
        .await?;
        debug!(
            count = output.items.len(),
            more = output.next_token.is_some(),
            "query finished"
        );
        Ok(output)
    }

    async fn get_item(&self, request: GetItemRequest) -> Result<GetItemOutput, BoxError> {
        let item = self.run_get_item(&request)?;
        Ok(GetItemOutput { item })
    }
}

fn project(item: &Item, paths: &[AttributePath], names: &HashMap<String, String>) -> Item {
    let no_values = HashMap::new();
    EvalContext {
        item,
        names,
        values: &no_values,
    }
    .apply_projection(paths)
}

fn validate_names(
    provided: &HashMap<String, String>,
    used: &HashSet<String>,
) -> Result<(), MemoryError> {
    if let Some(name) = used.iter().find(|n| !provided.contains_key(n.as_str())) {
        return Err(MemoryError::validation(format!(
            "unresolved attribute name reference: {name}"
        )));
    }
    reject_unused("ExpressionAttributeNames", provided.keys(), used)
}

fn validate_values(
    provided: &HashMap<String, AttributeValue>,
    used: &HashSet<String>,
) -> Result<(), MemoryError> {
    if let Some(value) = used.iter().find(|v| !provided.contains_key(v.as_str())) {
        return Err(MemoryError::validation(format!(
            "unresolved attribute value reference: {value}"
        )));
    }
    reject_unused("ExpressionAttributeValues", provided.keys(), used)
}

fn reject_unused<'k>(
    map_name: &str,
    provided: impl Iterator<Item = &'k String>,
    used: &HashSet<String>,
) -> Result<(), MemoryError> {
    let mut unused: Vec<&str> = provided
        .filter(|k| !used.contains(k.as_str()))
        .map(String::as_str)
        .collect();
    if unused.is_empty() {
        return Ok(());
    }
    unused.sort_unstable();
    Err(MemoryError::validation(format!(
        "value provided in {map_name} unused in expressions: keys: {{{}}}",
        unused.join(", ")
    )))
}

fn reject_key_attributes_in_filter(
    filter: &Expr,
    schema: &KeySchema,
    names: &HashMap<String, String>,
) -> Result<(), MemoryError> {
    let mut referenced = HashSet::new();
    collect_top_level_names(filter, &mut referenced);
    for name in referenced {
        let resolved = if name.starts_with('#') {
            names.get(&name).cloned().unwrap_or(name)
        } else {
            name
        };
        if schema.attribute_names().any(|k| k == resolved) {
            return Err(MemoryError::validation(format!(
                "filter expression can only contain non-primary key attributes: \
                 primary key attribute: {resolved}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use dynaquery_model::{Cursor, PaginationConfig};

    use super::*;
    use crate::storage::ScalarType;

    fn s(v: &str) -> AttributeValue {
        AttributeValue::S(v.to_owned())
    }

    fn n(v: i64) -> AttributeValue {
        AttributeValue::N(v.to_string())
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .create_table(
                TableDefinition::new("TestTable", KeyAttribute::new("PK", ScalarType::S))
                    .sort_key(KeyAttribute::new("SK", ScalarType::S))
                    .global_index(
                        "GSI1",
                        KeySchema::new(KeyAttribute::new("GSI1PK", ScalarType::S))
                            .with_sort_key(KeyAttribute::new("GSI1SK", ScalarType::S)),
                    ),
            )
            .unwrap();
        for i in 0..20 {
            store
                .put_item(
                    "TestTable",
                    Item::from([
                        ("PK".to_owned(), s("FluentAPITest")),
                        ("SK".to_owned(), s(&format!("FluentAPITest{i:02}SK"))),
                        ("GSI1PK".to_owned(), s("FluentAPITestGSI")),
                        ("GSI1SK".to_owned(), s(&format!("{:02}", 19 - i))),
                        ("number".to_owned(), n(i)),
                    ]),
                )
                .unwrap();
        }
        store
    }

    fn request(key_condition: &str) -> QueryRequest {
        QueryRequest {
            table_name: Some("TestTable".to_owned()),
            key_condition_expression: key_condition.to_owned(),
            expression_attribute_values: HashMap::from([(":PK".to_owned(), s("FluentAPITest"))]),
            ..QueryRequest::default()
        }
    }

    fn numbers(output: &QueryOutput) -> Vec<String> {
        output
            .items
            .iter()
            .map(|item| item["number"].as_n().unwrap_or_default().to_owned())
            .collect()
    }

    #[test]
    fn test_should_reject_duplicate_tables() {
        let store = store();
        let again = TableDefinition::new("TestTable", KeyAttribute::new("PK", ScalarType::S));
        assert!(matches!(store.create_table(again), Err(MemoryError::TableExists(_))));
        assert_eq!(store.table_names(), ["TestTable"]);
    }

    #[tokio::test]
    async fn test_should_drain_all_pages_without_config() {
        let output = store().query(request("PK = :PK")).await.unwrap();
        assert_eq!(output.items.len(), 20);
        assert!(output.next_token.is_none());
    }

    #[tokio::test]
    async fn test_should_stop_at_max_items_with_cursor() {
        let store = store();
        let mut req = request("PK = :PK");
        req.pagination_config = Some(PaginationConfig {
            max_items: 10,
            page_size: 10,
            starting_token: None,
        });
        let first = store.query(req.clone()).await.unwrap();
        assert_eq!(first.items.len(), 10);
        let cursor: Cursor = first.next_token.unwrap();

        req.pagination_config = Some(PaginationConfig {
            max_items: 10,
            page_size: 10,
            starting_token: Some(cursor),
        });
        let second = store.query(req).await.unwrap();
        assert_eq!(second.items.len(), 10);
        assert!(second.next_token.is_none());
        assert_eq!(numbers(&second)[0], "10");
    }

    #[tokio::test]
    async fn test_should_apply_filter_after_limit() {
        let store = store();
        let mut req = request("PK = :PK");
        req.filter_expression = Some("#n0 BETWEEN :v0 AND :v1".to_owned());
        req.expression_attribute_names = HashMap::from([("#n0".to_owned(), "number".to_owned())]);
        req.expression_attribute_values.insert(":v0".to_owned(), n(5));
        req.expression_attribute_values.insert(":v1".to_owned(), n(10));

        let all = store.query(req.clone()).await.unwrap();
        assert_eq!(all.items.len(), 6);

        // Pages of 3, 3 and 2 read items 0..=7; only 5, 6 and 7 survive.
        req.pagination_config = Some(PaginationConfig {
            max_items: 3,
            page_size: 3,
            starting_token: None,
        });
        let page = store.query(req).await.unwrap();
        assert_eq!(numbers(&page), ["5", "6", "7"]);
        assert!(page.next_token.is_some());
    }

    #[tokio::test]
    async fn test_should_query_backward_and_by_index() {
        let store = store();
        let mut req = request("PK = :PK AND begins_with(SK, :SK)");
        req.expression_attribute_values.insert(":SK".to_owned(), s("FluentAPITest0"));
        req.scan_index_forward = Some(false);
        let output = store.query(req).await.unwrap();
        assert_eq!(numbers(&output), ["9", "8", "7", "6", "5", "4", "3", "2", "1", "0"]);

        let mut req = request("GSI1PK = :PK");
        req.index_name = Some("GSI1".to_owned());
        req.expression_attribute_values = HashMap::from([(":PK".to_owned(), s("FluentAPITestGSI"))]);
        let output = store.query(req).await.unwrap();
        assert_eq!(numbers(&output).first().map(String::as_str), Some("19"));
    }

    #[tokio::test]
    async fn test_should_apply_projection() {
        let mut req = request("PK = :PK");
        req.projection_expression = Some("#number".to_owned());
        req.expression_attribute_names =
            HashMap::from([("#number".to_owned(), "number".to_owned())]);
        let output = store().query(req).await.unwrap();
        assert!(output.items.iter().all(|item| item.len() == 1));
    }

    #[tokio::test]
    async fn test_should_validate_requests() {
        let store = store();

        let mut unused = request("PK = :PK");
        unused.expression_attribute_values.insert(":extra".to_owned(), n(1));
        let err = store.query(unused).await.unwrap_err();
        assert!(err.to_string().contains(":extra"));

        let mut key_filter = request("PK = :PK");
        key_filter.filter_expression = Some("SK = :PK".to_owned());
        assert!(store.query(key_filter).await.is_err());

        let mut missing = request("PK = :PK");
        missing.table_name = Some("Nope".to_owned());
        let err = store.query(missing).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MemoryError>(),
            Some(MemoryError::TableNotFound(_))
        ));

        let mut consistent_gsi = request("GSI1PK = :PK");
        consistent_gsi.index_name = Some("GSI1".to_owned());
        consistent_gsi.consistent_read = Some(true);
        assert!(store.query(consistent_gsi).await.is_err());
    }

    #[tokio::test]
    async fn test_should_get_items_by_full_key() {
        let store = store();
        let key = Item::from([("PK".to_owned(), s("FluentAPITest")), ("SK".to_owned(), s("FluentAPITest03SK"))]);
        let found = store
            .get_item(GetItemRequest {
                table_name: Some("TestTable".to_owned()),
                key: key.clone(),
                projection_expression: Some("#number".to_owned()),
                expression_attribute_names: HashMap::from([(
                    "#number".to_owned(),
                    "number".to_owned(),
                )]),
                consistent_read: None,
            })
            .await
            .unwrap();
        assert_eq!(found.item, Some(Item::from([("number".to_owned(), n(3))])));

        let missing = store
            .get_item(GetItemRequest {
                table_name: Some("TestTable".to_owned()),
                key: Item::from([("PK".to_owned(), s("FluentAPITest")), ("SK".to_owned(), s("nope"))]),
                ..GetItemRequest::default()
            })
            .await
            .unwrap();
        assert!(missing.item.is_none());

        let partial = store
            .get_item(GetItemRequest {
                table_name: Some("TestTable".to_owned()),
                key: Item::from([("PK".to_owned(), s("FluentAPITest"))]),
                ..GetItemRequest::default()
            })
            .await;
        assert!(partial.is_err());
    }
}
