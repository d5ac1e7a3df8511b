//! End-to-end scenarios for dynaquery.
//!
//! Every scenario runs against the in-memory store. The SDK variants need a
//! reachable DynamoDB endpoint and are marked `#[ignore]`:
//!
//! ```text
//! DYNAMODB_ENDPOINT_URL=http://localhost:8000 DYNAMODB_STATIC_CREDENTIALS=1 \
//!     cargo test -p dynaquery-integration -- --ignored
//! ```

use std::sync::{Arc, Once};

use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, KeySchemaElement, KeyType, Projection,
    ProjectionType, ScalarAttributeType,
};
use dynaquery_core::Table;
use dynaquery_memory::{KeyAttribute, KeySchema, MemoryStore, ScalarType, TableDefinition};
use dynaquery_model::{Document, Value, codec};
use dynaquery_sdk::{SdkConfig, SdkExecutor, convert};

static INIT: Once = Once::new();

/// Initialize tracing (once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Name of the fixture table in the memory store.
pub const TABLE_NAME: &str = "TestTable";

/// Partition key shared by every fixture item.
pub const PARTITION: &str = "FluentAPITest";

/// Index partition key shared by every fixture item.
pub const GSI_PARTITION: &str = "FluentAPITestGSI";

/// Number of fixture items.
pub const FIXTURE_SIZE: usize = 20;

/// The fixture: `PK = FluentAPITest`, `SK = FluentAPITest{nn}SK` and
/// `number = nn` for nn in 0..20. The index sort key runs the other way.
#[must_use]
pub fn fixture_items() -> Vec<Document> {
    (0..FIXTURE_SIZE)
        .map(|i| {
            Document::from([
                ("PK".to_owned(), Value::from(PARTITION)),
                ("SK".to_owned(), Value::from(format!("{PARTITION}{i:02}SK"))),
                ("GSI1PK".to_owned(), Value::from(GSI_PARTITION)),
                ("GSI1SK".to_owned(), Value::from(format!("{:02}", FIXTURE_SIZE - 1 - i))),
                ("number".to_owned(), Value::from(i)),
            ])
        })
        .collect()
}

/// A memory store holding the fixture table.
#[must_use]
pub fn memory_store() -> Arc<MemoryStore> {
    init_tracing();

    let store = MemoryStore::new();
    store
        .create_table(
            TableDefinition::new(TABLE_NAME, KeyAttribute::new("PK", ScalarType::S))
                .sort_key(KeyAttribute::new("SK", ScalarType::S))
                .global_index(
                    "GSI1",
                    KeySchema::new(KeyAttribute::new("GSI1PK", ScalarType::S))
                        .with_sort_key(KeyAttribute::new("GSI1SK", ScalarType::S)),
                ),
        )
        .unwrap_or_else(|e| panic!("failed to create fixture table: {e}"));
    for item in fixture_items() {
        store
            .put_document(TABLE_NAME, &item)
            .unwrap_or_else(|e| panic!("failed to seed fixture item: {e}"));
    }
    Arc::new(store)
}

/// The fixture table bound to a fresh memory store.
#[must_use]
pub fn memory_table() -> Table {
    Table::new(TABLE_NAME).with_executor(memory_store())
}

/// Generate a unique table name for a live-endpoint test.
#[must_use]
pub fn test_table_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

fn key_element(name: &str, key_type: KeyType) -> anyhow::Result<KeySchemaElement> {
    Ok(KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()?)
}

fn string_attribute(name: &str) -> anyhow::Result<AttributeDefinition> {
    Ok(AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(ScalarAttributeType::S)
        .build()?)
}

/// Create and seed the fixture table on the endpoint from `SdkConfig::from_env`.
///
/// Returns the table bound to an SDK executor; drop it with [`drop_sdk_table`].
pub async fn sdk_table(prefix: &str) -> anyhow::Result<Table> {
    init_tracing();

    let executor = SdkExecutor::from_config(&SdkConfig::from_env()).await;
    let client = executor.client();
    let name = test_table_name(prefix);

    client
        .create_table()
        .table_name(&name)
        .key_schema(key_element("PK", KeyType::Hash)?)
        .key_schema(key_element("SK", KeyType::Range)?)
        .attribute_definitions(string_attribute("PK")?)
        .attribute_definitions(string_attribute("SK")?)
        .attribute_definitions(string_attribute("GSI1PK")?)
        .attribute_definitions(string_attribute("GSI1SK")?)
        .global_secondary_indexes(
            GlobalSecondaryIndex::builder()
                .index_name("GSI1")
                .key_schema(key_element("GSI1PK", KeyType::Hash)?)
                .key_schema(key_element("GSI1SK", KeyType::Range)?)
                .projection(
                    Projection::builder()
                        .projection_type(ProjectionType::All)
                        .build(),
                )
                .build()?,
        )
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await?;

    for item in fixture_items() {
        client
            .put_item()
            .table_name(&name)
            .set_item(Some(convert::to_sdk_item(codec::serialize_document(&item))))
            .send()
            .await?;
    }

    Ok(Table::new(name).with_executor(Arc::new(executor)))
}

/// Delete a table created by [`sdk_table`].
pub async fn drop_sdk_table(table: &Table) -> anyhow::Result<()> {
    let executor = SdkExecutor::from_config(&SdkConfig::from_env()).await;
    executor
        .client()
        .delete_table()
        .table_name(table.name())
        .send()
        .await?;
    Ok(())
}

mod test_item;
mod test_query;
mod test_table;
