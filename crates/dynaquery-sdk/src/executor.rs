//! The SDK-backed executor.

use std::collections::HashMap;

use async_trait::async_trait;
use dynaquery_core::{BoxError, QueryExecutor, collect_pages};
use dynaquery_model::{GetItemOutput, GetItemRequest, QueryOutput, QueryRequest, RawPage};
use tracing::debug;

use crate::config::SdkConfig;
use crate::convert::{from_sdk_item, to_sdk, to_sdk_item};

/// Runs requests against a DynamoDB endpoint through the AWS SDK.
#[derive(Debug, Clone)]
pub struct SdkExecutor {
    client: aws_sdk_dynamodb::Client,
}

impl SdkExecutor {
    /// Wrap an existing client.
    #[must_use]
    pub fn new(client: aws_sdk_dynamodb::Client) -> Self {
        Self { client }
    }

    /// Build a client from `config` and wrap it.
    pub async fn from_config(config: &SdkConfig) -> Self {
        Self::new(config.load_client().await)
    }

    /// The underlying client, e.g. for table setup.
    #[must_use]
    pub fn client(&self) -> &aws_sdk_dynamodb::Client {
        &self.client
    }
}

fn non_empty<K, V>(map: HashMap<K, V>) -> Option<HashMap<K, V>> {
    (!map.is_empty()).then_some(map)
}

#[async_trait]
impl QueryExecutor for SdkExecutor {
    async fn query(&self, request: QueryRequest) -> Result<QueryOutput, BoxError> {
        let names = non_empty(request.expression_attribute_names.clone());
        let values = non_empty(
            request
                .expression_attribute_values
                .iter()
                .map(|(k, v)| (k.clone(), to_sdk(v.clone())))
                .collect(),
        );
        debug!(
            table = request.table_name.as_deref(),
            index = request.index_name.as_deref(),
            "sending query"
        );

        collect_pages(request.pagination_config.as_ref(), |limit, start| {
            let call = self
                .client
                .query()
                .set_table_name(request.table_name.clone())
                .set_index_name(request.index_name.clone())
                .key_condition_expression(request.key_condition_expression.as_str())
                .set_filter_expression(request.filter_expression.clone())
                .set_projection_expression(request.projection_expression.clone())
                .set_expression_attribute_names(names.clone())
                .set_expression_attribute_values(values.clone())
                .set_consistent_read(request.consistent_read)
                .set_scan_index_forward(request.scan_index_forward)
                .set_limit(limit.map(|l| i32::try_from(l).unwrap_or(i32::MAX)))
                .set_exclusive_start_key(start.map(to_sdk_item));
            async move {
                let output = call.send().await?;
                let items = output
                    .items
                    .unwrap_or_default()
                    .into_iter()
                    .map(from_sdk_item)
                    .collect::<Result<Vec<_>, _>>()?;
                let last_evaluated_key = output
                    .last_evaluated_key
                    .filter(|key| !key.is_empty())
                    .map(from_sdk_item)
                    .transpose()?;
                debug!(count = items.len(), more = last_evaluated_key.is_some(), "received page");
                Ok::<_, BoxError>(RawPage {
                    items,
                    last_evaluated_key,
                })
            }
        })
        .await
    }

    async fn get_item(&self, request: GetItemRequest) -> Result<GetItemOutput, BoxError> {
        debug!(table = request.table_name.as_deref(), "sending get item");
        let output = self
            .client
            .get_item()
            .set_table_name(request.table_name)
            .set_key(Some(to_sdk_item(request.key)))
            .set_projection_expression(request.projection_expression)
            .set_expression_attribute_names(non_empty(request.expression_attribute_names))
            .set_consistent_read(request.consistent_read)
            .send()
            .await?;
        let item = output
            .item
            .filter(|item| !item.is_empty())
            .map(from_sdk_item)
            .transpose()?;
        Ok(GetItemOutput { item })
    }
}
