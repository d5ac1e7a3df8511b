//! The store capability the builders execute against.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dynaquery_model::{GetItemOutput, GetItemRequest, QueryOutput, QueryRequest};

use crate::error::BoxError;

/// Issues built requests against a store.
///
/// `query` honours `QueryRequest::pagination_config` the way
/// [`crate::paginator::collect_pages`] does; implementations usually only
/// fetch raw pages and let that driver assemble the output.
#[async_trait]
pub trait QueryExecutor: fmt::Debug + Send + Sync {
    /// Run a query.
    async fn query(&self, request: QueryRequest) -> Result<QueryOutput, BoxError>;

    /// Fetch a single item by its primary key.
    async fn get_item(&self, request: GetItemRequest) -> Result<GetItemOutput, BoxError>;
}

#[async_trait]
impl<T: QueryExecutor + ?Sized> QueryExecutor for Arc<T> {
    async fn query(&self, request: QueryRequest) -> Result<QueryOutput, BoxError> {
        (**self).query(request).await
    }

    async fn get_item(&self, request: GetItemRequest) -> Result<GetItemOutput, BoxError> {
        (**self).get_item(request).await
    }
}
