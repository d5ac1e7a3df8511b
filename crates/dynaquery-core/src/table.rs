//! A named table with an optional executor attached.

use std::sync::Arc;

use dynaquery_model::{Cursor, Value};

use crate::error::QueryError;
use crate::executor::QueryExecutor;
use crate::item::ItemLookup;
use crate::page::ResultPage;
use crate::params::Params;
use crate::query::QueryBuilder;

/// Entry point binding builders to a table name and, optionally, an executor.
///
/// Clones share the executor.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    executor: Option<Arc<dyn QueryExecutor>>,
}

impl Table {
    /// A table without an executor.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            executor: None,
        }
    }

    /// Attach an executor.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn QueryExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// The table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The attached executor, if any.
    #[must_use]
    pub fn executor(&self) -> Option<&Arc<dyn QueryExecutor>> {
        self.executor.as_ref()
    }

    /// A query builder targeting this table.
    #[must_use]
    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::new().table(self.name.as_str())
    }

    /// A point lookup on this table for the given key attributes.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::TooManyKeyConditions` for more than two pairs.
    pub fn item<K, V>(&self, key: impl IntoIterator<Item = (K, V)>) -> Result<ItemLookup, QueryError>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let lookup = ItemLookup::new().table(self.name.as_str());
        let lookup = match &self.executor {
            Some(executor) => lookup.executor(Arc::clone(executor)),
            None => lookup,
        };
        lookup.key(key)
    }

    /// Run `query` with the attached executor.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::NoExecutor` when none is attached, plus the errors
    /// of [`QueryBuilder::execute`].
    pub async fn execute(
        &self,
        query: &QueryBuilder,
        params: &Params,
        cursor: Option<&Cursor>,
    ) -> Result<ResultPage, QueryError> {
        let executor = self.executor.as_ref().ok_or(QueryError::NoExecutor)?;
        query.execute(&**executor, params, cursor).await
    }
}
