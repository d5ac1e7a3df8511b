//! Point lookups by primary key.

use std::collections::BTreeSet;
use std::sync::Arc;

use dynaquery_model::{Document, GetItemRequest, Value, codec};
use tracing::debug;

use crate::condition::MAX_KEY_CONDITIONS;
use crate::error::QueryError;
use crate::executor::QueryExecutor;
use crate::resolver::NameResolver;

/// Fetches a single item by its full primary key.
///
/// Like [`crate::QueryBuilder`], every configuring call returns a new value.
/// The attached executor is shared between copies.
#[derive(Debug, Clone, Default)]
pub struct ItemLookup {
    table: Option<String>,
    executor: Option<Arc<dyn QueryExecutor>>,
    key: Vec<(String, Value)>,
    projection: BTreeSet<String>,
    consistent: bool,
}

impl ItemLookup {
    /// An empty lookup.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with(&self, change: impl FnOnce(&mut Self)) -> Self {
        let mut next = self.clone();
        change(&mut next);
        next
    }

    /// Target table.
    #[must_use]
    pub fn table(&self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.with(|l| l.table = Some(name))
    }

    /// Executor used by [`ItemLookup::get`].
    #[must_use]
    pub fn executor(&self, executor: Arc<dyn QueryExecutor>) -> Self {
        self.with(|l| l.executor = Some(executor))
    }

    /// Add key attributes (equality only). At most two in total.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::TooManyKeyConditions` when the total would exceed
    /// two.
    pub fn key<K, V>(&self, pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self, QueryError>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let pairs: Vec<(String, Value)> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let count = self.key.len() + pairs.len();
        if count > MAX_KEY_CONDITIONS {
            return Err(QueryError::TooManyKeyConditions {
                max: MAX_KEY_CONDITIONS,
                count,
            });
        }
        Ok(self.with(|l| l.key.extend(pairs)))
    }

    /// Request only these attributes (adds to any earlier selection).
    #[must_use]
    pub fn attributes<S: Into<String>>(&self, names: impl IntoIterator<Item = S>) -> Self {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        self.with(|l| l.projection.extend(names))
    }

    /// Strongly consistent read.
    #[must_use]
    pub fn consistent(&self, consistent: bool) -> Self {
        self.with(|l| l.consistent = consistent)
    }

    /// Render the request. Key attribute names are used as is; only the
    /// projection goes through reserved-word aliasing.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::NoKeyCondition` when no key attribute is set.
    pub fn build(&self) -> Result<GetItemRequest, QueryError> {
        if self.key.is_empty() {
            return Err(QueryError::NoKeyCondition);
        }

        let mut resolver = NameResolver::new();
        let projection_expression = resolver.projection(&self.projection);

        Ok(GetItemRequest {
            table_name: self.table.clone(),
            key: self
                .key
                .iter()
                .map(|(name, value)| (name.clone(), codec::serialize(value)))
                .collect(),
            projection_expression,
            expression_attribute_names: resolver.alias_map(),
            consistent_read: self.consistent.then_some(true),
        })
    }

    /// Fetch with the attached executor. `consistent` overrides the
    /// configured read consistency for this call.
    ///
    /// # Errors
    ///
    /// Returns `NoTable` or `NoExecutor` when either is missing, plus the
    /// errors of [`ItemLookup::get_with`].
    pub async fn get(&self, consistent: Option<bool>) -> Result<Option<Document>, QueryError> {
        if self.table.is_none() {
            return Err(QueryError::NoTable);
        }
        let executor = self.executor.as_ref().ok_or(QueryError::NoExecutor)?;
        self.get_with(&**executor, consistent).await
    }

    /// Fetch with an explicit executor. A missing item is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `NoTable`, any [`ItemLookup::build`] error, and `Executor`
    /// wrapping whatever the executor reported.
    pub async fn get_with<E: QueryExecutor + ?Sized>(
        &self,
        executor: &E,
        consistent: Option<bool>,
    ) -> Result<Option<Document>, QueryError> {
        let Some(table) = self.table.as_deref() else {
            return Err(QueryError::NoTable);
        };
        let mut request = self.build()?;
        if let Some(consistent) = consistent {
            request.consistent_read = consistent.then_some(true);
        }

        debug!(table, consistent = ?request.consistent_read, "fetching item");
        let output = executor.get_item(request).await.map_err(QueryError::Executor)?;
        debug!(table, found = output.item.is_some(), "item lookup finished");
        Ok(output.item.map(codec::deserialize_item))
    }
}
