//! The fluent query builder.

use std::collections::{BTreeSet, HashMap};

use dynaquery_model::{Cursor, PaginationConfig, QueryRequest};
use futures::Stream;
use futures::stream;
use tracing::{debug, warn};

use crate::condition::{Condition, KeyCondition, MAX_KEY_CONDITIONS};
use crate::error::QueryError;
use crate::executor::QueryExecutor;
use crate::filter::{ExpressionCompiler, FilterCompiler, Predicate, merge_placeholders};
use crate::page::ResultPage;
use crate::params::Params;
use crate::resolver::NameResolver;

/// Order in which sort keys are read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ScanDirection {
    /// Ascending (the store default).
    #[default]
    Forward,
    /// Descending.
    Backward,
}

/// Accumulates a query description and renders it into a [`QueryRequest`].
///
/// Every configuring call returns a new builder and leaves the receiver
/// untouched, so a base query can be shared and specialised freely:
///
/// ```
/// use dynaquery_core::{KeyCondition, Params, QueryBuilder};
///
/// let base = QueryBuilder::new()
///     .table("TestTable")
///     .key([KeyCondition::eq("PK", "FluentAPITest")])
///     .unwrap();
/// let paged = base.page_size(10);
///
/// assert!(base.build(&Params::new(), None).unwrap().pagination_config.is_none());
/// assert!(paged.build(&Params::new(), None).unwrap().pagination_config.is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBuilder {
    table: Option<String>,
    index: Option<String>,
    key_conditions: Vec<Condition>,
    resolver: NameResolver,
    projection: BTreeSet<String>,
    filter: Option<Predicate>,
    page_size: Option<u32>,
    consistent: bool,
    direction: ScanDirection,
}

impl QueryBuilder {
    /// An empty builder.
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
        self.with(|q| q.table = Some(name))
    }

    /// Query a secondary index instead of the base table.
    #[must_use]
    pub fn index(&self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.with(|q| q.index = Some(name))
    }

    /// Add key conditions. At most two may be set in total, across calls.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::TooManyKeyConditions` when the total would exceed
    /// two.
    pub fn key(
        &self,
        conditions: impl IntoIterator<Item = KeyCondition>,
    ) -> Result<Self, QueryError> {
        let conditions: Vec<KeyCondition> = conditions.into_iter().collect();
        let count = self.key_conditions.len() + conditions.len();
        if count > MAX_KEY_CONDITIONS {
            return Err(QueryError::TooManyKeyConditions {
                max: MAX_KEY_CONDITIONS,
                count,
            });
        }

        Ok(self.with(|q| {
            for condition in conditions {
                let name = q.resolver.resolve(condition.attribute());
                q.key_conditions.push(condition.resolve(name));
            }
        }))
    }

    /// Request only these attributes (adds to any earlier selection).
    #[must_use]
    pub fn attributes<S: Into<String>>(&self, names: impl IntoIterator<Item = S>) -> Self {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        self.with(|q| q.projection.extend(names))
    }

    /// Filter the matched items. A second call is combined with the first
    /// using AND.
    #[must_use]
    pub fn filter(&self, predicate: Predicate) -> Self {
        self.with(|q| {
            q.filter = Some(match q.filter.take() {
                Some(existing) => existing & predicate,
                None => predicate,
            });
        })
    }

    /// Strongly consistent reads.
    #[must_use]
    pub fn consistent(&self, consistent: bool) -> Self {
        self.with(|q| q.consistent = consistent)
    }

    /// Items per page. Zero clears the page size.
    #[must_use]
    pub fn page_size(&self, size: u32) -> Self {
        self.with(|q| q.page_size = (size > 0).then_some(size))
    }

    /// Same as [`QueryBuilder::page_size`].
    #[must_use]
    pub fn limit(&self, size: u32) -> Self {
        self.page_size(size)
    }

    /// Ascending sort-key order.
    #[must_use]
    pub fn forward(&self) -> Self {
        self.with(|q| q.direction = ScanDirection::Forward)
    }

    /// Descending sort-key order.
    #[must_use]
    pub fn backward(&self) -> Self {
        self.with(|q| q.direction = ScanDirection::Backward)
    }

    /// Same as [`QueryBuilder::backward`].
    #[must_use]
    pub fn backwards(&self) -> Self {
        self.backward()
    }

    /// The target table, if set.
    #[must_use]
    pub fn table_name(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// The scan direction.
    #[must_use]
    pub fn direction(&self) -> ScanDirection {
        self.direction
    }

    /// Render the request with the default filter compiler.
    ///
    /// `cursor` resumes a paginated query; it is only carried when a page
    /// size is set.
    ///
    /// # Errors
    ///
    /// Returns `NoKeyCondition` without key conditions, and any rendering,
    /// template or placeholder error from the conditions and filter.
    pub fn build(&self, params: &Params, cursor: Option<&Cursor>) -> Result<QueryRequest, QueryError> {
        self.build_with(&ExpressionCompiler, params, cursor)
    }

    /// Render the request, compiling the filter with `compiler`.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::build`].
    pub fn build_with<C: FilterCompiler + ?Sized>(
        &self,
        compiler: &C,
        params: &Params,
        cursor: Option<&Cursor>,
    ) -> Result<QueryRequest, QueryError> {
        if self.key_conditions.is_empty() {
            return Err(QueryError::NoKeyCondition);
        }

        let mut expressions = Vec::with_capacity(self.key_conditions.len());
        let mut values = HashMap::new();
        for condition in &self.key_conditions {
            expressions.push(condition.render_expression()?);
            merge_placeholders(&mut values, condition.render_value_placeholders(params)?)?;
        }

        let mut resolver = self.resolver.clone();
        let projection_expression = resolver.projection(&self.projection);
        let mut names = resolver.alias_map();

        let filter_expression = match &self.filter {
            Some(predicate) => {
                let compiled = compiler.compile(predicate)?;
                merge_placeholders(&mut names, compiled.names)?;
                merge_placeholders(&mut values, compiled.values)?;
                Some(compiled.expression)
            }
            None => None,
        };

        let pagination_config = match self.page_size {
            Some(size) => Some(PaginationConfig {
                max_items: size,
                page_size: size,
                starting_token: cursor.cloned(),
            }),
            None => {
                if cursor.is_some() {
                    warn!("continuation cursor ignored: no page size set");
                }
                None
            }
        };

        Ok(QueryRequest {
            table_name: self.table.clone(),
            index_name: self.index.clone(),
            key_condition_expression: expressions.join(" AND "),
            filter_expression,
            projection_expression,
            expression_attribute_names: names,
            expression_attribute_values: values,
            consistent_read: self.consistent.then_some(true),
            scan_index_forward: (self.direction == ScanDirection::Backward).then_some(false),
            pagination_config,
        })
    }

    /// The built request as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Same as [`QueryBuilder::build`].
    pub fn preview(&self, params: &Params, cursor: Option<&Cursor>) -> Result<String, QueryError> {
        Ok(serde_json::to_string_pretty(&self.build(params, cursor)?)?)
    }

    /// Run the query and decode one page of results.
    ///
    /// # Errors
    ///
    /// Returns `NoTable` without a table, any [`QueryBuilder::build`] error,
    /// and `Executor` wrapping whatever the executor reported.
    pub async fn execute<E: QueryExecutor + ?Sized>(
        &self,
        executor: &E,
        params: &Params,
        cursor: Option<&Cursor>,
    ) -> Result<ResultPage, QueryError> {
        let Some(table) = self.table.as_deref() else {
            return Err(QueryError::NoTable);
        };
        let request = self.build(params, cursor)?;
        debug!(
            table,
            index = ?self.index,
            expression = %request.key_condition_expression,
            "executing query"
        );

        let output = executor.query(request).await.map_err(QueryError::Executor)?;
        let page = ResultPage::from(output);
        debug!(table, count = page.count, more = page.has_more(), "query page received");
        Ok(page)
    }

    /// Lazily run the query page after page, starting at `cursor`.
    ///
    /// The stream ends after the first page without a continuation cursor.
    /// Each page request is independent, so a cursor taken from any page can
    /// resume the sequence later, from another builder or process.
    pub fn execute_paginated<'a, E: QueryExecutor + ?Sized>(
        &'a self,
        executor: &'a E,
        params: &'a Params,
        cursor: Option<Cursor>,
    ) -> impl Stream<Item = Result<ResultPage, QueryError>> + Send + 'a {
        stream::try_unfold(Some(cursor), move |state| async move {
            let Some(cursor) = state else {
                return Ok(None);
            };
            let page = self.execute(executor, params, cursor.as_ref()).await?;
            let next = page.next_cursor.clone().map(Some);
            Ok(Some((page, next)))
        })
    }
}
