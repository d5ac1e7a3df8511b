//! Page-draining driver shared by executors.

use std::future::Future;

use dynaquery_model::{Cursor, Item, PaginationConfig, QueryOutput, RawPage};
use tracing::trace;

use crate::error::BoxError;

/// Assemble a [`QueryOutput`] from raw store pages.
///
/// `fetch(limit, exclusive_start_key)` issues one store request. Without a
/// pagination config every page is drained and no cursor is returned. With
/// one, fetching starts at the decoded starting token and stops once
/// `max_items` items are collected (the cursor then encodes the store's last
/// evaluated key) or the store reports no further key.
///
/// # Errors
///
/// Propagates `fetch` failures and starting tokens that do not decode.
pub async fn collect_pages<F, Fut>(
    config: Option<&PaginationConfig>,
    mut fetch: F,
) -> Result<QueryOutput, BoxError>
where
    F: FnMut(Option<usize>, Option<Item>) -> Fut,
    Fut: Future<Output = Result<RawPage, BoxError>>,
{
    let Some(config) = config else {
        let mut items = Vec::new();
        let mut start = None;
        loop {
            let page = fetch(None, start.take()).await?;
            trace!(count = page.items.len(), "drained page");
            items.extend(page.items);
            match page.last_evaluated_key {
                Some(key) => start = Some(key),
                None => break,
            }
        }
        return Ok(QueryOutput {
            items,
            next_token: None,
        });
    };

    let max_items = config.max_items as usize;
    let page_size = config.page_size.max(1) as usize;
    let mut start = config
        .starting_token
        .as_ref()
        .map(Cursor::to_key)
        .transpose()?;
    let mut items = Vec::new();

    while items.len() < max_items {
        let limit = page_size.min(max_items - items.len());
        let page = fetch(Some(limit), start.take()).await?;
        trace!(count = page.items.len(), limit, "fetched page");
        items.extend(page.items);

        let Some(key) = page.last_evaluated_key else {
            return Ok(QueryOutput {
                items,
                next_token: None,
            });
        };
        start = Some(key);
    }

    let next_token = start.as_ref().map(Cursor::from_key).transpose()?;
    Ok(QueryOutput { items, next_token })
}
