//! Bounded fan-out/gather over independent sub-tasks.
//!
//! Stages that decompose into many per-item calls against a rate-limited
//! external resource run them through [`gather_bounded`]: at most `limit`
//! items are in flight at once, results come back in input order, and one
//! item's failure never aborts its siblings.

use futures::stream::{self, StreamExt};
use std::future::Future;

/// Runs `f` over every item with at most `limit` futures in flight.
///
/// Returns one result per input item, in input order, regardless of
/// completion order. The call resolves only once every item has resolved;
/// a failed item contributes its error marker and nothing else.
pub async fn gather_bounded<I, F, Fut, T, E>(items: I, limit: usize, f: F) -> Vec<Result<T, E>>
where
    I: IntoIterator,
    F: Fn(usize, I::Item) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let limit = limit.max(1);
    stream::iter(
        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| f(index, item)),
    )
    .buffered(limit)
    .collect()
    .await
}
