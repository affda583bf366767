use crate::error::BillingResult;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

/// Runs `worker` over `items`, at most `limit` at a time.
///
/// A worker that has started always runs to completion: a failure only stops
/// workers that have not started yet. Results come back in input order and the
/// first failure in that order is returned once every started worker is done.
pub(crate) async fn run_to_completion<I, F, Fut, T>(items: I, limit: usize, worker: F) -> BillingResult<Vec<T>>
where
    I: IntoIterator,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = BillingResult<T>>,
{
    let halted = AtomicBool::new(false);
    let halted = &halted;

    let mut results: Vec<(usize, BillingResult<T>)> = stream::iter(items.into_iter().enumerate())
        .map(|(index, item)| {
            let work = worker(item);
            async move {
                if halted.load(Ordering::Acquire) {
                    return None;
                }
                let result = work.await;
                if result.is_err() {
                    halted.store(true, Ordering::Release);
                }
                Some((index, result))
            }
        })
        .buffer_unordered(limit.max(1))
        .filter_map(|outcome| async move { outcome })
        .collect()
        .await;

    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, result)| result).collect()
}
