use std::future::Future;

use futures::stream::{self, StreamExt, TryStreamExt};

/// Run `tasks` with at most `max_concurrent` of them in flight and return
/// their outputs in input order. `None` starts every task at once.
///
/// The first error is returned as soon as it is seen; tasks still pending at
/// that point are dropped and nothing already computed is handed back.
pub async fn run_all<I, Fut, T, E>(tasks: I, max_concurrent: Option<usize>) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<T, E>>,
{
    let tasks = tasks
        .into_iter()
        .enumerate()
        .map(|(i, task)| async move { task.await.map(|v| (i, v)) })
        .collect::<Vec<_>>();
    let limit = max_concurrent.unwrap_or(tasks.len()).max(1);

    let mut results = stream::iter(tasks)
        .buffer_unordered(limit)
        .try_collect::<Vec<_>>()
        .await?;
    results.sort_unstable_by_key(|(i, _)| *i);

    Ok(results.into_iter().map(|(_, v)| v).collect())
}
