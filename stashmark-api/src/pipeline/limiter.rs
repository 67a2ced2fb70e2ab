use std::future::Future;

use futures::stream::{self, StreamExt};

use crate::utils::PipelineError;

/// Snapshot handed to the progress callback after every finished item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
}

/// Runs `task` over `items` with at most `concurrency` futures in flight.
///
/// All futures are polled on the calling task. A freed slot is refilled with the next
/// pending item right away, so completion order is arbitrary, but the returned outcomes
/// line up with `items` one to one. Item failures are returned as `Err` entries and do
/// not stop the batch.
pub async fn run_bounded<I, T, E, F, Fut, P>(
    items: Vec<I>,
    concurrency: usize,
    task: F,
    mut on_progress: P,
) -> Result<Vec<Result<T, E>>, PipelineError>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(Progress),
{
    if concurrency == 0 {
        return Err(PipelineError::ZeroConcurrency);
    }

    let total = items.len();
    let mut slots: Vec<Option<Result<T, E>>> = (0..total).map(|_| None).collect();
    let mut progress = Progress {
        completed: 0,
        succeeded: 0,
        failed: 0,
        total,
    };

    let mut finished = stream::iter(items.into_iter().enumerate())
        .map(|(index, item)| {
            let fut = task(item);
            async move { (index, fut.await) }
        })
        .buffer_unordered(concurrency);

    while let Some((index, outcome)) = finished.next().await {
        progress.completed += 1;
        if outcome.is_ok() {
            progress.succeeded += 1;
        } else {
            progress.failed += 1;
        }
        slots[index] = Some(outcome);
        on_progress(progress);
    }

    Ok(slots.into_iter().flatten().collect())
}
