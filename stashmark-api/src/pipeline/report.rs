use std::fmt::Display;

use stashmark_types::{BatchReport, BatchStatus, ItemResult, Operation};

/// What the caller sent for one item, echoed back in its result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemKey {
    pub id: Option<i32>,
    pub url: Option<String>,
}

impl ItemKey {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            id: None,
            url: Some(url.into()),
        }
    }

    pub fn id(id: i32) -> Self {
        Self {
            id: Some(id),
            url: None,
        }
    }
}

/// Zips input keys with their outcomes into a report. A successful outcome carries the id
/// of the affected bookmark, which fills in `id` when the key had none.
pub fn aggregate<E: Display>(
    operation: Operation,
    keys: Vec<ItemKey>,
    outcomes: Vec<Result<i32, E>>,
) -> BatchReport {
    debug_assert_eq!(keys.len(), outcomes.len());

    let items: Vec<ItemResult> = keys
        .into_iter()
        .zip(outcomes)
        .map(|(key, outcome)| match outcome {
            Ok(id) => ItemResult {
                success: true,
                id: Some(key.id.unwrap_or(id)),
                url: key.url,
                error: None,
            },
            Err(e) => ItemResult {
                success: false,
                id: key.id,
                url: key.url,
                error: Some(e.to_string()),
            },
        })
        .collect();

    let succeeded = items.iter().filter(|i| i.success).count();
    let failed = items.len() - succeeded;
    let (status, message) = summarize(operation, succeeded, failed);

    BatchReport {
        operation,
        items,
        succeeded,
        failed,
        status,
        message,
    }
}

pub fn summarize(operation: Operation, succeeded: usize, failed: usize) -> (BatchStatus, String) {
    let total = succeeded + failed;
    if failed == 0 {
        (BatchStatus::Success, format!("{succeeded}/{total} succeeded"))
    } else if succeeded == 0 {
        (BatchStatus::Failure, format!("{failed}/{total} failed"))
    } else {
        (
            BatchStatus::Partial,
            format!("{succeeded} {}, {failed} failed", operation.verb()),
        )
    }
}
