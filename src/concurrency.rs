//! Join barrier for concurrently dispatched generation calls.
//!
//! All branches are issued before the caller suspends and are polled on the
//! caller's task, so scheduling stays cooperative and single-threaded. Results
//! are slotted by submission index, never by completion order. The first failing
//! branch aborts the barrier: remaining siblings are dropped mid-flight and the
//! results that had already completed are handed back for diagnostics only.

use crate::error::{GenerationError, OrchestrationError, PartialResult};
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Why a join barrier did not produce a full result set
#[derive(Debug)]
pub struct JoinFailure<T> {
    /// Submission index of the failing (or first unfinished, when cancelled) branch
    pub index: usize,
    pub error: OrchestrationError,
    /// Branches that had completed, in submission order
    pub completed: Vec<(usize, T)>,
    /// Siblings dropped while still in flight
    pub abandoned: usize,
}

impl<T> JoinFailure<T> {
    /// Wrap as a batch error carrying rendered partial results
    pub fn into_batch_error<L, R>(self, label: L, render: R) -> OrchestrationError
    where
        L: Fn(usize) -> String,
        R: Fn(&T) -> String,
    {
        let partial = self
            .completed
            .iter()
            .map(|(index, value)| PartialResult {
                index: *index,
                label: label(*index),
                payload: render(value),
            })
            .collect();
        OrchestrationError::BatchFailed {
            index: self.index,
            label: label(self.index),
            partial,
            source: Box::new(self.error),
        }
    }
}

/// Run every branch concurrently and return their outputs in submission order.
pub async fn join_ordered<T, Fut>(
    branches: Vec<Fut>,
    cancel: &CancellationToken,
) -> Result<Vec<T>, JoinFailure<T>>
where
    Fut: Future<Output = Result<T, OrchestrationError>>,
{
    let total = branches.len();
    let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();
    let mut pending: FuturesUnordered<_> = branches
        .into_iter()
        .enumerate()
        .map(|(index, branch)| async move { (index, branch.await) })
        .collect();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            next = pending.next() => Some(next),
        };
        match next {
            Some(None) => break,
            Some(Some((index, Ok(value)))) => slots[index] = Some(value),
            Some(Some((index, Err(error)))) => {
                let abandoned = pending.len();
                drop(pending);
                warn!(index, abandoned, error = %error, "Join barrier aborted by failing branch");
                return Err(JoinFailure {
                    index,
                    error,
                    completed: completed_slots(slots),
                    abandoned,
                });
            }
            None => {
                let abandoned = pending.len();
                drop(pending);
                let index = slots.iter().position(Option::is_none).unwrap_or(0);
                warn!(abandoned, "Join barrier cancelled");
                return Err(JoinFailure {
                    index,
                    error: OrchestrationError::Generation(GenerationError::Cancelled),
                    completed: completed_slots(slots),
                    abandoned,
                });
            }
        }
    }

    Ok(slots.into_iter().flatten().collect())
}

fn completed_slots<T>(slots: Vec<Option<T>>) -> Vec<(usize, T)> {
    slots
        .into_iter()
        .enumerate()
        .filter_map(|(index, slot)| slot.map(|value| (index, value)))
        .collect()
}
