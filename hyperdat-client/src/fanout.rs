// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! Join barrier for sibling operations.

use std::fmt::Display;
use std::future::Future;

use futures::StreamExt as _;
use futures::stream::FuturesUnordered;
use tracing::debug;

/// Drive every future to completion, concurrently.
///
/// Returns the outputs in input order, or the first error in completion
/// order. A failure does not cancel the remaining futures: they keep running
/// until they finish, and their own errors are dropped.
pub async fn join_all<I, F, T, E>(operations: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut pending: FuturesUnordered<_> = operations
        .into_iter()
        .enumerate()
        .map(|(index, operation)| async move { (index, operation.await) })
        .collect();
    let mut outputs: Vec<Option<T>> = (0..pending.len()).map(|_| None).collect();
    let mut first_error = None;

    while let Some((index, result)) = pending.next().await {
        match result {
            Ok(output) => outputs[index] = Some(output),
            Err(e) if first_error.is_none() => first_error = Some(e),
            Err(e) => debug!(error = %e, "sibling failed after the aggregate already failed"),
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(outputs.into_iter().flatten().collect()),
    }
}
