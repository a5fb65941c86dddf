// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Apply one operation to many targets and keep every failure.

use std::future::Future;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use staydesk_core::StaydeskError;

/// Aggregate outcome class of a fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutOutcome {
    Complete,
    Partial,
    Failed,
}

/// Per-target results in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FanoutResult<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<(T, String)>,
}

impl<T> FanoutResult<T> {
    pub fn outcome(&self) -> FanoutOutcome {
        match (self.succeeded.is_empty(), self.failed.is_empty()) {
            (_, true) => FanoutOutcome::Complete,
            (false, false) => FanoutOutcome::Partial,
            (true, false) => FanoutOutcome::Failed,
        }
    }
}

/// Run `op` for every target with at most `concurrency` in flight.
///
/// Results keep the input order regardless of completion order. An empty
/// target list is rejected.
pub async fn fanout<T, F, Fut>(
    targets: Vec<T>,
    concurrency: usize,
    op: F,
) -> Result<FanoutResult<T>, StaydeskError>
where
    T: Clone,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<(), StaydeskError>>,
{
    if targets.is_empty() {
        return Err(StaydeskError::Validation(
            "at least one target is required".into(),
        ));
    }

    let results: Vec<(T, Result<(), StaydeskError>)> = stream::iter(targets)
        .map(|target| {
            let fut = op(target.clone());
            async move { (target, fut.await) }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut out = FanoutResult {
        succeeded: Vec::new(),
        failed: Vec::new(),
    };
    for (target, result) in results {
        match result {
            Ok(()) => out.succeeded.push(target),
            Err(e) => out.failed.push((target, e.to_string())),
        }
    }
    Ok(out)
}
