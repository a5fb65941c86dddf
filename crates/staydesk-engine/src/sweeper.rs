// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic sweep task.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::scheduler::Scheduler;

/// Sweep due messages every `interval` until `cancel` fires.
///
/// The first sweep runs immediately so records that fell due while the
/// process was down go out on startup. A sweep that overruns the interval
/// delays the next one instead of stacking them.
pub async fn run_sweeper(scheduler: Arc<Scheduler>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(interval_secs = interval.as_secs(), "sweeper started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match scheduler.sweep(Utc::now()).await {
                    Ok(report) if report.due == 0 => debug!("nothing due"),
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "sweep failed (non-fatal)"),
                }
            }
            _ = cancel.cancelled() => {
                info!("sweeper shutting down");
                break;
            }
        }
    }
}
