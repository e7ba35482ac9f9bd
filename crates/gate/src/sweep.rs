// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic reclamation of stale confirmation requests.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::gate::ConfirmationGate;

/// Spawn a task that sweeps `gate` every `interval`, removing requests older
/// than `max_age`, until `cancel` fires.
///
/// The first sweep happens one full interval after spawning.
pub fn spawn_sweeper(
    gate: ConfirmationGate,
    interval: Duration,
    max_age: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let interval = interval.max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    gate.cleanup_older_than(max_age);
                }
            }
        }
        tracing::debug!("confirmation sweeper stopped");
    })
}

#[cfg(test)]
#[path = "sweep_tests.rs"]
mod tests;
