// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! One-slot completion signal owned by each request entry.
//!
//! The slot starts empty and is written at most once. Writing into a full
//! slot is a no-op. Closing an empty slot wakes every waiter with `None`.

use tokio::sync::watch;

/// Write side of the completion signal. Lives inside the registry entry.
#[derive(Debug)]
pub struct Signal {
    tx: watch::Sender<Option<bool>>,
}

impl Signal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Fill the slot with `value`. Returns false if it was already filled.
    ///
    /// Never blocks, with or without waiters.
    pub fn fire(&self, value: bool) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
            true
        })
    }

    /// The value the slot was filled with, if any.
    pub fn value(&self) -> Option<bool> {
        *self.tx.borrow()
    }

    /// A handle that can await the slot without borrowing the signal.
    pub fn waiter(&self) -> SignalWaiter {
        SignalWaiter {
            rx: self.tx.subscribe(),
        }
    }

    /// Drop the write side. Waiters on an empty slot resolve to `None`.
    pub fn close(self) {
        drop(self.tx);
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of a [`Signal`].
#[derive(Debug)]
pub struct SignalWaiter {
    rx: watch::Receiver<Option<bool>>,
}

impl SignalWaiter {
    /// Wait until the slot is filled.
    ///
    /// Returns `None` if the signal was closed while still empty.
    pub async fn wait(mut self) -> Option<bool> {
        let value = match self.rx.wait_for(Option::is_some).await {
            Ok(slot) => *slot,
            Err(_) => None,
        };
        value
    }
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
