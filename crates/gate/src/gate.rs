// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Registry of confirmation requests and the wait/resolve protocol.

use chrono::TimeDelta;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, ClockHandle};
use crate::error::GateError;
use crate::request::{ConfirmationRequest, RequestId, RequestStatus};
use crate::signal::Signal;

/// Reason recorded on a request the gate resolves itself after a wait times out.
pub const TIMEOUT_REASON: &str = "timeout";

struct Entry {
    request: ConfirmationRequest,
    /// Creation order, for the pending view.
    seq: u64,
    signal: Signal,
}

#[derive(Default)]
struct Registry {
    entries: HashMap<RequestId, Entry>,
    next_seq: u64,
}

impl Registry {
    fn entry(&self, id: &RequestId) -> Result<&Entry, GateError> {
        self.entries.get(id).ok_or(GateError::NotFound(*id))
    }

    fn entry_mut(&mut self, id: &RequestId) -> Result<&mut Entry, GateError> {
        self.entries.get_mut(id).ok_or(GateError::NotFound(*id))
    }

    fn snapshot_where<F>(&self, pred: F) -> Vec<ConfirmationRequest>
    where
        F: Fn(&ConfirmationRequest) -> bool,
    {
        let mut matching: Vec<&Entry> = self
            .entries
            .values()
            .filter(|e| pred(&e.request))
            .collect();
        matching.sort_by_key(|e| e.seq);
        matching.into_iter().map(|e| e.request.clone()).collect()
    }
}

/// Registry of pending and resolved confirmation requests.
///
/// Cloning is cheap and every clone shares the same registry, so the
/// supervisor that waits and the operator surface that resolves can each
/// hold one.
///
/// All registry access goes through a single mutex which is never held
/// across an `.await`: [`wait_for_completion`](Self::wait_for_completion)
/// takes a waiter handle under the lock and waits after releasing it, so
/// resolution calls are never stalled by a waiting supervisor.
#[derive(Clone)]
pub struct ConfirmationGate {
    registry: Arc<Mutex<Registry>>,
    clock: ClockHandle,
}

impl ConfirmationGate {
    /// Create an empty gate using the system clock.
    pub fn new() -> Self {
        Self::with_clock(ClockHandle::system())
    }

    /// Create an empty gate reading timestamps from `clock`.
    pub fn with_clock(clock: ClockHandle) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            clock,
        }
    }

    /// Open a new pending request and return a snapshot of it.
    pub fn create_request(
        &self,
        prompt_text: impl Into<String>,
        subject_id: Option<&str>,
    ) -> ConfirmationRequest {
        let request = ConfirmationRequest::pending(
            prompt_text.into(),
            subject_id.map(str::to_string),
            self.clock.now_utc(),
        );

        let mut registry = self.registry.lock();
        let seq = registry.next_seq;
        registry.next_seq += 1;
        registry.entries.insert(
            request.id,
            Entry {
                request: request.clone(),
                seq,
                signal: Signal::new(),
            },
        );
        drop(registry);

        tracing::info!(
            request_id = %request.id,
            subject_id = ?request.subject_id,
            prompt = %request.prompt_text,
            "confirmation requested"
        );
        request
    }

    /// Look up a request by id.
    pub fn get_request(&self, id: &RequestId) -> Option<ConfirmationRequest> {
        self.registry
            .lock()
            .entries
            .get(id)
            .map(|e| e.request.clone())
    }

    /// All pending requests, oldest first.
    pub fn list_pending(&self) -> Vec<ConfirmationRequest> {
        self.registry.lock().snapshot_where(|r| r.is_pending())
    }

    /// Pending requests correlated with `subject_id`, oldest first.
    pub fn pending_for_subject(&self, subject_id: &str) -> Vec<ConfirmationRequest> {
        self.registry
            .lock()
            .snapshot_where(|r| r.is_pending() && r.subject_id.as_deref() == Some(subject_id))
    }

    /// Number of registered requests, resolved ones included.
    pub fn len(&self) -> usize {
        self.registry.lock().entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.registry.lock().entries.is_empty()
    }

    /// Mark a pending request as confirmed and wake its waiter.
    ///
    /// # Errors
    ///
    /// [`GateError::NotFound`] for an unknown id, [`GateError::InvalidState`]
    /// if the request was already resolved.
    pub fn complete_request(&self, id: &RequestId) -> Result<(), GateError> {
        let now = self.clock.now_utc();
        let mut registry = self.registry.lock();
        let entry = registry.entry_mut(id)?;
        if !entry.request.is_pending() {
            return Err(GateError::InvalidState {
                id: *id,
                status: entry.request.status,
            });
        }
        entry.request.status = RequestStatus::Complete;
        entry.request.resolved_at = Some(now);
        entry.signal.fire(true);
        drop(registry);

        tracing::info!(request_id = %id, "confirmation completed");
        Ok(())
    }

    /// Mark a request as failed with `message` and wake its waiter.
    ///
    /// Allowed from any state. On a request that is already resolved the
    /// record is overwritten, but a waiter keeps the outcome it was first
    /// signalled with.
    ///
    /// # Errors
    ///
    /// [`GateError::NotFound`] for an unknown id.
    pub fn error_request(&self, id: &RequestId, message: impl Into<String>) -> Result<(), GateError> {
        let message = message.into();
        let now = self.clock.now_utc();
        let mut registry = self.registry.lock();
        let entry = registry.entry_mut(id)?;
        let previous = entry.request.status;
        entry.request.status = RequestStatus::Error;
        entry.request.resolved_at = Some(now);
        entry.request.error_message = Some(message.clone());
        entry.signal.fire(false);
        drop(registry);

        if previous.is_terminal() {
            tracing::warn!(request_id = %id, %previous, reason = %message, "resolved confirmation marked as failed");
        } else {
            tracing::warn!(request_id = %id, reason = %message, "confirmation failed");
        }
        Ok(())
    }

    /// Resolve a timed-out wait. A resolver may have won the race between
    /// the timer and the lock, in which case its outcome stands.
    fn expire(&self, id: &RequestId, timeout: Duration) -> Result<bool, GateError> {
        let now = self.clock.now_utc();
        let mut registry = self.registry.lock();
        let entry = registry
            .entry_mut(id)
            .map_err(|_| GateError::Withdrawn(*id))?;

        match entry.request.status {
            RequestStatus::Complete => Ok(true),
            RequestStatus::Error => Ok(false),
            RequestStatus::Pending => {
                entry.request.status = RequestStatus::Error;
                entry.request.resolved_at = Some(now);
                entry.request.error_message = Some(TIMEOUT_REASON.to_string());
                entry.signal.fire(false);
                drop(registry);

                tracing::warn!(request_id = %id, timeout = ?timeout, "confirmation timed out");
                Err(GateError::Timeout { id: *id, timeout })
            }
        }
    }

    /// Wait until the request is resolved or `timeout` elapses.
    ///
    /// Returns `Ok(true)` if it was completed and `Ok(false)` if it was
    /// resolved as an error. When the timeout elapses first, the request is
    /// marked as Error with reason `"timeout"` so it never stays pending
    /// just because nobody answered.
    ///
    /// # Errors
    ///
    /// [`GateError::NotFound`] for an unknown id, [`GateError::Timeout`] when
    /// nothing resolved the request in time, and [`GateError::Withdrawn`] if
    /// the request was swept while pending.
    pub async fn wait_for_completion(
        &self,
        id: &RequestId,
        timeout: Duration,
    ) -> Result<bool, GateError> {
        let waiter = self.registry.lock().entry(id)?.signal.waiter();

        tracing::debug!(request_id = %id, timeout = ?timeout, "waiting for confirmation");
        match tokio::time::timeout(timeout, waiter.wait()).await {
            Ok(Some(confirmed)) => Ok(confirmed),
            Ok(None) => Err(GateError::Withdrawn(*id)),
            Err(_) => self.expire(id, timeout),
        }
    }

    /// Remove every request created more than `max_age` ago.
    ///
    /// Pending requests have their signal closed first so any task still
    /// waiting on them fails instead of hanging. Returns how many were removed.
    pub fn cleanup_older_than(&self, max_age: Duration) -> usize {
        let now = self.clock.now_utc();
        let Some(cutoff) = TimeDelta::from_std(max_age)
            .ok()
            .and_then(|age| now.checked_sub_signed(age))
        else {
            return 0;
        };

        let mut registry = self.registry.lock();
        let stale: Vec<RequestId> = registry
            .entries
            .iter()
            .filter(|(_, e)| e.request.requested_at < cutoff)
            .map(|(id, _)| *id)
            .collect();

        for id in &stale {
            if let Some(entry) = registry.entries.remove(id) {
                if entry.request.is_pending() {
                    tracing::warn!(request_id = %id, "withdrawing stale pending confirmation");
                    entry.signal.close();
                }
            }
        }
        drop(registry);

        if !stale.is_empty() {
            tracing::debug!(removed = stale.len(), "swept confirmation requests");
        }
        stale.len()
    }
}

impl Default for ConfirmationGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfirmationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationGate")
            .field("requests", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
