// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Confirmation request records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque handle for a confirmation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Allocate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Where a request is in its lifecycle.
///
/// `Pending` is the only non-terminal state. A request leaves it exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Complete,
    Error,
}

impl RequestStatus {
    /// Whether the request has been resolved.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Complete => "complete",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Snapshot of a confirmation request, safe to hand to display code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub id: RequestId,
    pub status: RequestStatus,
    /// The output line (or synthetic message) that triggered the request.
    pub prompt_text: String,
    /// Correlation key for the managed instance this request concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    pub requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Set only when `status` is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ConfirmationRequest {
    pub(crate) fn pending(
        prompt_text: String,
        subject_id: Option<String>,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RequestId::new(),
            status: RequestStatus::Pending,
            prompt_text,
            subject_id,
            requested_at,
            resolved_at: None,
            error_message: None,
        }
    }

    /// Whether the request is still waiting for a resolution.
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
