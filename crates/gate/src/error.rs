// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;
use thiserror::Error;

use crate::request::{RequestId, RequestStatus};

/// Errors returned by [`ConfirmationGate`](crate::ConfirmationGate) operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GateError {
    /// No request with this id is registered (never created, or swept).
    #[error("confirmation request {0} not found")]
    NotFound(RequestId),

    /// The request is already resolved; re-fetch it to see the outcome.
    #[error("confirmation request {id} is already {status}")]
    InvalidState {
        /// The request that was targeted.
        id: RequestId,
        /// Its status at the time of the call.
        status: RequestStatus,
    },

    /// Nobody resolved the request in time. The gate has marked it as Error.
    #[error("confirmation request {id} timed out after {}ms", timeout.as_millis())]
    Timeout {
        /// The request that timed out.
        id: RequestId,
        /// How long the waiter waited.
        timeout: Duration,
    },

    /// The request was removed while still pending, closing its signal.
    #[error("confirmation request {0} was withdrawn before it was resolved")]
    Withdrawn(RequestId),
}
