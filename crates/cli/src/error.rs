// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal errors of a supervised run.

use std::io;
use std::time::Duration;
use thiserror::Error;
use warden_gate::{GateError, RequestId};

/// Why [`run_interactive`](crate::supervisor::InteractiveSupervisor::run_interactive) failed.
///
/// Output stream read errors never show up here; readers log them and stop.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The process could not be started. Nothing was left running.
    #[error("failed to start '{executable}': {source}")]
    StartFailure {
        executable: String,
        #[source]
        source: io::Error,
    },

    /// Nobody confirmed in time. The request has been marked as failed.
    #[error("two-factor confirmation {id} timed out after {}ms", timeout.as_millis())]
    ConfirmationTimeout { id: RequestId, timeout: Duration },

    /// The operator (or the system) resolved the request as an error.
    #[error("two-factor confirmation {id} failed: {message}")]
    ConfirmationDenied { id: RequestId, message: String },

    /// Any other gate failure, e.g. the request was swept while waiting.
    #[error("two-factor confirmation failed: {0}")]
    Confirmation(#[from] GateError),

    /// The caller cancelled the run. The process was killed.
    #[error("run cancelled")]
    Cancelled,

    /// The process ran to completion but reported failure.
    #[error("process exited {}", exit_label(*code))]
    ProcessExit { code: Option<i32> },

    /// Waiting for the process to exit failed at the OS level.
    #[error("failed waiting for process exit: {0}")]
    Wait(#[source] io::Error),
}

impl SupervisorError {
    /// Whether the run failed at the confirmation gate.
    pub fn is_confirmation_failure(&self) -> bool {
        matches!(
            self,
            Self::ConfirmationTimeout { .. } | Self::ConfirmationDenied { .. } | Self::Confirmation(_)
        )
    }

    /// Process exit status for the `warden` binary.
    ///
    /// A failing child's own code passes through; confirmation failures are 3
    /// and cancellation is 130.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ProcessExit { code: Some(code) } if *code != 0 => *code,
            Self::Cancelled => 130,
            e if e.is_confirmation_failure() => 3,
            _ => 1,
        }
    }
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("with code {}", code),
        None => "without a code (killed by signal)".to_string(),
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
