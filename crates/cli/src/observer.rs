// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Side-channel callbacks for live output and command lifecycle.
//!
//! Callbacks run synchronously on the supervisor's coordination loop, so
//! implementations must return quickly. A panicking observer is caught and
//! logged; it never takes the run down with it.

use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Lifecycle notification for a supervised command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEvent {
    pub subject_id: Option<String>,
    pub executable: String,
    pub args: Vec<String>,
    /// False when the command starts, true when the run is over.
    pub completed: bool,
    pub success: bool,
    pub error: Option<String>,
}

/// Receives supervisor events. Every method defaults to a no-op.
pub trait SupervisorObserver: Send + Sync {
    /// A line of process output.
    fn on_output(&self, _subject_id: Option<&str>, _line: &str, _is_error: bool) {}

    /// The command started or finished.
    fn on_command(&self, _event: &CommandEvent) {}
}

/// Observer that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl SupervisorObserver for NoopObserver {}

/// Observer that forwards events to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl SupervisorObserver for TracingObserver {
    fn on_output(&self, subject_id: Option<&str>, line: &str, is_error: bool) {
        if is_error {
            tracing::debug!(subject_id = ?subject_id, stream = "stderr", "{}", line);
        } else {
            tracing::debug!(subject_id = ?subject_id, stream = "stdout", "{}", line);
        }
    }

    fn on_command(&self, event: &CommandEvent) {
        if !event.completed {
            tracing::info!(
                subject_id = ?event.subject_id,
                executable = %event.executable,
                args = ?event.args,
                "command started"
            );
        } else if event.success {
            tracing::info!(subject_id = ?event.subject_id, executable = %event.executable, "command succeeded");
        } else {
            tracing::warn!(
                subject_id = ?event.subject_id,
                executable = %event.executable,
                error = ?event.error,
                "command failed"
            );
        }
    }
}

/// A recorded `on_output` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedOutput {
    pub subject_id: Option<String>,
    pub line: String,
    pub is_error: bool,
}

/// Observer that keeps every event in memory, for assertions.
#[derive(Clone, Debug, Default)]
pub struct RecordingObserver {
    outputs: Arc<Mutex<Vec<RecordedOutput>>>,
    commands: Arc<Mutex<Vec<CommandEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outputs(&self) -> Vec<RecordedOutput> {
        self.outputs.lock().clone()
    }

    pub fn commands(&self) -> Vec<CommandEvent> {
        self.commands.lock().clone()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.lock().len()
    }
}

impl SupervisorObserver for RecordingObserver {
    fn on_output(&self, subject_id: Option<&str>, line: &str, is_error: bool) {
        self.outputs.lock().push(RecordedOutput {
            subject_id: subject_id.map(str::to_string),
            line: line.to_string(),
            is_error,
        });
    }

    fn on_command(&self, event: &CommandEvent) {
        self.commands.lock().push(event.clone());
    }
}

/// Wraps an observer so its panics stay contained.
#[derive(Clone)]
pub(crate) struct GuardedObserver {
    inner: Arc<dyn SupervisorObserver>,
}

impl GuardedObserver {
    pub(crate) fn new(inner: Arc<dyn SupervisorObserver>) -> Self {
        Self { inner }
    }

    pub(crate) fn output(&self, subject_id: Option<&str>, line: &str, is_error: bool) {
        let result = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_output(subject_id, line, is_error)
        }));
        if result.is_err() {
            tracing::error!(subject_id = ?subject_id, "observer panicked in on_output");
        }
    }

    pub(crate) fn command(&self, event: &CommandEvent) {
        let result = catch_unwind(AssertUnwindSafe(|| self.inner.on_command(event)));
        if result.is_err() {
            tracing::error!(subject_id = ?event.subject_id, "observer panicked in on_command");
        }
    }
}

impl Default for GuardedObserver {
    fn default() -> Self {
        Self::new(Arc::new(NoopObserver))
    }
}

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;
