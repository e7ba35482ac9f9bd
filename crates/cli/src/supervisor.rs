// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive process supervision.
//!
//! [`InteractiveSupervisor::run_interactive`] starts a process, drains both
//! of its output streams, and when the output says the process is waiting
//! for a second factor, parks the run on the [`ConfirmationGate`] until an
//! operator resolves the request. The process keeps running the whole time;
//! only our reading of its output pauses.
//!
//! Task layout for one run:
//!
//! - two reader tasks (stdout, stderr) feeding one bounded channel,
//! - the coordination loop, on the caller's task, which also polls the
//!   process exit future.
//!
//! The exit future owns the process handle and never leaves the loop's
//! stack frame, so any early return kills the process before
//! `run_interactive` returns. The reader tasks are aborted on the same path.

use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use warden_gate::{ConfirmationGate, GateError, RequestId};

use crate::config::{ConfigError, SupervisorConfig, DEFAULT_CONFIRM_TIMEOUT_MS, DEFAULT_OUTPUT_BUFFER, DEFAULT_QUIET_PERIOD_MS};
use crate::detect::{PromptDetector, QuietPeriod};
use crate::error::SupervisorError;
use crate::observer::{CommandEvent, GuardedObserver, SupervisorObserver};
use crate::reader::{spawn_line_reader, OutputLine, Stream};
use crate::runner::{ProcessExit, ProcessRunner, ProcessSpec, SpawnedProcess};

/// Prompt text recorded when silence after the banner triggers a confirmation.
pub const QUIET_PROMPT_TEXT: &str =
    "No output since the tool started; it is probably waiting for a two-factor confirmation";

/// Reason recorded on the run's request when the caller cancels.
pub const CANCELLED_REASON: &str = "cancelled";

/// Summary of a successful run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub stdout_lines: usize,
    pub stderr_lines: usize,
    pub exit: ProcessExit,
    /// The confirmation request this run opened, if it needed one.
    pub confirmation: Option<RequestId>,
}

/// Runs external processes that may stop for an out-of-band confirmation.
pub struct InteractiveSupervisor {
    runner: Arc<dyn ProcessRunner>,
    gate: ConfirmationGate,
    detector: PromptDetector,
    observer: GuardedObserver,
    confirm_timeout: Duration,
    quiet_period: Option<Duration>,
    output_buffer: usize,
}

impl InteractiveSupervisor {
    /// Supervisor with the default detector, timeouts and a no-op observer.
    pub fn new(runner: Arc<dyn ProcessRunner>, gate: ConfirmationGate) -> Self {
        Self {
            runner,
            gate,
            detector: PromptDetector::default(),
            observer: GuardedObserver::default(),
            confirm_timeout: Duration::from_millis(DEFAULT_CONFIRM_TIMEOUT_MS),
            quiet_period: Some(Duration::from_millis(DEFAULT_QUIET_PERIOD_MS)),
            output_buffer: DEFAULT_OUTPUT_BUFFER,
        }
    }

    /// Supervisor tuned by `config`.
    pub fn from_config(
        runner: Arc<dyn ProcessRunner>,
        gate: ConfirmationGate,
        config: &SupervisorConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(runner, gate)
            .with_detector(PromptDetector::from_config(config)?)
            .with_confirm_timeout(config.confirm_timeout())
            .with_quiet_period(config.quiet_period())
            .with_output_buffer(config.output_buffer))
    }

    pub fn with_detector(mut self, detector: PromptDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SupervisorObserver>) -> Self {
        self.observer = GuardedObserver::new(observer);
        self
    }

    pub fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout = timeout;
        self
    }

    /// `None` disables the banner-then-silence heuristic.
    pub fn with_quiet_period(mut self, period: Option<Duration>) -> Self {
        self.quiet_period = period;
        self
    }

    pub fn with_output_buffer(mut self, capacity: usize) -> Self {
        self.output_buffer = capacity.max(1);
        self
    }

    /// The gate requests are opened on.
    pub fn gate(&self) -> &ConfirmationGate {
        &self.gate
    }

    /// Run `spec` to completion, pausing for confirmation when it asks for one.
    ///
    /// Returns once the process has exited and both output streams are fully
    /// drained. A run never succeeds while a request it opened is still
    /// pending.
    ///
    /// # Errors
    ///
    /// See [`SupervisorError`]. Cancelling `cancel` aborts the run with
    /// [`SupervisorError::Cancelled`] and kills the process.
    pub async fn run_interactive(
        &self,
        cancel: &CancellationToken,
        spec: &ProcessSpec,
        subject_id: Option<&str>,
    ) -> Result<RunReport, SupervisorError> {
        let mut event = CommandEvent {
            subject_id: subject_id.map(str::to_string),
            executable: spec.executable.clone(),
            args: spec.args.clone(),
            completed: false,
            success: false,
            error: None,
        };
        self.observer.command(&event);

        let result = self.supervise(cancel, spec, subject_id).await;

        event.completed = true;
        event.success = result.is_ok();
        event.error = result.as_ref().err().map(ToString::to_string);
        self.observer.command(&event);

        match &result {
            Ok(report) => tracing::info!(
                executable = %spec.executable,
                subject_id = ?subject_id,
                stdout_lines = report.stdout_lines,
                stderr_lines = report.stderr_lines,
                "supervised run finished"
            ),
            Err(e) => tracing::warn!(
                executable = %spec.executable,
                subject_id = ?subject_id,
                error = %e,
                "supervised run failed"
            ),
        }
        result
    }

    async fn supervise(
        &self,
        cancel: &CancellationToken,
        spec: &ProcessSpec,
        subject_id: Option<&str>,
    ) -> Result<RunReport, SupervisorError> {
        if cancel.is_cancelled() {
            return Err(SupervisorError::Cancelled);
        }

        let SpawnedProcess {
            stdout,
            stderr,
            exit,
            pid,
        } = self
            .runner
            .spawn(spec)
            .map_err(|source| SupervisorError::StartFailure {
                executable: spec.executable.clone(),
                source,
            })?;
        tracing::info!(executable = %spec.executable, pid = ?pid, subject_id = ?subject_id, "supervising process");

        let (line_tx, mut lines) = mpsc::channel(self.output_buffer);
        let _readers = AbortOnDrop(vec![
            spawn_line_reader(stdout, Stream::Stdout, line_tx.clone()).abort_handle(),
            spawn_line_reader(stderr, Stream::Stderr, line_tx).abort_handle(),
        ]);
        // Dropped on every return below; dropping it kills the process.
        let mut process = exit;

        let mut run = RunState::new(self.quiet_period);
        let mut readers_open = true;
        let mut exit: Option<io::Result<ProcessExit>> = None;

        while readers_open || exit.is_none() {
            let quiet_deadline = run.quiet.deadline();

            tokio::select! {
                biased;

                () = cancel.cancelled() => return Err(SupervisorError::Cancelled),

                line = lines.recv(), if readers_open => match line {
                    Some(line) => self.handle_line(cancel, line, subject_id, &mut run).await?,
                    None => readers_open = false,
                },

                reported = &mut process, if exit.is_none() => exit = Some(reported),

                () = tokio::time::sleep_until(quiet_deadline.unwrap_or_else(Instant::now)),
                    if quiet_deadline.is_some() =>
                {
                    if run.quiet.take_if_due(Instant::now()) && run.confirmation.is_none() {
                        tracing::info!(subject_id = ?subject_id, "output went quiet after startup banner");
                        self.confirm(cancel, QUIET_PROMPT_TEXT, subject_id, &mut run).await?;
                    }
                }
            }
        }

        let exit = match exit {
            Some(Ok(exit)) => exit,
            Some(Err(e)) => return Err(SupervisorError::Wait(e)),
            None => {
                return Err(SupervisorError::Wait(io::Error::other(
                    "process exit was never reported",
                )))
            }
        };
        if !exit.success() {
            return Err(SupervisorError::ProcessExit { code: exit.code });
        }

        Ok(RunReport {
            stdout_lines: run.stdout_lines,
            stderr_lines: run.stderr_lines,
            exit,
            confirmation: run.confirmation,
        })
    }

    async fn handle_line(
        &self,
        cancel: &CancellationToken,
        line: OutputLine,
        subject_id: Option<&str>,
        run: &mut RunState,
    ) -> Result<(), SupervisorError> {
        match line.stream {
            Stream::Stdout => run.stdout_lines += 1,
            Stream::Stderr => run.stderr_lines += 1,
        }
        self.observer
            .output(subject_id, &line.text, line.stream.is_error());

        run.quiet
            .observe(Instant::now(), self.detector.is_banner(&line.text));

        if run.confirmation.is_none() && self.detector.is_prompt(&line.text) {
            tracing::info!(subject_id = ?subject_id, stream = %line.stream, prompt = %line.text, "confirmation prompt detected");
            self.confirm(cancel, &line.text, subject_id, run).await?;
        }
        Ok(())
    }

    /// Open a request and wait for it. Only returns `Ok` once it is Complete.
    async fn confirm(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
        subject_id: Option<&str>,
        run: &mut RunState,
    ) -> Result<(), SupervisorError> {
        run.quiet.disarm();
        let request = self.gate.create_request(prompt, subject_id);
        let id = request.id;
        run.confirmation = Some(id);

        let outcome = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                if let Err(e) = self.gate.error_request(&id, CANCELLED_REASON) {
                    tracing::debug!(request_id = %id, error = %e, "request withdrawn before cancellation");
                }
                return Err(SupervisorError::Cancelled);
            }

            outcome = self.gate.wait_for_completion(&id, self.confirm_timeout) => outcome,
        };

        match outcome {
            Ok(true) => {
                tracing::info!(request_id = %id, "confirmation received, resuming");
                Ok(())
            }
            Ok(false) => {
                let message = self
                    .gate
                    .get_request(&id)
                    .and_then(|r| r.error_message)
                    .unwrap_or_else(|| "rejected".to_string());
                Err(SupervisorError::ConfirmationDenied { id, message })
            }
            Err(GateError::Timeout { id, timeout }) => {
                Err(SupervisorError::ConfirmationTimeout { id, timeout })
            }
            Err(e) => Err(SupervisorError::Confirmation(e)),
        }
    }
}

impl std::fmt::Debug for InteractiveSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractiveSupervisor")
            .field("gate", &self.gate)
            .field("detector", &self.detector)
            .field("confirm_timeout", &self.confirm_timeout)
            .field("quiet_period", &self.quiet_period)
            .field("output_buffer", &self.output_buffer)
            .finish_non_exhaustive()
    }
}

/// Per-run bookkeeping owned by the coordination loop.
struct RunState {
    quiet: QuietPeriod,
    confirmation: Option<RequestId>,
    stdout_lines: usize,
    stderr_lines: usize,
}

impl RunState {
    fn new(quiet_period: Option<Duration>) -> Self {
        Self {
            quiet: QuietPeriod::new(quiet_period),
            confirmation: None,
            stdout_lines: 0,
            stderr_lines: 0,
        }
    }
}

/// Aborts the run's reader tasks on every exit path.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
