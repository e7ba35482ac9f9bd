// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive subprocess supervisor with an out-of-band confirmation gate.
//!
//! Runs command-line tools (steamcmd and friends) that may stop mid-run to
//! wait for a two-factor approval performed somewhere else, such as a phone
//! app. The supervisor spots the wait in the tool's output, opens a request
//! on a [`ConfirmationGate`], and resumes once an operator resolves it.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use warden::{ConfirmationGate, InteractiveSupervisor, ProcessSpec, TokioProcessRunner};
//!
//! # async fn demo() -> Result<(), warden::SupervisorError> {
//! let gate = ConfirmationGate::new();
//! let supervisor = InteractiveSupervisor::new(Arc::new(TokioProcessRunner::new()), gate.clone());
//! let spec = ProcessSpec::new("steamcmd").args(["+login", "deploy", "+quit"]);
//! let report = supervisor
//!     .run_interactive(&CancellationToken::new(), &spec, Some("server-1"))
//!     .await?;
//! println!("{} lines of output", report.stdout_lines);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod console;
pub mod detect;
pub mod env;
mod error;
pub mod observer;
pub mod reader;
pub mod runner;
pub mod supervisor;

pub use config::{ConfigError, SupervisorConfig};
pub use detect::{LineKind, PromptDetector};
pub use error::SupervisorError;
pub use observer::{CommandEvent, RecordingObserver, SupervisorObserver, TracingObserver};
pub use runner::{ProcessExit, ProcessRunner, ProcessSpec, ScriptedRunner, TokioProcessRunner};
pub use supervisor::{InteractiveSupervisor, RunReport};
pub use warden_gate::{ConfirmationGate, ConfirmationRequest, GateError, RequestId, RequestStatus};
