// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Process runner boundary.
//!
//! The supervisor never builds OS processes itself. It asks a
//! [`ProcessRunner`] for a [`SpawnedProcess`]: two output streams and a
//! future that resolves when the process exits. Dropping that future must
//! terminate the process.

mod process;
mod scripted;

pub use process::TokioProcessRunner;
pub use scripted::{ScriptStep, ScriptedRunner};

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use tokio::io::AsyncRead;

/// What to run: argv, working directory and extra environment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessSpec {
    pub executable: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl ProcessSpec {
    /// Create a spec for `executable` with no arguments
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            ..Self::default()
        }
    }

    /// Append arguments
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Add an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// How a process ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, `None` if the process was killed by a signal.
    pub code: Option<i32>,
}

impl ProcessExit {
    pub fn success(self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ProcessExit {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// One piped output stream of a spawned process.
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// Resolves when the process exits. Dropping it kills the process.
pub type ExitFuture = Pin<Box<dyn Future<Output = io::Result<ProcessExit>> + Send>>;

/// A running process handed to the supervisor.
pub struct SpawnedProcess {
    pub stdout: OutputStream,
    pub stderr: OutputStream,
    pub exit: ExitFuture,
    pub pid: Option<u32>,
}

impl std::fmt::Debug for SpawnedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnedProcess")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

/// Starts processes for the supervisor.
pub trait ProcessRunner: Send + Sync {
    /// Start `spec` with stdout and stderr piped.
    fn spawn(&self, spec: &ProcessSpec) -> io::Result<SpawnedProcess>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
