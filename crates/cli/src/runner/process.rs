// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Live process runner on `tokio::process`.

use std::io;
use std::process::Stdio;
use tokio::process::Command;

use super::{ProcessExit, ProcessRunner, ProcessSpec, SpawnedProcess};

/// Runs real OS processes.
///
/// Children get a null stdin and are killed when their exit future is dropped.
#[derive(Clone, Debug, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for TokioProcessRunner {
    fn spawn(&self, spec: &ProcessSpec) -> io::Result<SpawnedProcess> {
        let mut cmd = Command::new(&spec.executable);
        cmd.args(&spec.args);

        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = spec.cwd {
            cmd.current_dir(cwd);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;

        // Returning early drops the child, which kills it.
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("stderr not captured"))?;
        let pid = child.id();

        tracing::debug!(executable = %spec.executable, pid = ?pid, "process spawned");

        Ok(SpawnedProcess {
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
            exit: Box::pin(async move {
                let status = child.wait().await?;
                Ok(ProcessExit::from(status))
            }),
            pid,
        })
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
