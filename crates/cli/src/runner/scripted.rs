// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted fake process for deterministic supervisor tests.

use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

use super::{ProcessExit, ProcessRunner, ProcessSpec, SpawnedProcess};

/// Pipe capacity of a scripted process, per stream.
const PIPE_CAPACITY: usize = 64 * 1024;

/// One action of a scripted process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptStep {
    /// Write a line to stdout
    Stdout(String),
    /// Write a line to stderr
    Stderr(String),
    /// Pause before the next step
    Sleep(Duration),
}

/// A [`ProcessRunner`] whose "process" replays a fixed script.
///
/// Each spawn writes the steps in order to in-memory pipes, closes them and
/// exits with the configured code.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    steps: Vec<ScriptStep>,
    exit_code: i32,
    spawn_error: Option<String>,
    spawned: Arc<Mutex<Vec<ProcessSpec>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `line` to stdout
    pub fn stdout(mut self, line: impl Into<String>) -> Self {
        self.steps.push(ScriptStep::Stdout(line.into()));
        self
    }

    /// Write `line` to stderr
    pub fn stderr(mut self, line: impl Into<String>) -> Self {
        self.steps.push(ScriptStep::Stderr(line.into()));
        self
    }

    /// Pause for `duration`
    pub fn sleep(mut self, duration: Duration) -> Self {
        self.steps.push(ScriptStep::Sleep(duration));
        self
    }

    /// Exit with `code` after the last step (default 0)
    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Make every spawn fail with a not-found error carrying `message`
    pub fn fail_spawn(mut self, message: impl Into<String>) -> Self {
        self.spawn_error = Some(message.into());
        self
    }

    /// Specs passed to `spawn` so far
    pub fn spawned(&self) -> Vec<ProcessSpec> {
        self.spawned.lock().clone()
    }
}

impl ProcessRunner for ScriptedRunner {
    fn spawn(&self, spec: &ProcessSpec) -> io::Result<SpawnedProcess> {
        if let Some(ref message) = self.spawn_error {
            return Err(io::Error::new(io::ErrorKind::NotFound, message.clone()));
        }
        self.spawned.lock().push(spec.clone());

        let (stdout_writer, stdout_reader) = tokio::io::duplex(PIPE_CAPACITY);
        let (stderr_writer, stderr_reader) = tokio::io::duplex(PIPE_CAPACITY);
        let steps = self.steps.clone();
        let code = self.exit_code;

        let mut script = Script(tokio::spawn(play(steps, stdout_writer, stderr_writer)));

        Ok(SpawnedProcess {
            stdout: Box::new(stdout_reader),
            stderr: Box::new(stderr_reader),
            exit: Box::pin(async move {
                (&mut script.0).await.map_err(io::Error::other)?;
                Ok(ProcessExit { code: Some(code) })
            }),
            pid: None,
        })
    }
}

/// The running script. Dropping it stops the script and closes its pipes,
/// the scripted counterpart of killing a process.
struct Script(JoinHandle<()>);

impl Drop for Script {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Play the script. Stops early once the reading side goes away.
async fn play(steps: Vec<ScriptStep>, mut stdout: DuplexStream, mut stderr: DuplexStream) {
    for step in steps {
        let written = match step {
            ScriptStep::Stdout(line) => write_line(&mut stdout, &line).await,
            ScriptStep::Stderr(line) => write_line(&mut stderr, &line).await,
            ScriptStep::Sleep(duration) => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
        };
        if written.is_err() {
            break;
        }
    }
}

async fn write_line(pipe: &mut DuplexStream, line: &str) -> io::Result<()> {
    pipe.write_all(line.as_bytes()).await?;
    pipe.write_all(b"\n").await?;
    pipe.flush().await
}

#[cfg(test)]
#[path = "scripted_tests.rs"]
mod tests;
