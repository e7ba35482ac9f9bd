// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented operator console over a [`ConfirmationGate`].
//!
//! One command per line, one JSON reply per line:
//!
//! ```text
//! list
//! show <id>
//! complete <id>
//! error <id> <message...>
//! help
//! quit
//! ```

use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use warden_gate::{ConfirmationGate, ConfirmationRequest, RequestId, RequestStatus};

/// Commands understood by the console.
pub const COMMANDS: &[&str] = &[
    "list",
    "show <id>",
    "complete <id>",
    "error <id> <message>",
    "help",
    "quit",
];

/// Errors from parsing a console line or talking to the console streams.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}' (try 'help')")]
    UnknownCommand(String),

    #[error("'{command}' needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("invalid request id '{0}'")]
    InvalidId(String),

    #[error("console io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode reply: {0}")]
    Json(#[from] serde_json::Error),
}

/// A parsed console line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    List,
    Show(RequestId),
    Complete(RequestId),
    Error { id: RequestId, message: String },
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = ConsoleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb.to_ascii_lowercase().as_str() {
            "" => Err(ConsoleError::Empty),
            "list" | "ls" => Ok(Self::List),
            "show" => Ok(Self::Show(parse_id("show", rest)?)),
            "complete" | "confirm" => Ok(Self::Complete(parse_id("complete", rest)?)),
            "error" | "reject" => {
                let (id, message) = match rest.split_once(char::is_whitespace) {
                    Some((id, message)) => (id, message.trim()),
                    None => (rest, ""),
                };
                let id = parse_id("error", id)?;
                if message.is_empty() {
                    return Err(ConsoleError::MissingArgument {
                        command: "error",
                        argument: "a message",
                    });
                }
                Ok(Self::Error {
                    id,
                    message: message.to_string(),
                })
            }
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(ConsoleError::UnknownCommand(other.to_string())),
        }
    }
}

fn parse_id(command: &'static str, raw: &str) -> Result<RequestId, ConsoleError> {
    if raw.is_empty() {
        return Err(ConsoleError::MissingArgument {
            command,
            argument: "a request id",
        });
    }
    raw.parse()
        .map_err(|_| ConsoleError::InvalidId(raw.to_string()))
}

/// JSON reply written for every console line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum ConsoleReply {
    Pending { requests: Vec<ConfirmationRequest> },
    Request { request: ConfirmationRequest },
    Resolved { id: RequestId, status: RequestStatus },
    Help { commands: Vec<&'static str> },
    Bye,
    Error { message: String },
}

/// Apply `command` to `gate` and describe the result.
pub fn execute(gate: &ConfirmationGate, command: ConsoleCommand) -> ConsoleReply {
    match command {
        ConsoleCommand::List => ConsoleReply::Pending {
            requests: gate.list_pending(),
        },
        ConsoleCommand::Show(id) => match gate.get_request(&id) {
            Some(request) => ConsoleReply::Request { request },
            None => ConsoleReply::Error {
                message: format!("confirmation request {} not found", id),
            },
        },
        ConsoleCommand::Complete(id) => resolved(id, gate.complete_request(&id), RequestStatus::Complete),
        ConsoleCommand::Error { id, message } => {
            resolved(id, gate.error_request(&id, message), RequestStatus::Error)
        }
        ConsoleCommand::Help => ConsoleReply::Help {
            commands: COMMANDS.to_vec(),
        },
        ConsoleCommand::Quit => ConsoleReply::Bye,
    }
}

fn resolved(
    id: RequestId,
    result: Result<(), warden_gate::GateError>,
    status: RequestStatus,
) -> ConsoleReply {
    match result {
        Ok(()) => ConsoleReply::Resolved { id, status },
        Err(e) => ConsoleReply::Error {
            message: e.to_string(),
        },
    }
}

/// Serve the console until end of input, `quit`, or cancellation.
///
/// Parse failures are answered with an error reply and do not end the
/// session. Returns the number of lines handled.
///
/// # Errors
///
/// Only stream failures end the console early.
pub async fn run_console<R, W>(
    gate: &ConfirmationGate,
    input: R,
    mut output: W,
    cancel: &CancellationToken,
) -> Result<usize, ConsoleError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut handled = 0;

    loop {
        let line = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        handled += 1;

        let reply = match line.parse::<ConsoleCommand>() {
            Ok(command) => {
                tracing::debug!(?command, "console command");
                execute(gate, command)
            }
            Err(e) => ConsoleReply::Error {
                message: e.to_string(),
            },
        };
        let done = reply == ConsoleReply::Bye;

        let mut encoded = serde_json::to_vec(&reply)?;
        encoded.push(b'\n');
        output.write_all(&encoded).await?;
        output.flush().await?;

        if done {
            break;
        }
    }

    tracing::debug!(handled, "operator console closed");
    Ok(handled)
}

#[cfg(test)]
#[path = "console_tests.rs"]
mod tests;
