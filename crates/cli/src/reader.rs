// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-stream line readers feeding one merged channel.

use std::fmt;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Which pipe a line came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    pub fn is_error(self) -> bool {
        matches!(self, Self::Stderr)
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// One line of process output, without its line terminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: Stream,
    pub text: String,
}

/// Spawn a task that splits `reader` into lines and sends them to `tx`.
///
/// The task ends at end of stream, on a read error (logged, not returned),
/// or when the receiving side is gone. Its sender is dropped on every path,
/// so the receiver sees the channel close once all readers are finished.
/// Resolves to the number of lines forwarded.
pub fn spawn_line_reader<R>(
    reader: R,
    stream: Stream,
    tx: mpsc::Sender<OutputLine>,
) -> JoinHandle<usize>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let mut forwarded = 0;

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = OutputLine {
                        stream,
                        text: decode_line(&buf),
                    };
                    if tx.send(line).await.is_err() {
                        break;
                    }
                    forwarded += 1;
                }
                Err(e) => {
                    tracing::warn!(%stream, error = %e, "failed to read process output");
                    break;
                }
            }
        }

        tracing::trace!(%stream, lines = forwarded, "output reader finished");
        forwarded
    })
}

/// Strip the line terminator and decode lossily. Tools emit whatever bytes they like.
fn decode_line(raw: &[u8]) -> String {
    let mut end = raw.len();
    while end > 0 && matches!(raw[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
