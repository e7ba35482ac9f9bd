// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Out-of-band confirmation gate.
//!
//! A supervised process that stops to wait for a second factor cannot be
//! unblocked through its own stdin. Instead the supervisor opens a
//! [`ConfirmationRequest`] here and waits on it, while an operator (HTTP
//! handler, console, ...) discovers the request and resolves it.
//!
//! The gate is an ordinary value: construct one with
//! [`ConfirmationGate::new`] and hand clones to every party that needs it.

pub mod clock;
mod error;
mod gate;
mod request;
mod signal;
pub mod sweep;

pub use clock::{Clock, ClockHandle, FakeClock, SystemClock};
pub use error::GateError;
pub use gate::{ConfirmationGate, TIMEOUT_REASON};
pub use request::{ConfirmationRequest, RequestId, RequestStatus};
pub use signal::{Signal, SignalWaiter};
pub use sweep::spawn_sweeper;
