// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! All runtime environment variables read by warden are defined here.
//! Use these accessors instead of calling `std::env::var()` directly.

/// Generated env var name constants.
mod names {
    include!(concat!(env!("OUT_DIR"), "/env_names.rs"));
}

// Re-export name constants for callers that need the raw name string.
pub use names::*;

use std::path::PathBuf;

/// `WARDEN_CONFIG`: Path to the supervisor TOML config.
pub fn config_path() -> Option<PathBuf> {
    std::env::var(names::WARDEN_CONFIG).ok().map(PathBuf::from)
}

/// `WARDEN_CONFIRM_TIMEOUT_MS`: How long to wait for an operator confirmation.
pub fn confirm_timeout_ms() -> Option<u64> {
    var_u64(names::WARDEN_CONFIRM_TIMEOUT_MS)
}

/// `WARDEN_QUIET_PERIOD_MS`: Silence after a banner that counts as a prompt.
pub fn quiet_period_ms() -> Option<u64> {
    var_u64(names::WARDEN_QUIET_PERIOD_MS)
}

/// Log filter used when `WARDEN_LOG` is unset or unparsable.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// `WARDEN_LOG`: Log filter directives (`tracing_subscriber::EnvFilter` syntax).
pub fn log_filter() -> Option<String> {
    std::env::var(names::WARDEN_LOG).ok()
}

/// `WARDEN_LOG`, or [`DEFAULT_LOG_FILTER`] when unset.
pub fn log_filter_or_default() -> String {
    log_filter().unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

fn var_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
