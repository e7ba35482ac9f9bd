// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor configuration loaded from TOML.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::env;

/// Phrases that mean the tool is blocked on a second factor.
pub const DEFAULT_PROMPT_KEYWORDS: &[&str] = &[
    "steam guard",
    "two-factor",
    "two factor",
    "mobile authenticator",
    "steam mobile app",
    "confirm the login",
    "confirm this login",
    "guard code",
    "authenticator code",
    "waiting for confirmation",
];

/// Lines printed once the tool has started talking to its backend.
pub const DEFAULT_BANNER_KEYWORDS: &[&str] = &[
    "logging in user",
    "steam console client",
    "connecting anonymously",
];

/// Default silence after a banner before it counts as a prompt (15s)
pub const DEFAULT_QUIET_PERIOD_MS: u64 = 15_000;
/// Default wait for an operator confirmation (5 minutes)
pub const DEFAULT_CONFIRM_TIMEOUT_MS: u64 = 300_000;
/// Default capacity of the merged output channel
pub const DEFAULT_OUTPUT_BUFFER: usize = 256;
/// Default age after which requests are swept (1 hour)
pub const DEFAULT_REQUEST_MAX_AGE_MS: u64 = 3_600_000;
/// Default sweep interval (1 minute)
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 60_000;

fn default_prompt_keywords() -> Vec<String> {
    DEFAULT_PROMPT_KEYWORDS.iter().map(|s| s.to_string()).collect()
}

fn default_banner_keywords() -> Vec<String> {
    DEFAULT_BANNER_KEYWORDS.iter().map(|s| s.to_string()).collect()
}

fn default_quiet_period_ms() -> u64 {
    DEFAULT_QUIET_PERIOD_MS
}

fn default_confirm_timeout_ms() -> u64 {
    DEFAULT_CONFIRM_TIMEOUT_MS
}

fn default_output_buffer() -> usize {
    DEFAULT_OUTPUT_BUFFER
}

fn default_request_max_age_ms() -> u64 {
    DEFAULT_REQUEST_MAX_AGE_MS
}

fn default_sweep_interval_ms() -> u64 {
    DEFAULT_SWEEP_INTERVAL_MS
}

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid regex pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Tuning for prompt detection, confirmation waits and request lifetime
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SupervisorConfig {
    /// Case-insensitive substrings that mark a line as a confirmation prompt
    #[serde(default = "default_prompt_keywords")]
    pub prompt_keywords: Vec<String>,

    /// Regexes (matched against the lower-cased line) that also mark a prompt
    #[serde(default)]
    pub prompt_patterns: Vec<String>,

    /// Case-insensitive substrings that mark the tool's startup banner
    #[serde(default = "default_banner_keywords")]
    pub banner_keywords: Vec<String>,

    /// Silence after a banner that counts as an implicit prompt. 0 disables it.
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,

    /// How long a run waits for an operator before giving up
    #[serde(default = "default_confirm_timeout_ms")]
    pub confirm_timeout_ms: u64,

    /// Capacity of the channel merging stdout and stderr lines
    #[serde(default = "default_output_buffer")]
    pub output_buffer: usize,

    /// Requests older than this are removed by the sweeper
    #[serde(default = "default_request_max_age_ms")]
    pub request_max_age_ms: u64,

    /// How often the sweeper runs
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            prompt_keywords: default_prompt_keywords(),
            prompt_patterns: Vec::new(),
            banner_keywords: default_banner_keywords(),
            quiet_period_ms: DEFAULT_QUIET_PERIOD_MS,
            confirm_timeout_ms: DEFAULT_CONFIRM_TIMEOUT_MS,
            output_buffer: DEFAULT_OUTPUT_BUFFER,
            request_max_age_ms: DEFAULT_REQUEST_MAX_AGE_MS,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
        }
    }
}

impl SupervisorConfig {
    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML content
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `WARDEN_CONFIG` if set, otherwise defaults; then apply env overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match env::config_path() {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override timing fields from `WARDEN_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        if let Some(ms) = env::confirm_timeout_ms() {
            self.confirm_timeout_ms = ms;
        }
        if let Some(ms) = env::quiet_period_ms() {
            self.quiet_period_ms = ms;
        }
    }

    /// Check field constraints that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output_buffer == 0 {
            return Err(ConfigError::Validation(
                "output_buffer must be at least 1".to_string(),
            ));
        }
        if self.confirm_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "confirm_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.prompt_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "prompt_keywords must not contain empty entries".to_string(),
            ));
        }
        for pattern in &self.prompt_patterns {
            regex::Regex::new(pattern)?;
        }
        Ok(())
    }

    /// The quiet-period threshold, or `None` when the heuristic is disabled
    pub fn quiet_period(&self) -> Option<Duration> {
        (self.quiet_period_ms > 0).then(|| Duration::from_millis(self.quiet_period_ms))
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }

    pub fn request_max_age(&self) -> Duration {
        Duration::from_millis(self.request_max_age_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
