// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line interface.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::{ConfigError, SupervisorConfig};
use crate::runner::ProcessSpec;

/// Run a command that may stop for an out-of-band two-factor confirmation
#[derive(Parser, Debug)]
#[command(name = "warden", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command under supervision, serving the operator console on stdin
    Run(RunArgs),

    /// Classify lines read from stdin as prompts or banners
    Detect(DetectArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Supervisor TOML config (default: $WARDEN_CONFIG)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Identifier attached to the confirmation request (e.g. a server id)
    #[arg(long)]
    pub subject: Option<String>,

    /// Working directory for the command
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Extra environment for the command (can be specified multiple times)
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Override how long to wait for a confirmation
    #[arg(long, value_name = "MS")]
    pub confirm_timeout_ms: Option<u64>,

    /// Override the banner-then-silence threshold (0 disables it)
    #[arg(long, value_name = "MS")]
    pub quiet_period_ms: Option<u64>,

    /// Don't read operator commands from stdin
    #[arg(long)]
    pub no_console: bool,

    /// The command to run, followed by its arguments
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

impl RunArgs {
    /// Config file (or defaults), then `WARDEN_*` overrides, then flags.
    pub fn load_config(&self) -> Result<SupervisorConfig, ConfigError> {
        let mut config = resolve_config(self.config.as_deref())?;
        if let Some(ms) = self.confirm_timeout_ms {
            config.confirm_timeout_ms = ms;
        }
        if let Some(ms) = self.quiet_period_ms {
            config.quiet_period_ms = ms;
        }
        config.validate()?;
        Ok(config)
    }

    /// The process to supervise.
    pub fn process_spec(&self) -> ProcessSpec {
        let (executable, args) = match self.command.split_first() {
            Some((executable, args)) => (executable.as_str(), args),
            None => ("", &[][..]),
        };
        let mut spec = ProcessSpec::new(executable).args(args.iter().cloned());
        if let Some(ref cwd) = self.cwd {
            spec = spec.cwd(cwd.clone());
        }
        for (key, value) in &self.env {
            spec = spec.env(key.clone(), value.clone());
        }
        spec
    }
}

#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Supervisor TOML config (default: $WARDEN_CONFIG)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl DetectArgs {
    pub fn load_config(&self) -> Result<SupervisorConfig, ConfigError> {
        resolve_config(self.config.as_deref())
    }
}

/// `--config` wins over `WARDEN_CONFIG`. Env overrides apply either way.
fn resolve_config(path: Option<&Path>) -> Result<SupervisorConfig, ConfigError> {
    match path {
        Some(path) => {
            let mut config = SupervisorConfig::load(path)?;
            config.apply_env_overrides();
            Ok(config)
        }
        None => SupervisorConfig::from_env(),
    }
}

fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
