// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! warden binary entry point.

use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use warden::cli::{Cli, Command, DetectArgs, RunArgs};
use warden::console::run_console;
use warden::observer::{CommandEvent, SupervisorObserver, TracingObserver};
use warden::{env, ConfirmationGate, InteractiveSupervisor, PromptDetector, TokioProcessRunner};
use warden_gate::spawn_sweeper;

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let code = match cli.command {
        Command::Run(args) => run(args).await,
        Command::Detect(args) => detect(args).await,
    };

    // Exit without dropping the runtime; a blocked stdin read would hold it open.
    std::process::exit(code);
}

fn init_tracing() {
    let filter = EnvFilter::try_new(env::log_filter_or_default())
        .unwrap_or_else(|_| EnvFilter::new(env::DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: RunArgs) -> i32 {
    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("warden: {}", e);
            return 1;
        }
    };

    let gate = ConfirmationGate::new();
    let supervisor = match InteractiveSupervisor::from_config(
        Arc::new(TokioProcessRunner::new()),
        gate.clone(),
        &config,
    ) {
        Ok(supervisor) => supervisor.with_observer(Arc::new(EchoObserver)),
        Err(e) => {
            eprintln!("warden: {}", e);
            return 1;
        }
    };

    let cancel = CancellationToken::new();
    let background = cancel.child_token();
    let _sweeper = spawn_sweeper(
        gate.clone(),
        config.sweep_interval(),
        config.request_max_age(),
        background.clone(),
    );

    if !args.no_console {
        let gate = gate.clone();
        let background = background.clone();
        tokio::spawn(async move {
            let stdin = BufReader::new(tokio::io::stdin());
            if let Err(e) = run_console(&gate, stdin, tokio::io::stderr(), &background).await {
                tracing::warn!(error = %e, "operator console stopped");
            }
        });
    }

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted, cancelling run");
                cancel.cancel();
            }
        });
    }

    let spec = args.process_spec();
    let result = supervisor
        .run_interactive(&cancel, &spec, args.subject.as_deref())
        .await;
    background.cancel();

    match result {
        Ok(_) => 0,
        Err(e) => {
            eprintln!("warden: {}", e);
            e.exit_code()
        }
    }
}

async fn detect(args: DetectArgs) -> i32 {
    let detector = match args
        .load_config()
        .and_then(|config| PromptDetector::from_config(&config))
    {
        Ok(detector) => detector,
        Err(e) => {
            eprintln!("warden: {}", e);
            return 1;
        }
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if writeln!(std::io::stdout(), "{}\t{}", detector.classify(&line), line).is_err() {
                    return 1;
                }
            }
            Ok(None) => return 0,
            Err(e) => {
                eprintln!("warden: failed to read stdin: {}", e);
                return 1;
            }
        }
    }
}

/// Echoes child output to our own streams and logs lifecycle events.
struct EchoObserver;

impl SupervisorObserver for EchoObserver {
    fn on_output(&self, _subject_id: Option<&str>, line: &str, is_error: bool) {
        if is_error {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }

    fn on_command(&self, event: &CommandEvent) {
        TracingObserver.on_command(event);
    }
}
