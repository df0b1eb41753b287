// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Spacey - an interactive shell over the Spacey object model
//!
//! This is the main entry point for the spacey CLI/REPL.
//!
//! ## Features
//!
//! - Interactive REPL with highlighting, completion and history
//! - Async script loading with tokio
//! - Runtime options from a TOML file or `SPACEY_*` variables

mod repl;
mod shell;

use clap::Parser;
use owo_colors::OwoColorize;
use shell::Shell;
use spacey_object::RuntimeOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "spacey", version, about = "Explore the Spacey object model")]
struct Cli {
    /// Script of shell commands to run
    file: Option<PathBuf>,

    /// Run one shell command and exit
    #[arg(short, long, value_name = "COMMAND")]
    eval: Option<String>,

    /// Runtime options file (TOML)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Report rejected writes as errors
    #[arg(long)]
    strict: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

/// Main entry point - uses tokio runtime for async operations.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = match load_options(&cli) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(command) = &cli.eval {
        return run_eval(options, command);
    }
    match &cli.file {
        Some(path) => run_file(options, path).await,
        None => run_repl(options),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_options(cli: &Cli) -> Result<RuntimeOptions, spacey_object::ConfigError> {
    let mut options = match &cli.config {
        Some(path) => RuntimeOptions::load(path)?,
        None => {
            let mut options = RuntimeOptions::default();
            options.apply_env()?;
            options
        }
    };
    if cli.strict {
        options.strict = true;
    }
    Ok(options)
}

/// Start the interactive REPL
fn run_repl(options: RuntimeOptions) -> ExitCode {
    match repl::Repl::new(options) {
        Ok(mut repl) => {
            if let Err(e) = repl.run() {
                eprintln!("{}: {:?}", "REPL Error".red().bold(), e);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: Failed to initialize REPL: {:?}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Run a script of shell commands, stopping at the first error.
async fn run_file(options: RuntimeOptions, path: &Path) -> ExitCode {
    let source = match tokio::fs::read_to_string(path).await {
        Ok(source) => source,
        Err(e) => {
            eprintln!(
                "{}: cannot read '{}': {}",
                "Error".red().bold(),
                path.display().cyan(),
                e
            );
            return ExitCode::FAILURE;
        }
    };

    let mut shell = Shell::new(options);
    for (n, line) in source.lines().enumerate() {
        match shell.execute(line) {
            Ok(Some(out)) => println!("{}", out),
            Ok(None) => {}
            Err(e) => {
                eprintln!("{}:{}: {}", path.display(), n + 1, e.red());
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}

/// Run a single command from the command line.
fn run_eval(options: RuntimeOptions, command: &str) -> ExitCode {
    let mut shell = Shell::new(options);
    match shell.execute(command) {
        Ok(out) => {
            if let Some(out) = out {
                println!("{}", out);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e.red());
            ExitCode::FAILURE
        }
    }
}
