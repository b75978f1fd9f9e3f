//! CLI module for nbcheck
//!
//! Running `nbcheck` with no arguments tests every notebook under `./workshop`. Flags only override the
//! defaults in [`crate::config::RunnerConfig`].
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;

use crate::config::{DEFAULT_NOTEBOOK_TIMEOUT, DEFAULT_PYTHON, DEFAULT_ROOT, RunnerConfig};
use crate::version::NBCHECK_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Execute workshop notebooks end-to-end and fail on the first broken cell
#[derive(Parser, Debug)]
#[command(name = "nbcheck")]
#[command(version = NBCHECK_VERSION)]
#[command(about = "Execute workshop notebooks end-to-end", long_about = None)]
pub struct Cli {
    /// Directory holding one subdirectory per session
    #[arg(long, value_name = "DIR", default_value = DEFAULT_ROOT)]
    pub root: PathBuf,

    /// Wall-clock budget per notebook, in seconds
    #[arg(long = "timeout", value_name = "SECS", default_value_t = DEFAULT_NOTEBOOK_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    /// Wall-clock budget per cell, in seconds
    #[arg(long = "cell-timeout", value_name = "SECS")]
    pub cell_timeout_secs: Option<u64>,

    /// Interpreter that hosts the kernel
    #[arg(long, value_name = "PROGRAM", default_value = DEFAULT_PYTHON)]
    pub python: String,

    /// Skip notebooks whose path contains PATTERN (case-insensitive, repeatable; replaces "exercise")
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Run every notebook and report all failures at the end
    #[arg(long)]
    pub keep_going: bool,

    /// List the notebooks that would run, without executing them
    #[arg(long)]
    pub list: bool,

    /// Log kernel output and skip decisions
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Fold the flags into a runner configuration.
    pub fn to_config(&self) -> RunnerConfig {
        let mut config = RunnerConfig::new()
            .with_root(self.root.clone())
            .with_notebook_timeout(Duration::from_secs(self.timeout_secs))
            .with_cell_timeout(self.cell_timeout_secs.map(Duration::from_secs))
            .with_python(self.python.clone())
            .with_keep_going(self.keep_going);
        if !self.exclude.is_empty() {
            config = config.with_exclude(&self.exclude);
        }
        config
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run(cli: Cli) {
    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
pub fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = cli.to_config();
    if cli.list {
        commands::list_notebooks(&config)
    } else {
        commands::test_notebooks(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
