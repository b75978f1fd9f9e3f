//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use crate::config::RunnerConfig;
use crate::kernel::PythonKernel;
use crate::runner::{LogReporter, NotebookExecutor, NotebookRunner, RunError, RunReporter};

use super::{CliError, CliResult, ExitCode};

/// Discover, filter and execute every notebook under the configured root.
pub fn test_notebooks(config: RunnerConfig) -> CliResult<ExitCode> {
    let kernel = PythonKernel::from_config(&config)
        .map_err(|e| CliError::failure(format!("Error: failed to start async runtime: {e}")))?;
    run_with(config, kernel, LogReporter::new())
}

/// Run with an explicit executor and reporter.
pub fn run_with<E: NotebookExecutor, R: RunReporter>(
    config: RunnerConfig,
    executor: E,
    reporter: R,
) -> CliResult<ExitCode> {
    let mut runner = NotebookRunner::new(config, executor, reporter);
    match runner.run() {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(err) => Err(run_error_to_cli(err)),
    }
}

/// Print the run plan: every discovered notebook, marked `run` or `skip`.
pub fn list_notebooks(config: &RunnerConfig) -> CliResult<ExitCode> {
    let plan = crate::runner::plan(config).map_err(run_error_to_cli)?;
    for planned in &plan {
        let marker = if planned.excluded { "skip" } else { "run " };
        println!("{} {}", marker, planned.path.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn run_error_to_cli(err: RunError) -> CliError {
    match err {
        // Notebook failures and the summary were already logged by the reporter
        RunError::Notebook { .. } | RunError::Batch { .. } => CliError::new("", ExitCode::FAILURE),
        other => CliError::failure(format!("{:?}", miette::Report::new(other))),
    }
}
