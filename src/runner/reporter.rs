//! Run reporting
//!
//! The runner never logs directly. It holds a [`RunReporter`] and calls it at each step, so the default
//! [`LogReporter`] can be swapped for a recording reporter in tests or a different output format.

use std::path::Path;

use super::{NotebookOutcome, RunSummary};

/// Trait for reporting notebook run progress.
pub trait RunReporter {
    /// Called before discovery begins
    fn on_run_start(&mut self, _root: &Path) {}

    /// Called once discovery and filtering are done
    fn on_collection_complete(&mut self, _included: usize, _excluded: usize) {}

    /// Called for every excluded notebook, in discovery order
    fn on_notebook_skipped(&mut self, _path: &Path) {}

    /// Called right before a notebook executes
    fn on_notebook_start(&mut self, path: &Path);

    /// Called when a notebook finished, successfully or not
    fn on_notebook_complete(&mut self, path: &Path, outcome: &NotebookOutcome);

    /// Called after the last notebook, or after the failure that aborted the run
    fn on_run_complete(&mut self, summary: &RunSummary);
}

/// Reporter that writes `LEVEL:message` lines through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl LogReporter {
    pub fn new() -> Self {
        Self
    }
}

impl RunReporter for LogReporter {
    fn on_run_start(&mut self, root: &Path) {
        tracing::info!("Running notebook tests...");
        tracing::debug!("Notebook root: {}", root.display());
    }

    fn on_collection_complete(&mut self, included: usize, excluded: usize) {
        if included == 0 {
            tracing::warn!("No notebooks to test");
        }
        tracing::debug!("Collected {} notebook(s), {} excluded", included, excluded);
    }

    fn on_notebook_skipped(&mut self, path: &Path) {
        tracing::debug!("Skipping excluded notebook: {}", path.display());
    }

    fn on_notebook_start(&mut self, path: &Path) {
        tracing::info!("Testing notebook: {}", path.display());
    }

    fn on_notebook_complete(&mut self, path: &Path, outcome: &NotebookOutcome) {
        match outcome {
            NotebookOutcome::Passed(duration, report) => {
                tracing::debug!(
                    "Notebook passed: {} ({} cell(s) in {:.2}s)",
                    path.display(),
                    report.cells_executed,
                    duration.as_secs_f64()
                );
                if !report.kernel_output.trim().is_empty() {
                    tracing::debug!("Kernel output:\n{}", report.kernel_output.trim_end());
                }
            }
            NotebookOutcome::Failed(_, error) => {
                tracing::error!("Error executing the notebook {}", path.display());
                tracing::error!("{}", error);
                if let Some(detail) = error.detail() {
                    tracing::error!("{}", detail);
                }
            }
        }
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        tracing::info!("{}", summary);
    }
}
