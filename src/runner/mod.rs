//! Notebook test runner
//!
//! A run is a straight line: discover, filter, then execute each included notebook in path order. The first
//! failure aborts the batch unless the config asks to keep going, in which case the batch fails at the end.
//!
//! ## I/O Boundaries
//!
//! Executing a notebook goes through [`NotebookExecutor`] and progress goes through [`RunReporter`]. Both are held
//! by the runner rather than reached through globals, so tests drive the whole loop with in-memory doubles.

pub mod discovery;
pub mod interfaces;
pub mod reporter;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use miette::Diagnostic;
use nbcheck_format::read_notebook;
use thiserror::Error;

use crate::config::RunnerConfig;

pub use discovery::{discover_notebooks, is_excluded, is_exercise};
pub use interfaces::{ExecutionError, ExecutionReport, NotebookExecutor};
pub use reporter::{LogReporter, RunReporter};

/// Errors that end a run
#[derive(Debug, Error, Diagnostic)]
pub enum RunError {
    #[error("cannot read notebook root {}", .root.display())]
    #[diagnostic(code(nbcheck::discovery), help("pass --root or run from the directory that holds the notebooks"))]
    Discovery {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error executing the notebook {}", .path.display())]
    #[diagnostic(code(nbcheck::notebook))]
    Notebook {
        path: PathBuf,
        #[source]
        #[diagnostic_source]
        source: ExecutionError,
    },

    #[error("{} of {} notebook(s) failed", .summary.failed, .summary.executed())]
    #[diagnostic(code(nbcheck::batch))]
    Batch { summary: RunSummary },
}

/// Result of executing one notebook
#[derive(Debug)]
pub enum NotebookOutcome {
    Passed(Duration, ExecutionReport),
    Failed(Duration, ExecutionError),
}

impl NotebookOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, NotebookOutcome::Failed(..))
    }
}

/// A discovered notebook and whether the exclusion policy keeps it out of the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedNotebook {
    pub path: PathBuf,
    pub excluded: bool,
}

/// Summary of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Notebooks that failed, in execution order
    pub failures: Vec<PathBuf>,
    pub duration: Duration,
}

impl RunSummary {
    /// Notebooks that were actually executed.
    pub fn executed(&self) -> usize {
        self.passed + self.failed
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.passed > 0 {
            parts.push(format!("{} passed", self.passed));
        }
        if self.failed > 0 {
            parts.push(format!("{} failed", self.failed));
        }
        if self.skipped > 0 {
            parts.push(format!("{} skipped", self.skipped));
        }
        if parts.is_empty() {
            parts.push("no notebooks tested".to_string());
        }
        write!(f, "{} in {:.2}s", parts.join(", "), self.duration.as_secs_f64())
    }
}

/// Discover the notebooks under `config.root` and apply the exclusion policy, in run order.
pub fn plan(config: &RunnerConfig) -> Result<Vec<PlannedNotebook>, RunError> {
    let paths = discover_notebooks(&config.root).map_err(|source| RunError::Discovery {
        root: config.root.clone(),
        source,
    })?;

    Ok(paths
        .into_iter()
        .map(|path| {
            let excluded = is_excluded(&path, &config.exclude);
            PlannedNotebook { path, excluded }
        })
        .collect())
}

/// Runs every included notebook under a root directory.
pub struct NotebookRunner<E, R> {
    config: RunnerConfig,
    executor: E,
    reporter: R,
}

impl<E: NotebookExecutor, R: RunReporter> NotebookRunner<E, R> {
    pub fn new(config: RunnerConfig, executor: E, reporter: R) -> Self {
        Self {
            config,
            executor,
            reporter,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Discover and filter without executing anything.
    pub fn plan(&self) -> Result<Vec<PlannedNotebook>, RunError> {
        plan(&self.config)
    }

    /// Execute the run.
    ///
    /// Returns the summary when every included notebook passed. In fail-fast mode the first failure is returned
    /// as [`RunError::Notebook`] and nothing after it executes; otherwise all notebooks run and any failure
    /// yields [`RunError::Batch`].
    pub fn run(&mut self) -> Result<RunSummary, RunError> {
        let start_time = Instant::now();
        self.reporter.on_run_start(&self.config.root);

        let plan = self.plan()?;
        let excluded = plan.iter().filter(|p| p.excluded).count();
        self.reporter.on_collection_complete(plan.len() - excluded, excluded);

        let mut summary = RunSummary::default();

        for planned in plan {
            if planned.excluded {
                self.reporter.on_notebook_skipped(&planned.path);
                summary.skipped += 1;
                continue;
            }

            let started = Instant::now();
            let (path, result) = self.test_notebook(&planned.path);
            let elapsed = started.elapsed();

            let outcome = match result {
                Ok(report) => NotebookOutcome::Passed(elapsed, report),
                Err(error) => NotebookOutcome::Failed(elapsed, error),
            };
            self.reporter.on_notebook_complete(&path, &outcome);

            match outcome {
                NotebookOutcome::Passed(..) => summary.passed += 1,
                NotebookOutcome::Failed(_, source) => {
                    summary.failed += 1;
                    summary.failures.push(path.clone());

                    if self.config.fail_fast {
                        summary.duration = start_time.elapsed();
                        self.reporter.on_run_complete(&summary);
                        return Err(RunError::Notebook { path, source });
                    }
                }
            }
        }

        summary.duration = start_time.elapsed();
        self.reporter.on_run_complete(&summary);

        if summary.is_success() {
            Ok(summary)
        } else {
            Err(RunError::Batch { summary })
        }
    }

    /// Resolve, announce, parse and execute one notebook.
    ///
    /// Returns the path the notebook was announced under (its real path when it resolves).
    fn test_notebook(&mut self, path: &Path) -> (PathBuf, Result<ExecutionReport, ExecutionError>) {
        let real_path = match fs::canonicalize(path) {
            Ok(p) => p,
            Err(source) => {
                self.reporter.on_notebook_start(path);
                return (
                    path.to_path_buf(),
                    Err(ExecutionError::Resolve {
                        path: path.to_path_buf(),
                        source,
                    }),
                );
            }
        };

        self.reporter.on_notebook_start(&real_path);
        let result = self.execute_notebook(&real_path);
        (real_path, result)
    }

    fn execute_notebook(&mut self, path: &Path) -> Result<ExecutionReport, ExecutionError> {
        let notebook = read_notebook(path)?;
        tracing::debug!(
            "Parsed {} (nbformat {}, {} cell(s), kernel {})",
            path.display(),
            notebook.version,
            notebook.len(),
            notebook.metadata.kernel_name.as_deref().unwrap_or("unspecified")
        );
        let working_dir = path.parent().unwrap_or_else(|| Path::new("."));
        self.executor.execute(&notebook, working_dir)
    }
}
