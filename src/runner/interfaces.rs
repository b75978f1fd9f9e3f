//! Notebook runner I/O boundary interfaces
//!
//! The runner only orchestrates: discovery, filtering and ordering happen in `runner`, while actually executing a
//! notebook is delegated to a [`NotebookExecutor`]. The default executor is [`crate::kernel::PythonKernel`]; tests
//! substitute recording or failing executors.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Diagnostic;
use nbcheck_format::{FormatError, Notebook};
use thiserror::Error;

/// Errors that fail a single notebook
#[derive(Debug, Error, Diagnostic)]
pub enum ExecutionError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Format(#[from] FormatError),

    #[error("failed to resolve notebook path {path}")]
    #[diagnostic(code(nbcheck::resolve))]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cell {cell} raised {ename}: {evalue}")]
    #[diagnostic(code(nbcheck::cell))]
    CellFailed {
        cell: usize,
        ename: String,
        evalue: String,
        traceback: Vec<String>,
    },

    #[error("execution exceeded the {budget:?} time budget{}", at_cell(.cell))]
    #[diagnostic(code(nbcheck::timeout), help("raise --timeout or --cell-timeout if the notebook is just slow"))]
    Timeout { budget: Duration, cell: Option<usize> },

    #[error("failed to start kernel `{program}`")]
    #[diagnostic(code(nbcheck::kernel::spawn), help("install Python 3 or point --python at an interpreter"))]
    KernelSpawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("kernel exited before the notebook finished ({status})")]
    #[diagnostic(code(nbcheck::kernel::died))]
    KernelDied { status: String, stderr: String },

    #[error("kernel protocol error: {0}")]
    #[diagnostic(code(nbcheck::kernel::protocol))]
    Protocol(String),

    #[error("I/O error talking to the kernel")]
    #[diagnostic(code(nbcheck::kernel::io))]
    Io(#[from] io::Error),
}

fn at_cell(cell: &Option<usize>) -> String {
    match cell {
        Some(index) => format!(" in cell {index}"),
        None => String::new(),
    }
}

impl ExecutionError {
    /// Multi-line detail worth showing next to the one-line message, if any.
    pub fn detail(&self) -> Option<String> {
        match self {
            ExecutionError::CellFailed { traceback, .. } if !traceback.is_empty() => {
                Some(traceback.concat().trim_end().to_string())
            }
            ExecutionError::KernelDied { stderr, .. } if !stderr.trim().is_empty() => {
                Some(tail_lines(stderr, KERNEL_DIED_TAIL_LINES))
            }
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutionError::Timeout { .. })
    }
}

/// How much interpreter stderr to keep when a kernel dies.
const KERNEL_DIED_TAIL_LINES: usize = 20;

fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}

/// What a successful notebook execution produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Number of code cells sent to the kernel
    pub cells_executed: usize,
    /// Interpreter stdout/stderr, merged
    pub kernel_output: String,
}

// ============================================================================
// Notebook Executor Interface
// ============================================================================

/// Execute a parsed notebook and surface the first cell failure.
///
/// Implementations must start from a fresh interpreter context for every call and use `working_dir` as the
/// current directory so relative paths inside the notebook resolve next to it.
pub trait NotebookExecutor {
    fn execute(&mut self, notebook: &Notebook, working_dir: &Path) -> Result<ExecutionReport, ExecutionError>;
}

impl<E: NotebookExecutor + ?Sized> NotebookExecutor for &mut E {
    fn execute(&mut self, notebook: &Notebook, working_dir: &Path) -> Result<ExecutionReport, ExecutionError> {
        (**self).execute(notebook, working_dir)
    }
}
