//! Python kernel executor
//!
//! [`PythonKernel`] executes notebooks by replaying their code cells in a fresh interpreter subprocess per
//! notebook. The interpreter runs a small embedded driver that speaks line-delimited JSON over stdin/stdout and
//! reports each cell's success or exception. When IPython is importable the driver runs cells through an
//! `InteractiveShell`, so magics and `!` escapes behave as they do in Jupyter.
//!
//! Execution is synchronous from the runner's point of view. Internally the kernel owns a current-thread tokio
//! runtime to multiplex child pipes with timers.

pub mod protocol;
pub mod session;

use std::io;
use std::path::Path;
use std::time::Duration;

use nbcheck_format::Notebook;
use tokio::runtime::{Builder, Runtime};

use crate::config::RunnerConfig;
use crate::runner::{ExecutionError, ExecutionReport, NotebookExecutor};

pub use session::SessionOptions;

/// Executes notebooks in a Python interpreter subprocess.
pub struct PythonKernel {
    program: String,
    notebook_timeout: Duration,
    cell_timeout: Option<Duration>,
    runtime: Runtime,
}

impl PythonKernel {
    pub fn new(program: impl Into<String>, notebook_timeout: Duration, cell_timeout: Option<Duration>) -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            program: program.into(),
            notebook_timeout,
            cell_timeout,
            runtime,
        })
    }

    pub fn from_config(config: &RunnerConfig) -> io::Result<Self> {
        Self::new(config.python.clone(), config.notebook_timeout, config.cell_timeout)
    }
}

impl NotebookExecutor for PythonKernel {
    fn execute(&mut self, notebook: &Notebook, working_dir: &Path) -> Result<ExecutionReport, ExecutionError> {
        let working_dir = if working_dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            working_dir
        };

        if let Some(language) = notebook.metadata.language.as_deref() {
            if !language.eq_ignore_ascii_case("python") {
                tracing::warn!("Notebook declares language {}; executing it with {} anyway", language, self.program);
            }
        }

        let options = SessionOptions {
            program: &self.program,
            working_dir,
            notebook_timeout: self.notebook_timeout,
            cell_timeout: self.cell_timeout,
        };
        self.runtime.block_on(session::run_notebook(&options, notebook))
    }
}
