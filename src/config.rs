//! Runner configuration
//!
//! Defaults reproduce the workshop harness: the `workshop` tree, a ten minute budget per notebook, the
//! `python3` interpreter, and exercises excluded.

use std::path::PathBuf;
use std::time::Duration;

/// Default root scanned for `<session>/<notebook>.ipynb`.
pub const DEFAULT_ROOT: &str = "workshop";

/// Default wall-clock budget for one notebook.
pub const DEFAULT_NOTEBOOK_TIMEOUT: Duration = Duration::from_secs(600);

/// Default interpreter used to host the kernel driver.
pub const DEFAULT_PYTHON: &str = "python3";

/// Default case-insensitive exclusion pattern.
pub const DEFAULT_EXCLUDE: &str = "exercise";

/// Configuration for a single notebook test run
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Directory holding one subdirectory per session
    pub root: PathBuf,
    /// Wall-clock budget for a whole notebook
    pub notebook_timeout: Duration,
    /// Optional budget for any single cell
    pub cell_timeout: Option<Duration>,
    /// Interpreter program that runs the kernel driver
    pub python: String,
    /// Lowercase substrings; a notebook whose path contains any of them is never executed
    pub exclude: Vec<String>,
    /// Stop at the first failing notebook
    pub fail_fast: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            notebook_timeout: DEFAULT_NOTEBOOK_TIMEOUT,
            cell_timeout: None,
            python: DEFAULT_PYTHON.to_string(),
            exclude: vec![DEFAULT_EXCLUDE.to_string()],
            fail_fast: true,
        }
    }
}

impl RunnerConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root directory
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Set the per-notebook timeout
    pub fn with_notebook_timeout(mut self, timeout: Duration) -> Self {
        self.notebook_timeout = timeout;
        self
    }

    /// Set the per-cell timeout
    pub fn with_cell_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.cell_timeout = timeout;
        self
    }

    /// Set the interpreter program
    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    /// Replace the exclusion patterns. Patterns are lowercased so matching stays case-insensitive.
    pub fn with_exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclude = patterns.into_iter().map(|p| p.as_ref().to_lowercase()).collect();
        self
    }

    /// Keep executing after a failure and decide pass/fail at the end
    pub fn with_keep_going(mut self, keep_going: bool) -> Self {
        self.fail_fast = !keep_going;
        self
    }
}
