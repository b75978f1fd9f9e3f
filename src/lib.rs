#![forbid(unsafe_code)]
//! nbcheck: execute workshop notebooks end-to-end
//!
//! Discovers `<session>/<notebook>.ipynb` files under a root directory, skips exercises, and replays every code
//! cell of the rest in a fresh Python interpreter. The first cell error fails the run.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod config;
pub mod kernel;
pub mod logging;
pub mod runner;
pub mod version;

pub use config::RunnerConfig;
pub use kernel::PythonKernel;
pub use runner::{NotebookRunner, RunError, RunSummary};

pub use nbcheck_format as format;
