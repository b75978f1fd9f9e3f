//! Notebook document model and nbformat parsing for nbcheck.
//!
//! This crate turns a notebook file on disk into an ordered list of [`Cell`]s. It knows nothing about
//! executing code; the runner and kernel in the `nbcheck` crate consume the parsed [`Notebook`].
//!
//! ## Notes
//! - nbformat 4 documents (any minor version) are read directly.
//! - nbformat 3 documents are upgraded in memory: worksheets are flattened, code `input` becomes `source`,
//!   and heading cells become markdown cells.
//! - Parse failures carry a `miette` source span pointing into the offending JSON.
//!
//! ## Examples
//! ```rust
//! use nbcheck_format::{parse_notebook, CellKind};
//!
//! let text = r#"{"nbformat": 4, "nbformat_minor": 5, "metadata": {},
//!               "cells": [{"cell_type": "code", "source": ["x = 1\n", "x"]}]}"#;
//! let nb = parse_notebook("demo.ipynb", text).unwrap();
//! assert_eq!(nb.cells[0].kind, CellKind::Code);
//! assert_eq!(nb.cells[0].source, "x = 1\nx");
//! ```

pub mod error;
pub mod model;
pub mod reader;

pub use error::FormatError;
pub use model::{Cell, CellKind, FormatVersion, Notebook, NotebookMetadata};
pub use reader::{parse_notebook, read_notebook};
