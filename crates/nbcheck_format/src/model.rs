//! In-memory notebook representation.

use std::fmt;

use serde::Deserialize;

/// Kind of a notebook cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Code,
    Markdown,
    Raw,
}

/// A single notebook cell. Only [`CellKind::Code`] cells are ever executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub kind: CellKind,
    pub source: String,
}

impl Cell {
    pub fn new(kind: CellKind, source: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    pub fn code(source: impl Into<String>) -> Self {
        Self::new(CellKind::Code, source)
    }

    pub fn markdown(source: impl Into<String>) -> Self {
        Self::new(CellKind::Markdown, source)
    }

    pub fn is_code(&self) -> bool {
        self.kind == CellKind::Code
    }

    /// True when the cell holds nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.source.trim().is_empty()
    }
}

/// The `nbformat.nbformat_minor` pair a document was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatVersion {
    pub major: u32,
    pub minor: u32,
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// The subset of notebook metadata the runner cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotebookMetadata {
    /// `metadata.kernelspec.name`, e.g. `python3`
    pub kernel_name: Option<String>,
    /// `metadata.language_info.name`, falling back to `metadata.kernelspec.language`
    pub language: Option<String>,
}

/// A parsed notebook document.
///
/// Cells keep their document order. The version is the one found on disk, even when a v3 document has been
/// upgraded to the v4 cell layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notebook {
    pub version: FormatVersion,
    pub metadata: NotebookMetadata,
    pub cells: Vec<Cell>,
}

impl Notebook {
    /// Code cells worth sending to a kernel, paired with their position in [`Notebook::cells`].
    ///
    /// Blank code cells are skipped; Jupyter does not execute them either.
    pub fn code_cells(&self) -> impl Iterator<Item = (usize, &Cell)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_code() && !cell.is_blank())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
