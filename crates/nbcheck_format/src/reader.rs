//! nbformat JSON reader.
//!
//! Parsing happens in two passes over the text: a lenient probe that only reads `nbformat`, then a full
//! deserialization into the raw layout for that major version. Both passes go through `serde_json::from_str`
//! so every error carries a line and column.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::error::FormatError;
use crate::model::{Cell, CellKind, FormatVersion, Notebook, NotebookMetadata};

/// Read and parse the notebook at `path`.
pub fn read_notebook(path: &Path) -> Result<Notebook, FormatError> {
    let name = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|source| FormatError::Io {
        name: name.clone(),
        source,
    })?;
    parse_notebook(&name, &text)
}

/// Parse notebook JSON. `name` is only used for error reporting.
#[tracing::instrument(skip_all, fields(name = name, text_len = text.len()))]
pub fn parse_notebook(name: &str, text: &str) -> Result<Notebook, FormatError> {
    let probe: VersionProbe = serde_json::from_str(text).map_err(|e| FormatError::from_json(name, text, e))?;
    let version = FormatVersion {
        major: probe.nbformat,
        minor: probe.nbformat_minor,
    };

    let (metadata, cells) = match version.major {
        4 => {
            let raw: RawNotebookV4 = serde_json::from_str(text).map_err(|e| FormatError::from_json(name, text, e))?;
            (raw.metadata, raw.cells.into_iter().map(RawCellV4::into_cell).collect())
        }
        3 => {
            let raw: RawNotebookV3 = serde_json::from_str(text).map_err(|e| FormatError::from_json(name, text, e))?;
            tracing::debug!(name, "upgrading nbformat 3 document");
            let cells = raw
                .worksheets
                .into_iter()
                .flat_map(|ws| ws.cells)
                .map(RawCellV3::into_cell)
                .collect();
            (raw.metadata, cells)
        }
        major => {
            return Err(FormatError::UnsupportedVersion {
                name: name.to_string(),
                major,
            });
        }
    };

    Ok(Notebook {
        version,
        metadata: metadata.into_metadata(),
        cells,
    })
}

// ============================================================================
// Raw on-disk layout
// ============================================================================

#[derive(Deserialize)]
struct VersionProbe {
    nbformat: u32,
    #[serde(default)]
    nbformat_minor: u32,
}

/// nbformat "multiline string": either one string or a list of lines that concatenate verbatim.
#[derive(Debug, Default)]
struct MultilineString(String);

impl<'de> Deserialize<'de> for MultilineString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            One(String),
            Many(Vec<String>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::One(s) => MultilineString(s),
            Repr::Many(lines) => MultilineString(lines.concat()),
        })
    }
}

#[derive(Deserialize, Default)]
struct RawMetadata {
    #[serde(default)]
    kernelspec: Option<RawKernelspec>,
    #[serde(default)]
    language_info: Option<RawLanguageInfo>,
}

#[derive(Deserialize)]
struct RawKernelspec {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Deserialize)]
struct RawLanguageInfo {
    #[serde(default)]
    name: Option<String>,
}

impl RawMetadata {
    fn into_metadata(self) -> NotebookMetadata {
        let (kernel_name, spec_language) = match self.kernelspec {
            Some(spec) => (spec.name, spec.language),
            None => (None, None),
        };
        let language = self.language_info.and_then(|info| info.name).or(spec_language);
        NotebookMetadata { kernel_name, language }
    }
}

#[derive(Deserialize)]
struct RawNotebookV4 {
    #[serde(default)]
    metadata: RawMetadata,
    cells: Vec<RawCellV4>,
}

#[derive(Deserialize)]
struct RawCellV4 {
    cell_type: CellKind,
    #[serde(default)]
    source: MultilineString,
}

impl RawCellV4 {
    fn into_cell(self) -> Cell {
        Cell::new(self.cell_type, self.source.0)
    }
}

#[derive(Deserialize)]
struct RawNotebookV3 {
    #[serde(default)]
    metadata: RawMetadata,
    #[serde(default)]
    worksheets: Vec<RawWorksheet>,
}

#[derive(Deserialize)]
struct RawWorksheet {
    #[serde(default)]
    cells: Vec<RawCellV3>,
}

#[derive(Deserialize)]
#[serde(tag = "cell_type", rename_all = "lowercase")]
enum RawCellV3 {
    Code {
        #[serde(default)]
        input: MultilineString,
    },
    Markdown {
        #[serde(default)]
        source: MultilineString,
    },
    Raw {
        #[serde(default)]
        source: MultilineString,
    },
    Heading {
        #[serde(default)]
        source: MultilineString,
        #[serde(default = "default_heading_level")]
        level: usize,
    },
}

fn default_heading_level() -> usize {
    1
}

impl RawCellV3 {
    fn into_cell(self) -> Cell {
        match self {
            RawCellV3::Code { input } => Cell::code(input.0),
            RawCellV3::Markdown { source } => Cell::markdown(source.0),
            RawCellV3::Raw { source } => Cell::new(CellKind::Raw, source.0),
            RawCellV3::Heading { source, level } => {
                // v3 -> v4 upgrade joins multi-line headings onto one line
                let text = source.0.lines().collect::<Vec<_>>().join(" ");
                Cell::markdown(format!("{} {}", "#".repeat(level.max(1)), text))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
