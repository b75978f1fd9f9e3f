//! Errors raised while reading or parsing a notebook document.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Failure to turn a file into a [`crate::Notebook`].
#[derive(Debug, Error, Diagnostic)]
pub enum FormatError {
    #[error("failed to read {name}")]
    #[diagnostic(code(nbcheck::format::io))]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{name} is not valid JSON: {message}")]
    #[diagnostic(
        code(nbcheck::format::syntax),
        help("notebooks are JSON documents; the file may be truncated or carry a merge conflict")
    )]
    Syntax {
        name: String,
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("{name} is not a valid notebook: {message}")]
    #[diagnostic(code(nbcheck::format::structure))]
    Structure {
        name: String,
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("{name} uses nbformat {major}; only versions 3 and 4 are supported")]
    #[diagnostic(
        code(nbcheck::format::unsupported_version),
        help("re-save the notebook with a current Jupyter release")
    )]
    UnsupportedVersion { name: String, major: u32 },
}

impl FormatError {
    /// Classify a `serde_json` failure and attach the offending location.
    pub(crate) fn from_json(name: &str, text: &str, err: serde_json::Error) -> Self {
        let offset = byte_offset(text, err.line(), err.column());
        let len = if offset < text.len() { 1 } else { 0 };
        let span: SourceSpan = (offset, len).into();
        let src = NamedSource::new(name, text.to_string());
        let message = err.to_string();
        let name = name.to_string();

        if err.is_data() {
            FormatError::Structure {
                name,
                message,
                src,
                span,
            }
        } else {
            FormatError::Syntax {
                name,
                message,
                src,
                span,
            }
        }
    }

    /// Name of the document the error belongs to.
    pub fn name(&self) -> &str {
        match self {
            FormatError::Io { name, .. }
            | FormatError::Syntax { name, .. }
            | FormatError::Structure { name, .. }
            | FormatError::UnsupportedVersion { name, .. } => name,
        }
    }
}

/// Convert serde_json's 1-based line/column into a byte offset, clamped to the text.
fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(text.len())
}
