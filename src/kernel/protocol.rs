//! Wire format between the runner and the kernel driver: one JSON object per line in each direction.

use serde::{Deserialize, Serialize};

/// Runner -> driver: execute one cell.
#[derive(Debug, Serialize)]
pub struct CellRequest<'a> {
    pub cell: usize,
    pub code: &'a str,
}

/// Driver -> runner.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KernelReply {
    /// Sent once, before any request is read
    Ready { python: String, ipython: bool },
    #[serde(rename = "ok")]
    Done { cell: usize },
    Error {
        cell: usize,
        ename: String,
        evalue: String,
        #[serde(default)]
        traceback: Vec<String>,
    },
}

impl KernelReply {
    /// Parse one line of driver output. `None` for lines that are not protocol messages.
    pub fn parse_line(line: &str) -> Option<Result<Self, serde_json::Error>> {
        let trimmed = line.trim();
        if !trimmed.starts_with('{') {
            return None;
        }
        Some(serde_json::from_str(trimmed))
    }
}
