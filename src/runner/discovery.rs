//! Notebook discovery and exclusion
//!
//! Notebooks live exactly two levels below the root: `<root>/<session>/<notebook>.ipynb`. Anything deeper
//! (checkpoints, nested assets) or shallower is not part of the run.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::DEFAULT_EXCLUDE;

const NOTEBOOK_EXTENSION: &str = "ipynb";

/// Find every `<session>/<notebook>.ipynb` under `root`, sorted by path.
///
/// Hidden entries (names starting with `.`) are ignored at both levels, which keeps `.ipynb_checkpoints` and
/// editor droppings out of the run.
pub fn discover_notebooks(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut notebooks = Vec::new();

    for session in fs::read_dir(root)? {
        let session_path = session?.path();
        if is_hidden(&session_path) || !session_path.is_dir() {
            continue;
        }
        for entry in fs::read_dir(&session_path)? {
            let entry_path = entry?.path();
            if !is_hidden(&entry_path) && entry_path.is_file() && is_notebook_file(&entry_path) {
                notebooks.push(entry_path);
            }
        }
    }

    notebooks.sort();
    Ok(notebooks)
}

/// True when the lowercased path contains any of `patterns`.
///
/// The whole path is matched, not just the file name, so a session directory named `exercises` excludes
/// everything inside it.
pub fn is_excluded(path: &Path, patterns: &[String]) -> bool {
    let lowered = path.to_string_lossy().to_lowercase();
    patterns
        .iter()
        .filter(|p| !p.is_empty())
        .any(|p| lowered.contains(&p.to_lowercase()))
}

/// True for notebooks left unfinished for learners.
pub fn is_exercise(path: &Path) -> bool {
    is_excluded(path, &[DEFAULT_EXCLUDE.to_string()])
}

fn is_notebook_file(path: &Path) -> bool {
    path.extension() == Some(OsStr::new(NOTEBOOK_EXTENSION))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.starts_with('.'))
}
