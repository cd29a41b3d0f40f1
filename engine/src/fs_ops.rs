//! Filesystem operations module.
//!
//! This module provides the filesystem primitives the orchestrator calls into:
//! - Reading newline-delimited list files
//! - Resolving source entries (existence, kind, canonical path)
//! - Creating destination directories recursively

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{EngineError, EntryError};
use crate::model::{EntryKind, SourceEntry};

/// Read a newline-delimited list file.
///
/// Blank (or whitespace-only) lines and lines starting with `#` are dropped.
/// Kept lines are returned as written, minus a trailing `\r`.
///
/// # Errors
/// Returns `EngineError::InputNotFound` if the file doesn't exist and
/// `EngineError::ListReadFailed` for any other read error.
pub fn read_list_file(path: &Path) -> Result<Vec<String>, EngineError> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            EngineError::InputNotFound {
                path: path.to_path_buf(),
            }
        } else {
            EngineError::ListReadFailed {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    Ok(parse_list(&content))
}

/// Split list content into meaningful lines.
pub fn parse_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Resolve one input-list line into a source entry.
///
/// Relative paths are resolved against the current directory, symlinks and
/// `.`/`..` components are resolved once by canonicalization. A trailing
/// slash makes no difference.
///
/// # Errors
/// Returns `EntryError::SourceMissing` if the path does not exist or can no
/// longer be resolved.
pub fn resolve_entry(raw_path: &str) -> Result<SourceEntry, EntryError> {
    let missing = || EntryError::SourceMissing {
        path: PathBuf::from(raw_path),
    };

    let canonical_path = fs::canonicalize(raw_path).map_err(|_| missing())?;
    let metadata = fs::metadata(&canonical_path).map_err(|_| missing())?;

    let kind = if metadata.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    };

    Ok(SourceEntry {
        raw_path: raw_path.to_string(),
        kind,
        canonical_path,
    })
}

/// Ensure a directory exists, creating it and its ancestors if necessary.
///
/// # Errors
/// Fails if the path exists but is not a directory, or creation fails.
pub fn ensure_dir_exists(path: &Path) -> io::Result<()> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "Path exists but is not a directory",
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => fs::create_dir_all(path),
        Err(e) => Err(e),
    }
}

/// Create the output root and return its canonical form.
///
/// # Errors
/// Returns `EngineError::OutputCreationFailed` if the directory can't be
/// created or resolved. This is fatal for the run.
pub fn prepare_output_root(path: &Path) -> Result<PathBuf, EngineError> {
    let fail = |source: io::Error| EngineError::OutputCreationFailed {
        path: path.to_path_buf(),
        source,
    };

    ensure_dir_exists(path).map_err(fail)?;
    fs::canonicalize(path).map_err(fail)
}
