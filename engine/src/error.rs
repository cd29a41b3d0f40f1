//! Error types for the backup engine.
//!
//! There are two layers of errors:
//! - `EngineError`: run-level errors that prevent a backup from starting
//!   (missing input list, uncreatable output root, no sync engine).
//! - `EntryError`: per-entry failures. These are recorded on the entry's
//!   report and never abort the run.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a backup run before any entry is processed.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The input list file does not exist
    #[error("Input list not found: {}", .path.display())]
    InputNotFound { path: PathBuf },

    /// A list file (input, exclude, path-exclude) could not be read
    #[error("Failed to read list file: {}", .path.display())]
    ListReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The output root could not be created or resolved
    #[error("Failed to create output directory: {}", .path.display())]
    OutputCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The sync engine binary could not be located
    #[error("Sync engine not found: {name}")]
    SyncEngineNotFound { name: String },

    /// A configuration value is unusable
    #[error("Invalid configuration for {}: {reason}", .path.display())]
    InvalidConfig { path: PathBuf, reason: String },
}

/// Failures scoped to a single source entry.
#[derive(Debug, Error)]
pub enum EntryError {
    /// The source path does not exist (or vanished before it could be resolved)
    #[error("Source path does not exist: {}", .path.display())]
    SourceMissing { path: PathBuf },

    /// The source is the output root or the backup root itself
    #[error("Refusing to back up {} into itself", .path.display())]
    RecursionHazard { path: PathBuf },

    /// The destination directory could not be created
    #[error("Failed to create destination directory: {}", .path.display())]
    DestinationCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The temporary exclusion file could not be written
    #[error("Failed to write exclusion file for {}", .path.display())]
    ExcludeFileFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The sync engine could not be started
    #[error("Failed to launch sync engine for {}", .path.display())]
    SyncLaunchFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The sync engine ran but exited unsuccessfully
    #[error("Sync engine exited with status {status} for {}", .path.display())]
    SyncFailed { path: PathBuf, status: i32 },
}
