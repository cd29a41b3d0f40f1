//! # BackUP Engine - Mirrored Directory Backups
//!
//! A headless backup orchestrator that mirrors a list of source paths into a
//! structured destination tree, delegating the byte copy to an external sync
//! engine (`rsync`).
//!
//! ## Overview
//!
//! - Maps every source (file or directory) to a destination under the output
//!   root, optionally stripping a common prefix
//! - Applies global pattern exclusions and per-source absolute path exclusions
//! - Refuses to back up the output tree into itself and excludes it when it
//!   sits inside a source
//! - Isolates failures per entry and reports added/updated/deleted counts
//!
//! ## Basic Usage
//!
//! ```no_run
//! use engine::{create_backup, run_backup, BackupConfig, ExclusionRules, RsyncEngine};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = BackupConfig::new("/backups");
//! config.rules = ExclusionRules::load(Some(Path::new("exclude.txt")), None)?;
//!
//! let mut job = create_backup(Path::new("sources.txt"), config)?;
//! let engine = RsyncEngine::locate()?;
//! run_backup(&mut job, &engine, None)?;
//!
//! print!("{}", engine::stats::render_summary(&job.report));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: Core data structures (BackupConfig, SourceEntry, RunReport)
//! - **error**: Run-level and entry-level error types
//! - **fs_ops**: List files, entry resolution, directory creation
//! - **mapper**: Destination layout and recursion hazard detection
//! - **exclusions**: Pattern and path exclusion rules
//! - **sync**: Sync engine trait and the rsync backend
//! - **stats**: Itemized output classification and summary rendering
//! - **job**: Orchestration (create, run)
//! - **progress**: Progress callback trait

pub mod model;
pub mod error;
pub mod fs_ops;
pub mod mapper;
pub mod exclusions;
pub mod sync;
pub mod stats;
pub mod job;
pub mod progress;

// Re-export main types and functions
pub use model::{
    BackupConfig, DestinationMapping, EntryKind, EntryOutcome, EntryReport, EntryStats, JobState,
    RunReport, SourceEntry,
};
pub use error::{EngineError, EntryError};
pub use exclusions::{ExclusionRule, ExclusionRules};
pub use job::{create_backup, run_backup, BackupJob};
pub use progress::ProgressCallback;
pub use sync::{RsyncEngine, SyncEngine, SyncOutcome, SyncRequest};
