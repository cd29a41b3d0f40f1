//! Core data model for backup runs.
//!
//! This module defines the main data structures:
//! - BackupConfig: everything a run needs, parsed once at startup
//! - SourceEntry: one resolved line of the input list
//! - DestinationMapping: where an entry lands and what it must not recurse into
//! - EntryStats, EntryReport, RunReport: per-entry change counts in input order

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use crate::exclusions::ExclusionRules;

/// Settings for a single backup run.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// Root the sources are mirrored under (already host-scoped if requested)
    pub output_root: PathBuf,

    /// Root the user configured; differs from `output_root` only with per-host layout
    pub backup_root: PathBuf,

    /// Common prefix removed from source paths when laying out destinations
    pub strip_prefix: Option<PathBuf>,

    /// Pattern and path exclusion rules
    pub rules: ExclusionRules,

    /// Propagate orphan deletion to the sync engine (directories only)
    pub delete: bool,

    /// Ask the sync engine not to write anything
    pub dry_run: bool,
}

impl BackupConfig {
    /// Create a config with no exclusions, no prefix stripping and no deletion.
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        let output_root = output_root.into();
        BackupConfig {
            backup_root: output_root.clone(),
            output_root,
            strip_prefix: None,
            rules: ExclusionRules::default(),
            delete: false,
            dry_run: false,
        }
    }

    /// Scope the output root to a per-host subdirectory.
    ///
    /// The original root stays the backup root, which is still protected
    /// from being backed up into itself.
    pub fn per_host(mut self, host: &str) -> Self {
        self.output_root = self.backup_root.join(host);
        self
    }
}

/// The state of a backup job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Created, not yet started
    Pending,
    /// Currently executing
    Running,
    /// All entries processed or the run was cancelled
    Completed,
}

/// Whether a source entry is a single file or a directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::File => write!(f, "file"),
            EntryKind::Directory => write!(f, "directory"),
        }
    }
}

/// A source path from the input list that exists on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// The line as written in the input list
    pub raw_path: String,

    /// File or directory, decided by an existence check
    pub kind: EntryKind,

    /// Absolute, symlink-resolved path used for every comparison
    pub canonical_path: PathBuf,
}

/// Result of mapping a source entry into the output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationMapping {
    /// Directory the sync engine writes into
    pub destination_dir: PathBuf,

    /// For file entries, the name the file is stored under inside `destination_dir`
    pub file_name: Option<PathBuf>,

    /// Output root's position under a directory source, if it is nested there
    pub nested_output: Option<PathBuf>,
}

impl DestinationMapping {
    /// True if the output tree overlaps the source.
    pub fn has_recursion_hazard(&self) -> bool {
        self.nested_output.is_some()
    }
}

/// Change counts for one entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntryStats {
    pub added: u64,
    pub updated: u64,
    pub deleted: u64,
}

impl EntryStats {
    /// Total number of change lines accounted for.
    pub fn total(&self) -> u64 {
        self.added + self.updated + self.deleted
    }
}

impl std::ops::AddAssign for EntryStats {
    fn add_assign(&mut self, other: Self) {
        self.added += other.added;
        self.updated += other.updated;
        self.deleted += other.deleted;
    }
}

/// How an attempted entry ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum EntryOutcome {
    /// The sync engine finished successfully
    Synced,
    /// The sync step failed; stats are zero
    Failed(String),
}

/// Report line for one entry that reached the sync step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub path: PathBuf,
    pub kind: EntryKind,
    pub destination: PathBuf,
    pub stats: EntryStats,
    pub outcome: EntryOutcome,
}

/// Overall result of a backup run.
///
/// Entries are kept in the order they were attempted and keyed by their
/// canonical path. Reporting the same path twice accumulates into the
/// existing row instead of adding a second one.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unique identifier for this run
    pub id: Uuid,

    pub started_at: DateTime<Utc>,

    pub finished_at: Option<DateTime<Utc>>,

    pub output_root: PathBuf,

    /// Entries that reached the sync step, in input order
    pub entries: Vec<EntryReport>,

    /// Entries skipped before the sync step (missing, hazards, mkdir failures)
    pub skipped: usize,

    /// True if a termination signal stopped the run early
    pub cancelled: bool,
}

impl RunReport {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        RunReport {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            output_root: output_root.into(),
            entries: Vec::new(),
            skipped: 0,
            cancelled: false,
        }
    }

    /// Record an attempted entry, merging with an earlier row for the same path.
    pub fn record(&mut self, report: EntryReport) {
        match self.entries.iter_mut().find(|e| e.path == report.path) {
            Some(existing) => {
                existing.stats += report.stats;
                if let EntryOutcome::Failed(_) = report.outcome {
                    existing.outcome = report.outcome;
                }
            }
            None => self.entries.push(report),
        }
    }

    /// Look up the stats recorded for a canonical path.
    pub fn stats_for(&self, path: &std::path::Path) -> Option<EntryStats> {
        self.entries.iter().find(|e| e.path == path).map(|e| e.stats)
    }

    /// Sum of all entry stats.
    pub fn totals(&self) -> EntryStats {
        let mut totals = EntryStats::default();
        for entry in &self.entries {
            totals += entry.stats;
        }
        totals
    }

    /// Number of entries whose sync step failed.
    pub fn failed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, EntryOutcome::Failed(_)))
            .count()
    }
}
