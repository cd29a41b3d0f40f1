//! Backup orchestration.
//!
//! This module provides the job lifecycle functions:
//! - Creating a job from an input list and a config
//! - Running a job: map, exclude and sync every entry in list order
//!
//! Entries are processed strictly one after another. A failing entry is
//! logged and recorded, and the loop moves on.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::error::{EngineError, EntryError};
use crate::exclusions;
use crate::fs_ops;
use crate::mapper;
use crate::model::{
    BackupConfig, DestinationMapping, EntryOutcome, EntryReport, EntryStats, JobState, RunReport,
    SourceEntry,
};
use crate::progress::ProgressCallback;
use crate::stats;
use crate::sync::{SyncEngine, SyncRequest};

/// A backup run: the source list, its settings and the report being built.
#[derive(Debug)]
pub struct BackupJob {
    pub config: BackupConfig,

    /// Meaningful lines of the input list, in order
    pub sources: Vec<String>,

    pub state: JobState,

    pub report: RunReport,

    cancel: Option<Arc<AtomicBool>>,
}

impl BackupJob {
    /// Stop starting new entries once `flag` becomes true.
    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.cancel = Some(flag);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}

/// Create a new backup job.
///
/// Reads the input list and creates the output root. Both roots in the
/// returned job's config are canonical.
///
/// # Errors
/// Returns `EngineError` if the input list is missing or unreadable, or the
/// output root can't be created. Nothing has been copied at that point.
pub fn create_backup(input: &Path, config: BackupConfig) -> Result<BackupJob, EngineError> {
    let sources = fs_ops::read_list_file(input)?;

    let mut config = config;
    config.output_root = fs_ops::prepare_output_root(&config.output_root)?;
    config.backup_root = fs_ops::prepare_output_root(&config.backup_root)?;

    if config.rules.is_empty() {
        debug!("No exclusion rules configured");
    }
    for rule in config.rules.rules() {
        debug!(?rule, "Exclusion rule loaded");
    }

    info!(
        input = %input.display(),
        output = %config.output_root.display(),
        sources = sources.len(),
        "Backup job created"
    );

    let report = RunReport::new(&config.output_root);
    Ok(BackupJob {
        config,
        sources,
        state: JobState::Pending,
        report,
        cancel: None,
    })
}

/// Everything worked out for an entry before the sync step.
struct PreparedEntry {
    entry: SourceEntry,
    mapping: DestinationMapping,
    request: SyncRequest,
}

/// Resolve, map and exclude one input line.
///
/// Any error here means the sync engine is never invoked for the line.
fn prepare_entry(raw_path: &str, config: &BackupConfig) -> Result<PreparedEntry, EntryError> {
    let entry = fs_ops::resolve_entry(raw_path)?;
    let canonical = &entry.canonical_path;

    if *canonical == config.output_root || *canonical == config.backup_root {
        return Err(EntryError::RecursionHazard {
            path: canonical.clone(),
        });
    }

    let mapping = mapper::map_entry(&entry, &config.output_root, config.strip_prefix.as_deref())?;

    if let Some(nested) = &mapping.nested_output {
        warn!(
            path = %canonical.display(),
            nested = %nested.display(),
            "Output directory is inside this source; it will be excluded"
        );
    }

    if !config.dry_run {
        fs_ops::ensure_dir_exists(&mapping.destination_dir).map_err(|e| {
            EntryError::DestinationCreationFailed {
                path: mapping.destination_dir.clone(),
                source: e,
            }
        })?;
    }

    let exclusions = exclusions::exclusions_for(&entry, &mapping, &config.rules);
    let request = SyncRequest {
        source: canonical.clone(),
        kind: entry.kind,
        destination_dir: mapping.destination_dir.clone(),
        exclusions,
        delete: config.delete,
        dry_run: config.dry_run,
    };

    Ok(PreparedEntry {
        entry,
        mapping,
        request,
    })
}

/// Run a backup job.
///
/// Transitions job state from Pending to Running to Completed.
/// For each source line: resolve it, reject recursion hazards, map it into
/// the output tree, create the destination, compute its exclusions and hand
/// it to `engine`. Stats are recorded per canonical path for entries that
/// reached the sync step.
///
/// # Arguments
/// * `job` - Job to execute (must be in Pending state)
/// * `engine` - Sync backend
/// * `progress_callback` - Optional callback for progress updates
///
/// # Errors
/// Returns EngineError only if the job isn't Pending. Entry-level failures
/// are logged and recorded in the report.
pub fn run_backup(
    job: &mut BackupJob,
    engine: &dyn SyncEngine,
    progress_callback: Option<&dyn ProgressCallback>,
) -> Result<(), EngineError> {
    if job.state != JobState::Pending {
        return Err(EngineError::InvalidConfig {
            path: job.config.output_root.clone(),
            reason: format!(
                "Job must be in Pending state to run; current state: {:?}",
                job.state
            ),
        });
    }

    job.state = JobState::Running;

    if let Some(callback) = progress_callback {
        callback.on_run_started(&job.report, job.sources.len());
    }

    for index in 0..job.sources.len() {
        if job.is_cancelled() {
            warn!(remaining = job.sources.len() - index, "Backup cancelled");
            job.report.cancelled = true;
            break;
        }

        let raw_path = job.sources[index].clone();

        let prepared = match prepare_entry(&raw_path, &job.config) {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(path = %raw_path, "Skipping entry: {}", e);
                job.report.skipped += 1;
                if let Some(callback) = progress_callback {
                    callback.on_entry_skipped(index, &raw_path, &e);
                }
                continue;
            }
        };

        let PreparedEntry {
            entry,
            mapping,
            request,
        } = prepared;

        info!(
            path = %entry.canonical_path.display(),
            kind = %entry.kind,
            destination = %mapping.destination_dir.display(),
            exclusions = request.exclusions.len(),
            "Backing up"
        );
        if let Some(callback) = progress_callback {
            callback.on_entry_started(index, &entry);
        }

        let (entry_stats, outcome) = match engine.sync(&request) {
            Ok(synced) => {
                for line in synced.lines.iter().filter(|l| stats::is_file_change(l)) {
                    debug!(path = %entry.canonical_path.display(), "{}", line);
                    if let Some(callback) = progress_callback {
                        callback.on_change_line(index, line);
                    }
                }
                (stats::count_changes(&synced.lines), EntryOutcome::Synced)
            }
            Err(e) => {
                error!(path = %entry.canonical_path.display(), "{}", e);
                (EntryStats::default(), EntryOutcome::Failed(e.to_string()))
            }
        };

        let entry_report = EntryReport {
            path: entry.canonical_path.clone(),
            kind: entry.kind,
            destination: mapping.destination_dir,
            stats: entry_stats,
            outcome,
        };

        if let Some(callback) = progress_callback {
            callback.on_entry_completed(index, &entry_report);
        }
        job.report.record(entry_report);
    }

    job.state = JobState::Completed;
    job.report.finished_at = Some(Utc::now());

    let totals = job.report.totals();
    info!(
        attempted = job.report.entries.len(),
        skipped = job.report.skipped,
        failed = job.report.failed_count(),
        added = totals.added,
        updated = totals.updated,
        deleted = totals.deleted,
        "Backup finished"
    );

    if let Some(callback) = progress_callback {
        callback.on_run_completed(&job.report);
    }

    Ok(())
}
