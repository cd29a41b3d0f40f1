//! Progress reporting trait.
//!
//! This module defines the ProgressCallback trait, which decouples the
//! orchestrator from how progress and warnings are rendered. Log output goes
//! through `tracing` regardless; a callback is for user-facing rendering.

use crate::error::EntryError;
use crate::model::{EntryReport, RunReport, SourceEntry};

/// Receives updates while a backup run executes.
///
/// All methods are called synchronously, in entry order. Every method has an
/// empty default so implementations only override what they render.
pub trait ProgressCallback {
    /// Called before the first entry is processed.
    fn on_run_started(&self, _report: &RunReport, _entry_count: usize) {}

    /// Called when an entry is about to be synced.
    fn on_entry_started(&self, _index: usize, _entry: &SourceEntry) {}

    /// Called for one itemized change line of the current entry.
    fn on_change_line(&self, _index: usize, _line: &str) {}

    /// Called when an entry is skipped before reaching the sync step.
    fn on_entry_skipped(&self, _index: usize, _raw_path: &str, _error: &EntryError) {}

    /// Called when an entry's sync step finished (successfully or not).
    fn on_entry_completed(&self, _index: usize, _report: &EntryReport) {}

    /// Called once after the last entry (or after cancellation).
    fn on_run_completed(&self, _report: &RunReport) {}
}
