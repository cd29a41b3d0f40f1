//! Change statistics.
//!
//! Classifies the sync engine's itemized output (`YXcstpoguax name`) into
//! added, updated and deleted counts, and renders the end-of-run table.

use std::fmt::Write;

use crate::model::{EntryOutcome, EntryStats, RunReport};

/// How a single itemized line changed the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Updated,
    Deleted,
}

const UPDATE_TYPES: &[char] = &['<', '>', 'c', 'h', '.'];
const FILE_TYPES: &[char] = &['f', 'L', 'D', 'S'];

/// Classify one line of itemized output.
///
/// Returns `None` for directory entries, unchanged entries, summary lines
/// and anything else that isn't a non-directory change.
pub fn classify_line(line: &str) -> Option<ChangeKind> {
    if line.starts_with("*deleting") {
        return Some(ChangeKind::Deleted);
    }

    let (code, name) = line.split_once(' ')?;
    if name.trim().is_empty() {
        return None;
    }

    let mut chars = code.chars();
    let update_type = chars.next()?;
    let item_type = chars.next()?;
    let flags = chars.as_str();

    if !UPDATE_TYPES.contains(&update_type) || !FILE_TYPES.contains(&item_type) || flags.is_empty()
    {
        return None;
    }

    if flags.chars().all(|c| c == '+') {
        Some(ChangeKind::Added)
    } else if update_type == '.' && flags.chars().all(|c| c == '.') {
        None
    } else {
        Some(ChangeKind::Updated)
    }
}

/// True if the line counts towards an entry's stats.
pub fn is_file_change(line: &str) -> bool {
    classify_line(line).is_some()
}

/// Count the changes in a block of itemized output.
pub fn count_changes<I, S>(lines: I) -> EntryStats
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut stats = EntryStats::default();
    for line in lines {
        match classify_line(line.as_ref()) {
            Some(ChangeKind::Added) => stats.added += 1,
            Some(ChangeKind::Updated) => stats.updated += 1,
            Some(ChangeKind::Deleted) => stats.deleted += 1,
            None => {}
        }
    }
    stats
}

/// Render the final summary table.
///
/// One row per attempted entry in input order, then a totals row.
pub fn render_summary(report: &RunReport) -> String {
    const HEADERS: [&str; 5] = ["Path", "Added", "Updated", "Deleted", "Status"];

    let rows: Vec<[String; 5]> = report
        .entries
        .iter()
        .map(|entry| {
            let status = match &entry.outcome {
                EntryOutcome::Synced => "ok".to_string(),
                EntryOutcome::Failed(msg) => format!("FAILED: {}", msg),
            };
            [
                entry.path.display().to_string(),
                entry.stats.added.to_string(),
                entry.stats.updated.to_string(),
                entry.stats.deleted.to_string(),
                status,
            ]
        })
        .collect();

    let totals = report.totals();
    let total_row = [
        "TOTAL".to_string(),
        totals.added.to_string(),
        totals.updated.to_string(),
        totals.deleted.to_string(),
        format!("{} failed", report.failed_count()),
    ];

    let mut widths = HEADERS.map(str::len);
    for row in rows.iter().chain(std::iter::once(&total_row)) {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: &[String]| {
        let _ = writeln!(
            out,
            "{:<w0$}  {:>w1$}  {:>w2$}  {:>w3$}  {}",
            cells[0],
            cells[1],
            cells[2],
            cells[3],
            cells[4],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
            w3 = widths[3],
        );
    };

    push_row(&HEADERS.map(str::to_string));
    for row in &rows {
        push_row(row);
    }
    push_row(&total_row);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntryKind, EntryReport};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn test_classify_new_file() {
        assert_eq!(classify_line(">f+++++++++ src/main.rs"), Some(ChangeKind::Added));
        assert_eq!(classify_line("cL+++++++++ link -> target"), Some(ChangeKind::Added));
    }

    #[test]
    fn test_classify_updated_file() {
        assert_eq!(classify_line(">f.st...... notes.txt"), Some(ChangeKind::Updated));
        assert_eq!(classify_line(".f...p..... script.sh"), Some(ChangeKind::Updated));
        assert_eq!(classify_line(">f..t...... a b c.txt"), Some(ChangeKind::Updated));
    }

    #[test]
    fn test_classify_deleted() {
        assert_eq!(classify_line("*deleting   old.log"), Some(ChangeKind::Deleted));
        assert_eq!(classify_line("*deleting   olddir/"), Some(ChangeKind::Deleted));
    }

    #[test]
    fn test_ignores_directories_and_noise() {
        assert_eq!(classify_line("cd+++++++++ src/"), None);
        assert_eq!(classify_line(".d..t...... ./"), None);
        assert_eq!(classify_line(".f          unchanged.txt"), None);
        assert_eq!(classify_line(".f......... unchanged.txt"), None);
        assert_eq!(classify_line("sending incremental file list"), None);
        assert_eq!(
            classify_line("sent 1,234 bytes  received 56 bytes  2,580.00 bytes/sec"),
            None
        );
        assert_eq!(classify_line(""), None);
    }

    #[test]
    fn test_counts_sum_to_change_lines() {
        let output = "\
sending incremental file list
cd+++++++++ ./
>f+++++++++ a.txt
>f+++++++++ b.txt
>f.st...... c.txt
*deleting   d.txt
.d..t...... sub/
>f..t...... sub/e.txt

sent 300 bytes  received 90 bytes  780.00 bytes/sec
total size is 42  speedup is 0.11";

        let stats = count_changes(output.lines());
        assert_eq!(
            stats,
            EntryStats {
                added: 2,
                updated: 2,
                deleted: 1
            }
        );

        let change_lines = output.lines().filter(|l| is_file_change(l)).count() as u64;
        assert_eq!(stats.total(), change_lines);
    }

    #[test]
    fn test_render_summary_lists_entries_and_totals() {
        let mut report = RunReport::new("/backups");
        report.record(EntryReport {
            path: PathBuf::from("/data/project"),
            kind: EntryKind::Directory,
            destination: PathBuf::from("/backups/data/project"),
            stats: EntryStats {
                added: 3,
                updated: 0,
                deleted: 0,
            },
            outcome: EntryOutcome::Synced,
        });
        report.record(EntryReport {
            path: PathBuf::from("/etc/hosts"),
            kind: EntryKind::File,
            destination: PathBuf::from("/backups/etc"),
            stats: EntryStats::default(),
            outcome: EntryOutcome::Failed("exit 23".into()),
        });

        let table = render_summary(&report);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Path"));
        assert!(lines[1].starts_with("/data/project"));
        assert!(lines[1].ends_with("ok"));
        assert!(lines[2].contains("FAILED: exit 23"));
        assert!(lines[3].starts_with("TOTAL"));
        assert!(lines[3].ends_with("1 failed"));
    }
}
