//! Sync engine seam.
//!
//! The actual copy is delegated to an external synchronization tool. The
//! `SyncEngine` trait keeps the orchestrator independent of it; `RsyncEngine`
//! is the production implementation driving `rsync` in archive mode with
//! itemized output.

use std::ffi::{OsStr, OsString};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{EngineError, EntryError};
use crate::exclusions::EntryExclusions;
use crate::model::EntryKind;

/// Everything the sync engine needs for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    /// Canonical source path
    pub source: PathBuf,

    pub kind: EntryKind,

    /// Directory the source (or its contents) is copied into
    pub destination_dir: PathBuf,

    pub exclusions: EntryExclusions,

    /// Delete destination entries missing from the source (directories only)
    pub delete: bool,

    pub dry_run: bool,
}

/// What the sync engine reported for a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Itemized change lines, one per changed entry
    pub lines: Vec<String>,
}

/// A file synchronization backend.
///
/// Called once per entry, strictly sequentially. Implementations must clean
/// up anything they create for a request before returning, on success and
/// on failure.
pub trait SyncEngine {
    /// Copy one source into its destination.
    fn sync(&self, request: &SyncRequest) -> Result<SyncOutcome, EntryError>;
}

/// `rsync` driven as a child process.
#[derive(Debug, Clone)]
pub struct RsyncEngine {
    program: PathBuf,
}

impl RsyncEngine {
    /// Find `rsync` on `PATH`.
    ///
    /// # Errors
    /// Returns `EngineError::SyncEngineNotFound` if it isn't installed.
    pub fn locate() -> Result<Self, EngineError> {
        Self::locate_program("rsync")
    }

    /// Resolve a program name or path the way the shell would.
    ///
    /// # Errors
    /// Returns `EngineError::SyncEngineNotFound` if nothing executable matches.
    pub fn locate_program(program: impl AsRef<OsStr>) -> Result<Self, EngineError> {
        let program = program.as_ref();
        let resolved = which::which(program).map_err(|_| EngineError::SyncEngineNotFound {
            name: program.to_string_lossy().into_owned(),
        })?;
        Ok(RsyncEngine { program: resolved })
    }

    /// Use a specific binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        RsyncEngine {
            program: program.into(),
        }
    }

    /// Binary that will be run.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Command-line arguments for a request.
    pub fn build_args(request: &SyncRequest, exclude_file: Option<&Path>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-a".into(), "--itemize-changes".into()];

        if request.delete && request.kind == EntryKind::Directory {
            args.push("--delete".into());
        }
        if request.dry_run {
            args.push("--dry-run".into());
        }
        if let Some(file) = exclude_file {
            let mut arg = OsString::from("--exclude-from=");
            arg.push(file);
            args.push(arg);
        }

        // Trailing slash on a directory source copies its contents
        let mut source = request.source.clone().into_os_string();
        if request.kind == EntryKind::Directory {
            source.push("/");
        }
        args.push(source);

        let mut destination = request.destination_dir.clone().into_os_string();
        destination.push("/");
        args.push(destination);

        args
    }

    /// Write the combined exclusions to a temporary exclude file.
    ///
    /// Patterns are written verbatim. Source-relative paths are anchored with
    /// a leading `/` so they only match at the top of the transfer, and have
    /// wildcard characters escaped so they name exactly one location. Returns
    /// `None` when there's nothing to exclude.
    pub fn write_exclude_file(exclusions: &EntryExclusions) -> io::Result<Option<NamedTempFile>> {
        if exclusions.is_empty() {
            return Ok(None);
        }

        let mut file = tempfile::Builder::new()
            .prefix("mirror-backup-exclude-")
            .suffix(".txt")
            .tempfile()?;

        for pattern in &exclusions.patterns {
            writeln!(file, "{}", pattern)?;
        }
        for path in &exclusions.paths {
            writeln!(file, "/{}", escape_literal_path(path))?;
        }
        file.flush()?;

        Ok(Some(file))
    }
}

/// Make a relative path match only itself in an rsync exclude file.
///
/// rsync honors backslash escapes only in patterns that contain a wildcard,
/// so paths without `*`, `?` or `[` are returned unchanged.
pub fn escape_literal_path(path: &str) -> String {
    if !path.contains(&['*', '?', '['][..]) {
        return path.to_string();
    }

    let mut escaped = String::with_capacity(path.len() + 4);
    for c in path.chars() {
        if matches!(c, '\\' | '*' | '?' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl SyncEngine for RsyncEngine {
    fn sync(&self, request: &SyncRequest) -> Result<SyncOutcome, EntryError> {
        // Removed when dropped, whichever way this returns
        let exclude_file = Self::write_exclude_file(&request.exclusions).map_err(|e| {
            EntryError::ExcludeFileFailed {
                path: request.source.clone(),
                source: e,
            }
        })?;

        let args = Self::build_args(request, exclude_file.as_ref().map(NamedTempFile::path));
        debug!(program = %self.program.display(), ?args, "Invoking sync engine");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| EntryError::SyncLaunchFailed {
                path: request.source.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(EntryError::SyncFailed {
                path: request.source.clone(),
                status: output.status.code().unwrap_or(-1),
            });
        }

        let lines = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect();

        Ok(SyncOutcome { lines })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn request(kind: EntryKind, delete: bool) -> SyncRequest {
        SyncRequest {
            source: PathBuf::from("/data/project"),
            kind,
            destination_dir: PathBuf::from("/backups/data/project"),
            exclusions: EntryExclusions::default(),
            delete,
            dry_run: false,
        }
    }

    #[test]
    fn test_directory_args() {
        let args = RsyncEngine::build_args(
            &request(EntryKind::Directory, true),
            Some(Path::new("/tmp/ex.txt")),
        );
        assert_eq!(
            args,
            vec![
                OsString::from("-a"),
                OsString::from("--itemize-changes"),
                OsString::from("--delete"),
                OsString::from("--exclude-from=/tmp/ex.txt"),
                OsString::from("/data/project/"),
                OsString::from("/backups/data/project/"),
            ]
        );
    }

    #[test]
    fn test_file_args_never_delete() {
        let mut req = request(EntryKind::File, true);
        req.source = PathBuf::from("/etc/hosts");
        req.destination_dir = PathBuf::from("/backups/etc");
        req.dry_run = true;

        let args = RsyncEngine::build_args(&req, None);
        assert_eq!(
            args,
            vec![
                OsString::from("-a"),
                OsString::from("--itemize-changes"),
                OsString::from("--dry-run"),
                OsString::from("/etc/hosts"),
                OsString::from("/backups/etc/"),
            ]
        );
    }

    #[test]
    fn test_exclude_file_contents() {
        let exclusions = EntryExclusions {
            patterns: vec!["*.o".to_string(), "node_modules/".to_string()],
            paths: vec!["tmp".to_string(), "backups/host".to_string()],
        };

        let file = RsyncEngine::write_exclude_file(&exclusions)
            .expect("Failed to write exclude file")
            .expect("Expected a file for non-empty exclusions");
        let content = fs::read_to_string(file.path()).expect("Failed to read exclude file");
        assert_eq!(content, "*.o\nnode_modules/\n/tmp\n/backups/host\n");

        let path = file.path().to_path_buf();
        drop(file);
        assert!(!path.exists(), "Exclude file should be removed on drop");
    }

    #[test]
    fn test_exclude_file_escapes_wildcards_in_paths() {
        let exclusions = EntryExclusions {
            patterns: vec!["*.[oa]".to_string()],
            paths: vec![
                "[old]".to_string(),
                "a*b".to_string(),
                "logs/what?\\x".to_string(),
                "plain\\name".to_string(),
            ],
        };

        let file = RsyncEngine::write_exclude_file(&exclusions)
            .expect("Failed to write exclude file")
            .expect("Expected a file for non-empty exclusions");
        let content = fs::read_to_string(file.path()).expect("Failed to read exclude file");
        assert_eq!(
            content,
            "*.[oa]\n/\\[old]\n/a\\*b\n/logs/what\\?\\\\x\n/plain\\name\n"
        );
    }

    #[test]
    fn test_path_rules_with_brackets_stay_literal() {
        use crate::exclusions::{exclusions_for, ExclusionRules};
        use crate::model::{DestinationMapping, SourceEntry};

        let rules = ExclusionRules::from_lines(
            Vec::<String>::new(),
            vec!["/data/project/[old]", "/data/project/a*b"],
        );
        let entry = SourceEntry {
            raw_path: "/data/project".to_string(),
            kind: EntryKind::Directory,
            canonical_path: PathBuf::from("/data/project"),
        };
        let mapping = DestinationMapping {
            destination_dir: PathBuf::from("/backups/data/project"),
            file_name: None,
            nested_output: None,
        };

        let exclusions = exclusions_for(&entry, &mapping, &rules);
        let file = RsyncEngine::write_exclude_file(&exclusions)
            .expect("Failed to write exclude file")
            .expect("Expected a file for non-empty exclusions");
        let content = fs::read_to_string(file.path()).expect("Failed to read exclude file");
        assert_eq!(content, "/\\[old]\n/a\\*b\n");
    }

    #[test]
    fn test_escape_literal_path() {
        assert_eq!(escape_literal_path("backups/host"), "backups/host");
        assert_eq!(escape_literal_path("[old]"), "\\[old]");
        assert_eq!(escape_literal_path("a*b"), "a\\*b");
    }

    #[test]
    fn test_no_exclude_file_when_empty() {
        let file = RsyncEngine::write_exclude_file(&EntryExclusions::default())
            .expect("Failed to write exclude file");
        assert!(file.is_none());
    }

    #[test]
    fn test_with_program_keeps_path() {
        let engine = RsyncEngine::with_program("/opt/rsync/bin/rsync");
        assert_eq!(engine.program(), Path::new("/opt/rsync/bin/rsync"));
    }

    #[test]
    fn test_locate_unknown_program() {
        let result = RsyncEngine::locate_program("/nonexistent/rsync-binary");
        assert!(matches!(result, Err(EngineError::SyncEngineNotFound { .. })));
    }

    #[test]
    fn test_launch_failure_is_entry_error() {
        let engine = RsyncEngine::with_program("/nonexistent/rsync-binary");
        let result = engine.sync(&request(EntryKind::Directory, false));
        assert!(matches!(result, Err(EntryError::SyncLaunchFailed { .. })));
    }

    #[cfg(unix)]
    fn fake_engine(dir: &Path, body: &str) -> RsyncEngine {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-rsync");
        fs::write(&script, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write script");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755))
            .expect("Failed to chmod script");
        RsyncEngine::with_program(script)
    }

    #[cfg(unix)]
    #[test]
    fn test_exclude_file_removed_after_sync() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let engine = fake_engine(
            temp_dir.path(),
            r#"for a in "$@"; do case "$a" in --exclude-from=*) echo "${a#--exclude-from=}";; esac; done"#,
        );

        let mut req = request(EntryKind::Directory, false);
        req.exclusions.paths.push("tmp".to_string());

        let outcome = engine.sync(&req).expect("Fake sync should succeed");
        assert_eq!(outcome.lines.len(), 1);
        assert!(!Path::new(&outcome.lines[0]).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_exclude_file_removed_after_failed_sync() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let record = temp_dir.path().join("seen.txt");
        let engine = fake_engine(
            temp_dir.path(),
            &format!(
                r#"for a in "$@"; do case "$a" in --exclude-from=*) echo "${{a#--exclude-from=}}" > '{}';; esac; done; exit 23"#,
                record.display()
            ),
        );

        let mut req = request(EntryKind::Directory, false);
        req.exclusions.patterns.push("*.tmp".to_string());

        let result = engine.sync(&req);
        assert!(matches!(result, Err(EntryError::SyncFailed { status: 23, .. })));

        let seen = fs::read_to_string(&record).expect("Script should record exclude path");
        assert!(!Path::new(seen.trim()).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_sync_collects_itemized_lines() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let engine = fake_engine(
            temp_dir.path(),
            "echo 'cd+++++++++ ./'; echo '>f+++++++++ a.txt'",
        );

        let outcome = engine
            .sync(&request(EntryKind::Directory, false))
            .expect("Fake sync should succeed");
        assert_eq!(outcome.lines, vec!["cd+++++++++ ./", ">f+++++++++ a.txt"]);
    }
}
