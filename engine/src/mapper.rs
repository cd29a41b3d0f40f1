//! Destination mapping.
//!
//! Every source is laid out under the output root by its absolute path
//! (`/data/project` -> `<output>/data/project`), optionally with a common
//! prefix removed first. Directory sources are also checked for overlap with
//! the output root so the sync engine never reads what it is writing.

use std::path::{Component, Path, PathBuf};

use crate::error::EntryError;
use crate::model::{DestinationMapping, EntryKind, SourceEntry};

/// Compute the destination-relative layout for a canonical source path.
///
/// With a matching `strip_prefix` the prefix is removed; if nothing is left
/// (the source *is* the prefix) the final component is used instead so the
/// segment is never empty. Without one, the whole absolute path is kept
/// minus its root.
///
/// Prefix matching is per path component: `/data` strips `/data/project`
/// but not `/database`.
pub fn relative_layout(canonical_path: &Path, strip_prefix: Option<&Path>) -> PathBuf {
    if let Some(prefix) = strip_prefix {
        if let Ok(rest) = canonical_path.strip_prefix(prefix) {
            let rest = without_root(rest);
            if rest.as_os_str().is_empty() {
                return canonical_path
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_default();
            }
            return rest;
        }
    }

    without_root(canonical_path)
}

fn without_root(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect()
}

/// Map a resolved source entry into the output tree.
///
/// - Files land in `output_root / dirname(layout)` under their own name.
/// - Directories have their contents mirrored into `output_root / layout`.
///
/// For directories whose tree contains the output root, the output root's
/// position relative to the source is returned in `nested_output`; callers
/// must exclude it.
///
/// # Errors
/// Returns `EntryError::RecursionHazard` if a directory source is the output
/// root itself.
pub fn map_entry(
    entry: &SourceEntry,
    output_root: &Path,
    strip_prefix: Option<&Path>,
) -> Result<DestinationMapping, EntryError> {
    let canonical = &entry.canonical_path;
    let layout = relative_layout(canonical, strip_prefix);

    match entry.kind {
        EntryKind::File => {
            let destination_dir = match layout.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => output_root.join(parent),
                _ => output_root.to_path_buf(),
            };
            Ok(DestinationMapping {
                destination_dir,
                file_name: canonical.file_name().map(PathBuf::from),
                nested_output: None,
            })
        }
        EntryKind::Directory => {
            if canonical == output_root {
                return Err(EntryError::RecursionHazard {
                    path: canonical.clone(),
                });
            }

            let nested_output = output_root
                .strip_prefix(canonical)
                .ok()
                .map(Path::to_path_buf);

            Ok(DestinationMapping {
                destination_dir: output_root.join(layout),
                file_name: None,
                nested_output,
            })
        }
    }
}
