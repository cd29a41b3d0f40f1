//! Exclusion rules.
//!
//! Two independent mechanisms are supported:
//! - Pattern rules: sync-engine patterns (globs, names, path fragments) handed
//!   to the engine verbatim for every entry.
//! - Path rules: absolute paths. Each one only applies to the entry whose
//!   canonical path contains it, and is rewritten relative to that entry.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::fs_ops;
use crate::model::{DestinationMapping, SourceEntry};

/// A single exclusion rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionRule {
    /// Passed through to the sync engine unmodified
    Pattern { text: String },
    /// An absolute path, trailing slash stripped
    Path { absolute_path: PathBuf },
}

/// All exclusion rules for a run, loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionRules {
    patterns: Vec<String>,
    paths: Vec<PathBuf>,
}

impl ExclusionRules {
    /// Load pattern rules and path rules from their (optional) list files.
    ///
    /// # Errors
    /// Returns an `EngineError` if a given file can't be read.
    pub fn load(
        pattern_file: Option<&Path>,
        path_file: Option<&Path>,
    ) -> Result<Self, EngineError> {
        let patterns = match pattern_file {
            Some(file) => fs_ops::read_list_file(file)?,
            None => {
                debug!("No pattern exclusion file supplied");
                Vec::new()
            }
        };
        let paths = match path_file {
            Some(file) => fs_ops::read_list_file(file)?,
            None => Vec::new(),
        };

        Ok(Self::from_lines(patterns, paths))
    }

    /// Build rules from already-filtered list lines.
    ///
    /// Relative lines in the path list can't be matched against canonical
    /// sources and are dropped with a warning.
    pub fn from_lines<P, Q>(patterns: P, paths: Q) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        Q: IntoIterator,
        Q::Item: AsRef<str>,
    {
        let patterns = patterns.into_iter().map(Into::into).collect();
        let paths = paths
            .into_iter()
            .filter_map(|line| {
                let line = line.as_ref();
                let path = PathBuf::from(line.trim_end_matches('/'));
                if path.is_absolute() {
                    Some(path)
                } else if line.starts_with('/') {
                    // A bare "/" strips down to nothing
                    Some(PathBuf::from("/"))
                } else {
                    warn!(rule = %line, "Ignoring path exclusion that is not absolute");
                    None
                }
            })
            .collect();

        ExclusionRules { patterns, paths }
    }

    /// Pattern rules, in file order.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Path rules, in file order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Every rule as a tagged value, patterns first.
    pub fn rules(&self) -> impl Iterator<Item = ExclusionRule> + '_ {
        let patterns = self
            .patterns
            .iter()
            .map(|text| ExclusionRule::Pattern { text: text.clone() });
        let paths = self.paths.iter().map(|p| ExclusionRule::Path {
            absolute_path: p.clone(),
        });
        patterns.chain(paths)
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && self.paths.is_empty()
    }
}

/// Path rules that fall strictly under `entry`, made relative to it.
///
/// Rules outside the entry (or equal to it) are omitted. Order follows the
/// rule file and duplicates are kept.
pub fn resolve(entry: &SourceEntry, path_rules: &[PathBuf]) -> Vec<String> {
    path_rules
        .iter()
        .filter_map(|rule| {
            let rest = rule.strip_prefix(&entry.canonical_path).ok()?;
            if rest.as_os_str().is_empty() {
                None
            } else {
                Some(rest.to_string_lossy().into_owned())
            }
        })
        .collect()
}

/// The exclusions handed to the sync engine for one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryExclusions {
    /// Global pattern rules
    pub patterns: Vec<String>,
    /// Source-relative paths: matched path rules, then the nested output root
    pub paths: Vec<String>,
}

impl EntryExclusions {
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len() + self.paths.len()
    }
}

/// Combine global patterns, the entry's path rules and any recursion
/// exclusion from its mapping.
pub fn exclusions_for(
    entry: &SourceEntry,
    mapping: &DestinationMapping,
    rules: &ExclusionRules,
) -> EntryExclusions {
    let mut paths = resolve(entry, rules.paths());

    if let Some(nested) = &mapping.nested_output {
        debug!(
            path = %entry.canonical_path.display(),
            nested = %nested.display(),
            "Output root is inside source, excluding it"
        );
        paths.push(nested.to_string_lossy().into_owned());
    }

    if paths.is_empty() && !rules.paths().is_empty() {
        debug!(path = %entry.canonical_path.display(), "No path exclusions apply");
    }

    EntryExclusions {
        patterns: rules.patterns().to_vec(),
        paths,
    }
}
