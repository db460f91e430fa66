//! Layered-ignore-policy file enumeration (§4.2).
//!
//! Grounded in the teacher's `services/indexer.rs::collect_files`, which
//! builds an `ignore::WalkBuilder` honoring `.gitignore`/global/exclude
//! rules and a hidden-file toggle. This module adds the built-in exclude
//! set the spec calls for (compiled caches, build outputs, VCS internals,
//! OS metadata) on top of that gitignore layer.

use crate::error::{ProjectError, Result};
use crate::types::{FileEntry, Millis, PriorityTier, Score};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Directory/file names always excluded regardless of gitignore content.
const BUILTIN_EXCLUDES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "dist",
    "build",
    "__pycache__",
    ".venv",
    "venv",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    ".next",
    ".nuxt",
    ".cache",
    ".DS_Store",
    "Thumbs.db",
];

/// A raw (unscored) file discovered during enumeration.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub absolute_path: PathBuf,
    pub relative_path: String,
    pub size_bytes: u64,
    pub modified_at: Millis,
    pub extension: Option<String>,
    pub is_hidden: bool,
}

/// Enumerates files under `root`, honoring `.gitignore` plus the built-in
/// exclude set. `include_hidden` controls dotfile visibility; it does not
/// affect the built-in excludes, which always apply.
pub fn enumerate_files(root: &Path, include_hidden: bool) -> Result<Vec<RawFile>> {
    let mut files = Vec::new();

    let walker = WalkBuilder::new(root)
        .hidden(!include_hidden)
        .follow_links(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .is_none_or(|name| !BUILTIN_EXCLUDES.contains(&name))
        })
        .build();

    for entry in walker {
        let entry = entry.map_err(|e| ProjectError::Walk {
            path: root.to_path_buf(),
            source: std::io::Error::other(e.to_string()),
        })?;

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        let Ok(metadata) = path.metadata() else { continue };

        let relative_path = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let is_hidden = file_name.starts_with('.');

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        let modified_at = metadata
            .modified()
            .ok()
            .and_then(|m| m.duration_since(std::time::UNIX_EPOCH).ok())
            .map_or(Millis::new(0), |d| Millis::new(d.as_millis() as i64));

        files.push(RawFile {
            absolute_path: path.to_path_buf(),
            relative_path,
            size_bytes: metadata.len(),
            modified_at,
            extension,
            is_hidden,
        });
    }

    Ok(files)
}

/// Applies the `file_types` extension filter from `list_project_files`.
/// Extensions are matched case-insensitively; a leading dot is optional
/// on either side of the comparison.
#[must_use]
pub fn matches_extension_filter(file: &RawFile, file_types: &[String]) -> bool {
    if file_types.is_empty() {
        return true;
    }
    let Some(ext) = &file.extension else { return false };
    file_types.iter().any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

/// Converts a scored raw file into the public `FileEntry` type, deriving
/// its priority tier from the configured thresholds.
#[must_use]
pub fn into_file_entry(
    file: RawFile,
    score: Score,
    high_threshold: f64,
    medium_threshold: f64,
) -> FileEntry {
    let priority_tier = if score.as_f64() >= high_threshold {
        PriorityTier::High
    } else if score.as_f64() >= medium_threshold {
        PriorityTier::Medium
    } else {
        PriorityTier::Low
    };

    FileEntry {
        relative_path: file.relative_path,
        size_bytes: file.size_bytes,
        modified_at: file.modified_at,
        extension: file.extension,
        is_hidden: file.is_hidden,
        score,
        priority_tier,
    }
}
