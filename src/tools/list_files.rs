//! `list_project_files` tool (§4.1, §4.2, §4.3).

use crate::config::GandalfConfig;
use crate::error::{GandalfError, Result};
use crate::project;
use crate::scorer::{self, GitActivity};
use crate::types::{FileEntry, Millis, Score};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

const GIT_ACTIVITY_LOOKBACK_DAYS: u32 = 30;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListFilesInput {
    /// Maximum files to return after ranking (must be >= 0)
    #[serde(default = "default_max_files")]
    pub max_files: i64,
    /// Extension filter, case-insensitive, leading dot optional (empty = all)
    #[serde(default)]
    pub file_types: Vec<String>,
    /// Rank by the relevance scorer rather than lexicographic path order
    #[serde(default = "default_true")]
    pub use_relevance_scoring: bool,
    /// Include dotfiles/dot-directories
    #[serde(default)]
    pub include_hidden: bool,
}

const fn default_max_files() -> i64 {
    1000
}

const fn default_true() -> bool {
    true
}

impl Default for ListFilesInput {
    fn default() -> Self {
        Self { max_files: 1000, file_types: Vec::new(), use_relevance_scoring: true, include_hidden: false }
    }
}

#[derive(Debug, Serialize)]
pub struct ListFilesOutput {
    pub files: Vec<FileEntry>,
    /// Count after filtering and ranking but before the `max_files` truncation.
    pub total_matched: usize,
}

/// Executes `list_project_files`: enumerates, filters, optionally scores
/// and ranks, then truncates — truncation always happens after ranking,
/// never before (§4.3).
pub fn execute_list_files(root: &Path, config: &GandalfConfig, input: ListFilesInput) -> Result<ListFilesOutput> {
    if input.max_files < 0 {
        return Err(GandalfError::InvalidArgument(format!(
            "max_files must be >= 0, got {}",
            input.max_files
        )));
    }
    let max_files = input.max_files as usize;

    let raw_files = project::files::enumerate_files(root, input.include_hidden)?;
    let filtered = raw_files
        .into_iter()
        .filter(|f| project::files::matches_extension_filter(f, &input.file_types));

    let weights = &config.weights;

    let mut entries: Vec<FileEntry> = if input.use_relevance_scoring {
        let recent_commit_file_set = project::git::recent_commit_files(root, GIT_ACTIVITY_LOOKBACK_DAYS);
        let commit_counts = project::git::commit_counts(root, GIT_ACTIVITY_LOOKBACK_DAYS);
        let git = GitActivity { recent_commit_file_set: &recent_commit_file_set, commit_counts: &commit_counts };
        let now = Millis::now();

        filtered
            .map(|f| {
                let score = scorer::score_file(&f, now, weights, &git);
                project::files::into_file_entry(f, score, weights.priority_high_threshold, weights.priority_medium_threshold)
            })
            .collect()
    } else {
        filtered
            .map(|f| project::files::into_file_entry(f, Score::ZERO, weights.priority_high_threshold, weights.priority_medium_threshold))
            .collect()
    };

    if input.use_relevance_scoring {
        scorer::sort_entries(&mut entries);
    } else {
        entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    }

    let total_matched = entries.len();
    entries.truncate(max_files);

    Ok(ListFilesOutput { files: entries, total_matched })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello world").unwrap();
        dir
    }

    #[test]
    fn rejects_negative_max_files() {
        let dir = sample_project();
        let input = ListFilesInput { max_files: -1, ..Default::default() };
        assert!(execute_list_files(dir.path(), &GandalfConfig::default(), input).is_err());
    }

    #[test]
    fn filters_by_extension_case_insensitively() {
        let dir = sample_project();
        let input = ListFilesInput { file_types: vec!["RS".to_string()], ..Default::default() };
        let output = execute_list_files(dir.path(), &GandalfConfig::default(), input).unwrap();
        assert_eq!(output.files.len(), 1);
        assert_eq!(output.files[0].relative_path, "main.rs");
    }

    #[test]
    fn truncates_after_ranking() {
        let dir = sample_project();
        let input = ListFilesInput { max_files: 1, ..Default::default() };
        let output = execute_list_files(dir.path(), &GandalfConfig::default(), input).unwrap();
        assert_eq!(output.files.len(), 1);
        assert_eq!(output.total_matched, 2);
    }

    #[test]
    fn without_scoring_sorts_lexicographically() {
        let dir = sample_project();
        let input = ListFilesInput { use_relevance_scoring: false, ..Default::default() };
        let output = execute_list_files(dir.path(), &GandalfConfig::default(), input).unwrap();
        assert_eq!(output.files[0].relative_path, "main.rs");
        assert_eq!(output.files[1].relative_path, "notes.txt");
    }
}
