//! `get_project_info` tool (§4.1, §4.2).

use crate::error::Result;
use crate::project;
use crate::types::ProjectContext;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProjectInfoInput {
    /// Attach a stats block (file counts, activity totals) alongside the context
    #[serde(default = "default_include_stats")]
    pub include_stats: bool,
}

const fn default_include_stats() -> bool {
    true
}

impl Default for ProjectInfoInput {
    fn default() -> Self {
        Self { include_stats: true }
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectStats {
    pub total_files: usize,
    pub recent_commit_file_count: usize,
    pub recently_modified_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ProjectInfoOutput {
    #[serde(flatten)]
    pub context: ProjectContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ProjectStats>,
}

/// Executes `get_project_info`: resolves git metadata and recent-activity
/// sets for `root`, optionally attaching a file-count stats block.
pub fn execute_project_info(root: &Path, input: ProjectInfoInput) -> Result<ProjectInfoOutput> {
    let context = project::build_context(root);

    let stats = if input.include_stats {
        let total_files = project::files::enumerate_files(root, false)?.len();
        Some(ProjectStats {
            total_files,
            recent_commit_file_count: context.recent_commit_file_set.len(),
            recently_modified_count: context.recently_modified_paths.len(),
        })
    } else {
        None
    };

    Ok(ProjectInfoOutput { context, stats })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_stats_by_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
        let output = execute_project_info(dir.path(), ProjectInfoInput { include_stats: true }).unwrap();
        assert_eq!(output.stats.unwrap().total_files, 1);
    }

    #[test]
    fn omits_stats_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let output = execute_project_info(dir.path(), ProjectInfoInput { include_stats: false }).unwrap();
        assert!(output.stats.is_none());
    }

    #[test]
    fn reports_non_git_repo() {
        let dir = tempfile::tempdir().unwrap();
        let output = execute_project_info(dir.path(), ProjectInfoInput::default()).unwrap();
        assert!(!output.context.is_git_repo);
    }
}
