//! Project context: root resolution, git metadata, and file enumeration
//! (§4.2).

pub mod files;
pub mod git;

use crate::error::{ProjectError, Result};
use crate::types::ProjectContext;
use std::path::{Path, PathBuf};

const RECENT_COMMIT_LOOKBACK_DAYS: u32 = 30;

/// Resolves the effective project root following the precedence order in
/// §4.2: an explicit CLI flag, `WORKSPACE_FOLDER_PATHS`, the enclosing git
/// top-level, `PWD`, and finally the process's current directory. The
/// result is canonicalized (symlinks resolved).
pub fn resolve_root(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return canonicalize_existing(path);
    }

    if let Some(path) = first_existing_workspace_folder() {
        return canonicalize_existing(&path);
    }

    if let Ok(cwd) = std::env::current_dir() {
        if let Some(toplevel) = git::find_toplevel(&cwd) {
            if toplevel.exists() {
                return canonicalize_existing(&toplevel);
            }
        }
    }

    if let Some(pwd) = std::env::var_os("PWD").map(PathBuf::from) {
        if pwd.exists() {
            return canonicalize_existing(&pwd);
        }
    }

    let cwd = std::env::current_dir().map_err(|_| ProjectError::NoRoot)?;
    canonicalize_existing(&cwd)
}

fn first_existing_workspace_folder() -> Option<PathBuf> {
    let raw = std::env::var("WORKSPACE_FOLDER_PATHS").ok()?;
    raw.split(':')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn canonicalize_existing(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(ProjectError::RootNotFound { path: path.to_path_buf() }.into());
    }
    dunce::canonicalize(path).map_err(|e| {
        ProjectError::Walk { path: path.to_path_buf(), source: e }.into()
    })
}

/// Sanitizes a project directory name, replacing any character outside
/// `[A-Za-z0-9._-]` with `_`. Returns `(sanitized, was_altered)`.
#[must_use]
pub fn sanitize_name(raw: &str) -> (String, bool) {
    let sanitized: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    let altered = sanitized != raw;
    (sanitized, altered)
}

/// Builds the full [`ProjectContext`] for `root`: name sanitization, git
/// metadata (best-effort, non-fatal on failure), and the recent-activity
/// sets the relevance scorer's git-activity factor consumes.
#[must_use]
pub fn build_context(root: &Path) -> ProjectContext {
    let raw_name = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| root.to_string_lossy().to_string());
    let (sanitized_name, altered) = sanitize_name(&raw_name);

    let is_git_repo = git::is_git_repo(root);
    let current_branch = is_git_repo.then(|| git::current_branch(root)).flatten();
    let git_head = is_git_repo.then(|| git::head_commit(root)).flatten();
    let recent_commit_file_set = if is_git_repo {
        git::recent_commit_files(root, RECENT_COMMIT_LOOKBACK_DAYS)
    } else {
        Vec::new()
    };

    let recently_modified_paths = recently_modified(root);

    ProjectContext {
        root_absolute_path: root.to_path_buf(),
        sanitized_name,
        raw_name: altered.then(|| raw_name.clone()),
        is_git_repo,
        current_branch,
        git_head,
        recently_modified_paths,
        recent_commit_file_set,
    }
}

/// Files modified within the last 24 hours, used for `recently_modified_paths`.
fn recently_modified(root: &Path) -> Vec<String> {
    const WINDOW: std::time::Duration = std::time::Duration::from_secs(24 * 3600);
    let Ok(files) = files::enumerate_files(root, false) else { return Vec::new() };
    let now = std::time::SystemTime::now();

    let mut recent: Vec<String> = files
        .into_iter()
        .filter(|f| {
            let modified = std::time::UNIX_EPOCH + std::time::Duration::from_millis(f.modified_at.0.max(0) as u64);
            now.duration_since(modified).is_ok_and(|age| age <= WINDOW)
        })
        .map(|f| f.relative_path)
        .collect();
    recent.sort();
    recent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_disallowed_characters() {
        let (sanitized, altered) = sanitize_name("my project!");
        assert_eq!(sanitized, "my_project_");
        assert!(altered);
    }

    #[test]
    fn sanitize_leaves_clean_names_untouched() {
        let (sanitized, altered) = sanitize_name("my-project_1.0");
        assert_eq!(sanitized, "my-project_1.0");
        assert!(!altered);
    }

    #[test]
    fn resolve_root_rejects_nonexistent_explicit_path() {
        let result = resolve_root(Some(Path::new("/definitely/does/not/exist/xyz")));
        assert!(result.is_err());
    }

    #[test]
    fn resolve_root_accepts_explicit_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_root(Some(dir.path())).unwrap();
        assert!(resolved.exists());
    }

    #[test]
    fn build_context_for_non_git_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = build_context(dir.path());
        assert!(!ctx.is_git_repo);
        assert_eq!(ctx.current_branch, None);
        assert!(ctx.recent_commit_file_set.is_empty());
    }
}
