//! Common test fixtures for gandalf-mcp integration tests.

#![allow(dead_code)]

use gandalf_mcp::cache::Cache;
use gandalf_mcp::config::GandalfConfig;
use gandalf_mcp::sources::claude_code::ClaudeCodeSource;
use gandalf_mcp::sources::ConversationSource;
use gandalf_mcp::tools::ToolContext;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// An isolated project root plus a separate Gandalf home, both cleaned up
/// on drop.
pub struct TestEnv {
    pub project: TempDir,
    pub home: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self { project: TempDir::new().expect("project tempdir"), home: TempDir::new().expect("home tempdir") }
    }

    pub fn write_file(&self, relative: &str, content: &str) {
        let path = self.project.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, content).expect("write fixture file");
    }

    /// Initializes a git repo at the project root on branch `main` with
    /// one commit, so `is_git_repo`/`current_branch` resolve deterministically.
    pub fn init_git_repo(&self) {
        let run = |args: &[&str]| {
            Command::new("git")
                .args(args)
                .current_dir(self.project.path())
                .env("GIT_AUTHOR_NAME", "test")
                .env("GIT_AUTHOR_EMAIL", "test@example.com")
                .env("GIT_COMMITTER_NAME", "test")
                .env("GIT_COMMITTER_EMAIL", "test@example.com")
                .output()
                .expect("run git");
        };
        run(&["init", "-q", "-b", "main"]);
        run(&["add", "-A"]);
        run(&["commit", "-q", "-m", "initial", "--allow-empty"]);
    }

    /// Builds a `ToolContext` wired to a single `ClaudeCodeSource` pointed
    /// at `claude_projects_dir` (or no sources at all if `None`).
    pub fn tool_context(&self, claude_projects_dir: Option<PathBuf>) -> Arc<ToolContext> {
        let sources: Vec<Box<dyn ConversationSource>> = match claude_projects_dir {
            Some(dir) => vec![Box::new(ClaudeCodeSource::with_projects_dir(dir))],
            None => Vec::new(),
        };
        Arc::new(ToolContext {
            project_root: self.project.path().to_path_buf(),
            gandalf_home: self.home.path().to_path_buf(),
            config: GandalfConfig::default(),
            sources,
            cache: Cache::new(self.home.path().join("cache"), Duration::from_secs(3600)),
        })
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes one Claude Code session file under `projects_dir` with the
/// given messages, each `(role, content, timestamp_ms)`. Returns the
/// project directory used (a fixed, sanitized workspace key).
pub fn write_claude_session(
    projects_dir: &std::path::Path,
    session_id: &str,
    messages: &[(&str, &str, i64)],
) {
    let project_dir = projects_dir.join("-tmp-proj");
    std::fs::create_dir_all(&project_dir).expect("create claude project dir");

    let lines: Vec<String> = messages
        .iter()
        .map(|(role, content, ts)| {
            serde_json::json!({
                "type": role,
                "message": { "role": role, "content": content },
                "timestamp": ts,
            })
            .to_string()
        })
        .collect();

    let path = project_dir.join(format!("{session_id}.jsonl"));
    std::fs::write(&path, lines.join("\n") + "\n").expect("write session jsonl");
}
