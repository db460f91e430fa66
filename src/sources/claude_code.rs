//! Claude Code adapter (§4.4): walks `~/.claude/projects/*/*.jsonl`.
//! Each file is one conversation; each line is a message object.
//!
//! JSONL shape and the project-directory naming scheme are grounded in
//! observed Claude Code session layouts from this codebase family: every
//! non-alphanumeric character in a workspace path becomes `-` to form the
//! project directory name.

use super::common::{flatten_content, parse_timestamp};
use super::{ConversationSource, SourceFilter};
use crate::error::{Result, SourceError};
use crate::types::{Conversation, Message, Millis, Role, Score, Source, Workspace};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

const SOURCE_NAME: &str = "claude_code";

pub struct ClaudeCodeSource {
    projects_dir: Option<PathBuf>,
}

impl ClaudeCodeSource {
    #[must_use]
    pub fn new() -> Self {
        Self { projects_dir: default_projects_dir() }
    }

    #[must_use]
    pub fn with_projects_dir(dir: PathBuf) -> Self {
        Self { projects_dir: Some(dir) }
    }

    fn session_files(&self) -> Vec<PathBuf> {
        let Some(dir) = &self.projects_dir else { return Vec::new() };
        let Ok(project_entries) = std::fs::read_dir(dir) else { return Vec::new() };

        let mut files = Vec::new();
        for project in project_entries.flatten() {
            if !project.file_type().is_ok_and(|ft| ft.is_dir()) {
                continue;
            }
            let Ok(session_entries) = std::fs::read_dir(project.path()) else { continue };
            for session in session_entries.flatten() {
                let path = session.path();
                if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
                    files.push(path);
                }
            }
        }
        files
    }
}

impl Default for ClaudeCodeSource {
    fn default() -> Self {
        Self::new()
    }
}

fn default_projects_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".claude").join("projects"))
}

/// Reverse-engineered project directory key: every non-alphanumeric
/// character in the workspace path becomes `-`.
#[must_use]
pub fn project_dir_key(workspace: &Path) -> String {
    workspace
        .to_string_lossy()
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '-' })
        .collect()
}

impl ConversationSource for ClaudeCodeSource {
    fn source(&self) -> Source {
        Source::ClaudeCode
    }

    fn detect(&self) -> bool {
        self.projects_dir.as_deref().is_some_and(Path::is_dir)
    }

    fn store_paths(&self) -> Vec<PathBuf> {
        self.session_files()
    }

    fn list_workspaces(&self) -> Result<Vec<Workspace>> {
        let Some(dir) = &self.projects_dir else { return Ok(Vec::new()) };
        let Ok(entries) = std::fs::read_dir(dir) else { return Ok(Vec::new()) };

        let mut workspaces = Vec::new();
        for entry in entries.flatten() {
            if !entry.file_type().is_ok_and(|ft| ft.is_dir()) {
                continue;
            }
            let path = entry.path();
            let conversation_count = std::fs::read_dir(&path)
                .map(|it| it.flatten().filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("jsonl")).count())
                .unwrap_or(0) as u32;
            workspaces.push(Workspace {
                workspace_id: entry.file_name().to_string_lossy().to_string(),
                path,
                conversation_count,
                prompt_count: 0,
                generation_count: 0,
            });
        }
        Ok(workspaces)
    }

    fn extract(&self, filter: &SourceFilter) -> Result<Vec<Conversation>> {
        let mut conversations = Vec::new();
        for path in self.session_files() {
            match parse_session_file(&path, filter) {
                Ok(Some(conv)) => conversations.push(conv),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable Claude Code session");
                }
            }
        }
        Ok(conversations)
    }
}

fn parse_session_file(path: &Path, filter: &SourceFilter) -> Result<Option<Conversation>> {
    let file = std::fs::File::open(path).map_err(|e| SourceError::Io { source: SOURCE_NAME, error: e })?;
    let reader = BufReader::new(file);

    let workspace_id = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let id = path.file_stem().and_then(|s| s.to_str()).unwrap_or("unknown").to_string();

    let mut messages = Vec::new();
    let mut first_timestamp: Option<Millis> = None;
    let mut last_timestamp: Option<Millis> = None;

    for line in reader.lines() {
        let Ok(line) = line else { continue };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Ok(entry) = serde_json::from_str::<serde_json::Value>(trimmed) else { continue };

        let entry_type = entry.get("type").and_then(|v| v.as_str());
        if !matches!(entry_type, Some("user") | Some("assistant")) {
            continue;
        }

        let role_str = entry.pointer("/message/role").and_then(|v| v.as_str()).or(entry_type).unwrap_or("user");
        let role = match role_str {
            "assistant" => Role::Assistant,
            "tool" => Role::Tool,
            "system" => Role::System,
            _ => Role::User,
        };

        let content_value = entry.pointer("/message/content").or_else(|| entry.get("content"));
        let content = content_value.map(flatten_content).unwrap_or_default();
        if content.trim().is_empty() {
            continue;
        }

        let timestamp = entry
            .get("timestamp")
            .or_else(|| entry.pointer("/message/timestamp"))
            .and_then(parse_timestamp);

        if let Some(ts) = timestamp {
            first_timestamp = Some(first_timestamp.map_or(ts, |f| if ts.0 < f.0 { ts } else { f }));
            last_timestamp = Some(last_timestamp.map_or(ts, |l| if ts.0 > l.0 { ts } else { l }));
        }

        messages.push(Message { role, content, timestamp, metadata: Default::default() });
    }

    if messages.is_empty() {
        return Ok(None);
    }

    let updated_at = last_timestamp.unwrap_or_else(Millis::now);
    let cutoff = Millis::now().saturating_sub_days(i64::from(filter.days_lookback));
    if updated_at.0 < cutoff.0 {
        return Ok(None);
    }

    let created_at = first_timestamp.unwrap_or(updated_at);
    let prompt_count = messages.iter().filter(|m| m.role == Role::User).count() as u32;
    let generation_count = messages.iter().filter(|m| m.role == Role::Assistant).count() as u32;

    let title = messages
        .iter()
        .find(|m| m.role == Role::User)
        .map(|m| truncate_title(&m.content, 100))
        .unwrap_or_else(|| "Untitled conversation".to_string());

    let activity_score = activity_score(updated_at, prompt_count + generation_count);

    let retained_messages = if filter.fast_mode { Vec::new() } else { messages };

    Ok(Some(Conversation {
        id,
        source: Source::ClaudeCode,
        workspace_id,
        title,
        created_at,
        updated_at,
        prompt_count,
        generation_count,
        total_exchanges: prompt_count + generation_count,
        messages: retained_messages,
        activity_score,
        relevance_score: None,
        snippet: None,
        conversation_type: None,
    }))
}

fn truncate_title(text: &str, max_len: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_len {
        return trimmed.to_string();
    }
    let truncated: String = trimmed.chars().take(max_len).collect();
    format!("{truncated}...")
}

fn activity_score(updated_at: Millis, exchange_count: u32) -> Score {
    let age_days = (Millis::now().0 - updated_at.0).max(0) as f64 / 86_400_000.0;
    let recency = (1.0 - age_days / 30.0).clamp(0.0, 1.0);
    let volume = (f64::from(exchange_count) / 20.0).min(1.0);
    Score::new(0.7 * recency + 0.3 * volume)
}
