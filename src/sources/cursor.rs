//! Cursor adapter (§4.4): reads one or more `workspaceStorage/*/state.vscdb`
//! SQLite files under Cursor's per-OS user-data directory, read-only.
//!
//! Extracts three logical streams from well-known `ItemTable` key
//! prefixes — composer conversation records, prompt history, and AI
//! generation history — and joins prompts/generations into messages
//! attached to conversations. Where no composer record exists for a
//! workspace, a conversation is synthesized from the prompt/generation
//! streams alone, with an id derived from the workspace hash plus a
//! stable ordinal.

use super::common::parse_timestamp;
use super::{ConversationSource, SourceFilter};
use crate::error::{Result, SourceError};
use crate::types::{Conversation, Message, Millis, Role, Score, Source, Workspace};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

const SOURCE_NAME: &str = "cursor";
const QUERY_TIMEOUT_MS: u32 = 5_000;

const KEY_PROMPTS: &str = "aiService.prompts";
const KEY_GENERATIONS: &str = "aiService.generations";
const COMPOSER_KEY_PREFIX: &str = "composerData:";

pub struct CursorSource {
    workspace_storage_dir: Option<PathBuf>,
}

impl CursorSource {
    #[must_use]
    pub fn new() -> Self {
        Self { workspace_storage_dir: default_workspace_storage_dir() }
    }

    #[must_use]
    pub fn with_workspace_storage_dir(dir: PathBuf) -> Self {
        Self { workspace_storage_dir: Some(dir) }
    }

    fn state_db_files(&self) -> Vec<PathBuf> {
        let Some(dir) = &self.workspace_storage_dir else { return Vec::new() };
        let Ok(entries) = std::fs::read_dir(dir) else { return Vec::new() };

        entries
            .flatten()
            .filter(|e| e.file_type().is_ok_and(|ft| ft.is_dir()))
            .map(|e| e.path().join("state.vscdb"))
            .filter(|p| p.is_file())
            .collect()
    }
}

impl Default for CursorSource {
    fn default() -> Self {
        Self::new()
    }
}

fn default_workspace_storage_dir() -> Option<PathBuf> {
    // Cursor stores its user data under a platform-specific "application
    // support" directory; `dirs::data_dir()` resolves the equivalent root
    // on Linux/macOS/Windows.
    dirs::data_dir().map(|d| d.join("Cursor").join("User").join("workspaceStorage"))
}

impl ConversationSource for CursorSource {
    fn source(&self) -> Source {
        Source::Cursor
    }

    fn detect(&self) -> bool {
        self.workspace_storage_dir.as_deref().is_some_and(Path::is_dir)
    }

    fn store_paths(&self) -> Vec<PathBuf> {
        self.state_db_files()
    }

    fn list_workspaces(&self) -> Result<Vec<Workspace>> {
        let mut workspaces = Vec::new();
        for db_path in self.state_db_files() {
            let workspace_id = workspace_id_for(&db_path);
            match open_readonly(&db_path) {
                Ok(conn) => {
                    let (prompts, generations) = read_streams(&conn).unwrap_or_default();
                    workspaces.push(Workspace {
                        workspace_id,
                        path: db_path.parent().unwrap_or(&db_path).to_path_buf(),
                        conversation_count: composer_ids(&conn).unwrap_or_default().len().max(1) as u32,
                        prompt_count: prompts.len() as u32,
                        generation_count: generations.len() as u32,
                    });
                }
                Err(e) => {
                    tracing::warn!(path = %db_path.display(), error = %e, "skipping unreadable Cursor store");
                }
            }
        }
        Ok(workspaces)
    }

    fn extract(&self, filter: &SourceFilter) -> Result<Vec<Conversation>> {
        let mut conversations = Vec::new();
        for db_path in self.state_db_files() {
            match extract_from_db(&db_path, filter) {
                Ok(mut convs) => conversations.append(&mut convs),
                Err(e) => {
                    tracing::warn!(path = %db_path.display(), error = %e, "skipping corrupt Cursor store");
                }
            }
        }
        Ok(conversations)
    }
}

fn workspace_id_for(db_path: &Path) -> String {
    db_path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn open_readonly(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(|e| {
        SourceError::Unavailable { source: SOURCE_NAME, reason: e.to_string() }
    })?;
    conn.busy_timeout(std::time::Duration::from_millis(u64::from(QUERY_TIMEOUT_MS)))
        .map_err(|e| SourceError::Unavailable { source: SOURCE_NAME, reason: e.to_string() })?;
    Ok(conn)
}

fn item_value(conn: &Connection, key: &str) -> Option<serde_json::Value> {
    let raw: String = conn
        .query_row("SELECT value FROM ItemTable WHERE key = ?1", [key], |row| row.get(0))
        .ok()?;
    serde_json::from_str(&raw).ok()
}

fn read_streams(conn: &Connection) -> Option<(Vec<serde_json::Value>, Vec<serde_json::Value>)> {
    let prompts = item_value(conn, KEY_PROMPTS).and_then(|v| v.as_array().cloned()).unwrap_or_default();
    let generations = item_value(conn, KEY_GENERATIONS).and_then(|v| v.as_array().cloned()).unwrap_or_default();
    Some((prompts, generations))
}

fn composer_ids(conn: &Connection) -> Option<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT key FROM ItemTable WHERE key LIKE ?1")
        .ok()?;
    let pattern = format!("{COMPOSER_KEY_PREFIX}%");
    let rows = stmt.query_map([pattern], |row| row.get::<_, String>(0)).ok()?;
    Some(rows.filter_map(Result::ok).collect())
}

fn extract_from_db(db_path: &Path, filter: &SourceFilter) -> Result<Vec<Conversation>> {
    let conn = open_readonly(db_path)
        .map_err(|_| SourceError::Corrupt { source: SOURCE_NAME, reason: "unable to open state.vscdb".into() })?;

    let workspace_id = workspace_id_for(db_path);
    let composer_keys = composer_ids(&conn).unwrap_or_default();

    let mut conversations = Vec::new();

    if composer_keys.is_empty() {
        if let Some(conv) = synthesize_from_streams(&conn, &workspace_id, filter) {
            conversations.push(conv);
        }
    } else {
        for (ordinal, key) in composer_keys.iter().enumerate() {
            if let Some(conv) = conversation_from_composer(&conn, key, &workspace_id, ordinal, filter) {
                conversations.push(conv);
            }
        }
    }

    Ok(conversations)
}

fn conversation_from_composer(
    conn: &Connection,
    key: &str,
    workspace_id: &str,
    ordinal: usize,
    filter: &SourceFilter,
) -> Option<Conversation> {
    let raw: String = conn.query_row("SELECT value FROM ItemTable WHERE key = ?1", [key], |row| row.get(0)).ok()?;
    let composer: serde_json::Value = serde_json::from_str(&raw).ok()?;

    let composer_id = key.trim_start_matches(COMPOSER_KEY_PREFIX).to_string();
    let id = if composer_id.is_empty() { format!("{workspace_id}-composer-{ordinal}") } else { composer_id };

    let messages = composer
        .get("conversation")
        .or_else(|| composer.get("messages"))
        .and_then(|v| v.as_array())
        .map(|blocks| blocks.iter().filter_map(message_from_value).collect::<Vec<_>>())
        .unwrap_or_default();

    build_conversation(id, workspace_id.to_string(), messages, composer.get("name").and_then(|v| v.as_str()), filter)
}

fn synthesize_from_streams(conn: &Connection, workspace_id: &str, filter: &SourceFilter) -> Option<Conversation> {
    let (prompts, generations) = read_streams(conn)?;
    if prompts.is_empty() && generations.is_empty() {
        return None;
    }

    let mut messages: Vec<Message> = Vec::new();
    for (ordinal, prompt) in prompts.iter().enumerate() {
        let text = prompt.get("text").and_then(|v| v.as_str()).unwrap_or("").to_string();
        if text.is_empty() {
            continue;
        }
        let timestamp = prompt.get("timestamp").and_then(parse_timestamp).or_else(|| Some(Millis::new(ordinal as i64)));
        messages.push(Message { role: Role::User, content: text, timestamp, metadata: Default::default() });
    }
    for (ordinal, generation) in generations.iter().enumerate() {
        let text = generation
            .get("textDescription")
            .or_else(|| generation.get("text"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        if text.is_empty() {
            continue;
        }
        let timestamp = generation.get("timestamp").and_then(parse_timestamp).or_else(|| Some(Millis::new(ordinal as i64)));
        messages.push(Message { role: Role::Assistant, content: text, timestamp, metadata: Default::default() });
    }
    messages.sort_by_key(|m| m.timestamp.map_or(i64::MAX, |t| t.0));

    let id = format!("{workspace_id}-synthesized-0");
    build_conversation(id, workspace_id.to_string(), messages, None, filter)
}

fn message_from_value(val: &serde_json::Value) -> Option<Message> {
    let role_str = val.get("type").and_then(|v| v.as_str()).or_else(|| val.get("role").and_then(|v| v.as_str()))?;
    let role = match role_str {
        "ai" | "assistant" | "1" => Role::Assistant,
        "tool" => Role::Tool,
        _ => Role::User,
    };
    let content = val.get("text").or_else(|| val.get("content")).and_then(|v| v.as_str())?.to_string();
    let timestamp = val.get("timestamp").and_then(parse_timestamp);
    Some(Message { role, content, timestamp, metadata: Default::default() })
}

fn build_conversation(
    id: String,
    workspace_id: String,
    messages: Vec<Message>,
    title_hint: Option<&str>,
    filter: &SourceFilter,
) -> Option<Conversation> {
    if messages.is_empty() {
        return None;
    }

    let created_at = messages.iter().filter_map(|m| m.timestamp).min().unwrap_or_else(Millis::now);
    let updated_at = messages.iter().filter_map(|m| m.timestamp).max().unwrap_or(created_at);

    let cutoff = Millis::now().saturating_sub_days(i64::from(filter.days_lookback));
    if updated_at.0 < cutoff.0 {
        return None;
    }

    let prompt_count = messages.iter().filter(|m| m.role == Role::User).count() as u32;
    let generation_count = messages.iter().filter(|m| m.role == Role::Assistant).count() as u32;

    let title = title_hint
        .map(ToString::to_string)
        .or_else(|| messages.iter().find(|m| m.role == Role::User).map(|m| truncate_title(&m.content, 100)))
        .unwrap_or_else(|| "Untitled conversation".to_string());

    let age_days = (Millis::now().0 - updated_at.0).max(0) as f64 / 86_400_000.0;
    let recency = (1.0 - age_days / 30.0).clamp(0.0, 1.0);
    let volume = (f64::from(prompt_count + generation_count) / 20.0).min(1.0);
    let activity_score = Score::new(0.7 * recency + 0.3 * volume);

    let retained_messages = if filter.fast_mode { Vec::new() } else { messages };

    Some(Conversation {
        id,
        source: Source::Cursor,
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
    })
}

fn truncate_title(text: &str, max_len: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_len {
        return trimmed.to_string();
    }
    let truncated: String = trimmed.chars().take(max_len).collect();
    format!("{truncated}...")
}
