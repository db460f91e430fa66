//! Core domain types for gandalf-mcp.
//!
//! These newtypes and structs mirror the normalized data model shared by
//! every conversation source and consumed by the scorer, aggregator,
//! cache, and exporter.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Relevance/activity score in range [0.0, 1.0].
///
/// Saturating constructor ensures scores never exceed bounds,
/// making score merging operations safe.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score(f64);

impl Score {
    /// Zero score.
    pub const ZERO: Self = Self(0.0);

    /// Maximum score.
    pub const MAX: Self = Self(1.0);

    /// Creates a new score, saturating to [0.0, 1.0] bounds.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    /// Creates a score from a value already known to be in bounds.
    #[must_use]
    pub const fn new_unchecked(value: f64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn as_f64(self) -> f64 {
        self.0
    }

    /// Combines two scores with bounded addition, clamped to [0.0, 1.0].
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self::new(self.0 + other.0)
    }

    /// Applies a weight factor to this score.
    #[must_use]
    pub fn weighted(self, weight: f64) -> Self {
        Self::new(self.0 * weight)
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

/// An absolute instant, milliseconds since the Unix epoch.
///
/// Kept as a distinct type (rather than a bare `i64`) so timestamp
/// arithmetic and comparisons across sources can't be confused with
/// unrelated integer fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Millis(pub i64);

impl Millis {
    #[must_use]
    pub const fn new(ms: i64) -> Self {
        Self(ms)
    }

    #[must_use]
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    #[must_use]
    pub fn saturating_sub_days(self, days: i64) -> Self {
        Self(self.0.saturating_sub(days.saturating_mul(86_400_000)))
    }

    #[must_use]
    pub fn saturating_sub_hours(self, hours: i64) -> Self {
        Self(self.0.saturating_sub(hours.saturating_mul(3_600_000)))
    }
}

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which conversation source a record originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Cursor,
    ClaudeCode,
    Windsurf,
}

impl Source {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cursor => "cursor",
            Self::ClaudeCode => "claude_code",
            Self::Windsurf => "windsurf",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Message role within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    Tool,
    System,
}

/// A single normalized message within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: Option<Millis>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Rule-based conversation type classification (comprehensive mode only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationType {
    Architecture,
    Debugging,
    ProblemSolving,
    CodeDiscussion,
    Technical,
    General,
}

impl ConversationType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Architecture => "architecture",
            Self::Debugging => "debugging",
            Self::ProblemSolving => "problem_solving",
            Self::CodeDiscussion => "code_discussion",
            Self::Technical => "technical",
            Self::General => "general",
        }
    }
}

/// A normalized conversation, as emitted by a conversation source adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub source: Source,
    pub workspace_id: String,
    pub title: String,
    pub created_at: Millis,
    pub updated_at: Millis,
    pub prompt_count: u32,
    pub generation_count: u32,
    pub total_exchanges: u32,
    pub messages: Vec<Message>,
    pub activity_score: Score,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<Score>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_type: Option<ConversationType>,
}

impl Conversation {
    /// The `(source, id)` pair the aggregator and cache use for dedup/keying.
    #[must_use]
    pub fn dedup_key(&self) -> (Source, &str) {
        (self.source, self.id.as_str())
    }
}

/// A source-side container grouping conversations together, with totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub workspace_id: String,
    pub path: PathBuf,
    pub conversation_count: u32,
    pub prompt_count: u32,
    pub generation_count: u32,
}

/// Priority tier derived from a file's numeric relevance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    High,
    Medium,
    Low,
}

/// A single file discovered while enumerating the project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub relative_path: String,
    pub size_bytes: u64,
    pub modified_at: Millis,
    pub extension: Option<String>,
    pub is_hidden: bool,
    pub score: Score,
    pub priority_tier: PriorityTier,
}

/// Resolved project context: root, name, git metadata, recent activity sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectContext {
    pub root_absolute_path: PathBuf,
    pub sanitized_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_name: Option<String>,
    pub is_git_repo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_head: Option<String>,
    pub recently_modified_paths: Vec<String>,
    pub recent_commit_file_set: Vec<String>,
}

// Compile-time assertions for thread safety.
#[cfg(test)]
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}

    assert_send_sync::<Score>();
    assert_send_sync::<Millis>();
    assert_send_sync::<Conversation>();
    assert_send_sync::<FileEntry>();
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_saturation() {
        assert_eq!(Score::new(1.5).as_f64(), 1.0);
        assert_eq!(Score::new(-0.5).as_f64(), 0.0);
        assert_eq!(Score::new(0.5).as_f64(), 0.5);
    }

    #[test]
    fn score_merge_saturates() {
        let s1 = Score::new(0.6);
        let s2 = Score::new(0.7);
        assert_eq!(s1.merge(s2).as_f64(), 1.0);
    }

    #[test]
    fn millis_day_arithmetic() {
        let now = Millis::new(10 * 86_400_000);
        let week_ago = now.saturating_sub_days(7);
        assert_eq!(week_ago.0, 3 * 86_400_000);
    }

    #[test]
    fn dedup_key_combines_source_and_id() {
        let conv = Conversation {
            id: "abc".into(),
            source: Source::Cursor,
            workspace_id: "ws1".into(),
            title: "t".into(),
            created_at: Millis::new(0),
            updated_at: Millis::new(0),
            prompt_count: 0,
            generation_count: 0,
            total_exchanges: 0,
            messages: vec![],
            activity_score: Score::ZERO,
            relevance_score: None,
            snippet: None,
            conversation_type: None,
        };
        assert_eq!(conv.dedup_key(), (Source::Cursor, "abc"));
    }
}
