//! Conversation source adapters (§4.4): pluggable discovery/extraction
//! for each agentic tool's on-disk conversation store.
//!
//! Each adapter implements the same explicit capability set named by the
//! spec — `detect`, `list_workspaces`, `extract` — replacing the
//! duck-typed, implicitly-interfaced adapters of the source system (§9).
//! Sources are enumerated once at startup into a fixed, ordered list.

pub mod claude_code;
pub mod classify;
pub mod common;
pub mod cursor;
pub mod windsurf;

use crate::error::Result;
use crate::types::{Conversation, Source, Workspace};
use std::path::PathBuf;

/// Filter parameters threaded into every adapter's `extract` call.
#[derive(Debug, Clone)]
pub struct SourceFilter {
    pub days_lookback: u32,
    pub fast_mode: bool,
}

/// The capability set every conversation source implements.
pub trait ConversationSource: Send + Sync {
    /// Which [`Source`] tag this adapter produces.
    fn source(&self) -> Source;

    /// Whether this source has any data on this host.
    fn detect(&self) -> bool;

    /// On-disk store paths this adapter reads, for cache fingerprinting
    /// (§4.6) — each touched store's `(path, size, mtime_ns)` feeds the
    /// cache key.
    fn store_paths(&self) -> Vec<PathBuf>;

    /// Ordered workspaces with totals.
    fn list_workspaces(&self) -> Result<Vec<Workspace>>;

    /// Normalized conversations matching `filter`. In fast mode,
    /// `messages` is left empty on every returned conversation.
    fn extract(&self, filter: &SourceFilter) -> Result<Vec<Conversation>>;
}

/// Builds the fixed, ordered list of all known adapters. Detection is
/// evaluated lazily by the aggregator, not here.
#[must_use]
pub fn all_sources() -> Vec<Box<dyn ConversationSource>> {
    vec![
        Box::new(cursor::CursorSource::new()),
        Box::new(claude_code::ClaudeCodeSource::new()),
        Box::new(windsurf::WindsurfSource::new()),
    ]
}
