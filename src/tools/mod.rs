//! MCP tool implementations (§4.1). Each submodule follows the same
//! shape: an `*Input`/`*Output` struct pair plus a free `execute_*`
//! function that holds all the business logic, independent of the MCP
//! transport plumbing in [`crate::server`].

pub mod export;
pub mod list_files;
pub mod project_info;
pub mod recall;
pub mod search;
pub mod version;

pub use export::{execute_export, ExportInput, ExportOutput};
pub use list_files::{execute_list_files, ListFilesInput, ListFilesOutput};
pub use project_info::{execute_project_info, ProjectInfoInput, ProjectInfoOutput};
pub use recall::{execute_recall, RecallInput, RecallOutput};
pub use search::{execute_search, SearchInput, SearchOutput};
pub use version::{execute_version, VersionInput, VersionOutput};

use crate::aggregator::AggregateFilter;
use crate::cache::{Cache, FingerprintInput};
use crate::config::GandalfConfig;
use crate::error::{GandalfError, Result};
use crate::sources::ConversationSource;
use std::path::PathBuf;
use std::time::Duration;

/// Per-request deadline for the common case (§5).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Deadline for comprehensive (`fast_mode = false`) recall.
pub const COMPREHENSIVE_RECALL_TIMEOUT_SECS: u64 = 120;
/// Deadline for export, which additionally writes files to disk.
pub const EXPORT_TIMEOUT_SECS: u64 = 600;

/// Runs `fut` under a deadline, surfacing [`GandalfError::Timeout`] on
/// expiry. True cooperative cancellation of in-flight `rayon` work isn't
/// wired through the source adapters, so the build keeps running in the
/// background past the deadline and still populates the cache for the
/// next caller; this only bounds how long the *current* request waits.
pub async fn with_timeout<T, Fut>(seconds: u64, fut: Fut) -> Result<T>
where
    Fut: std::future::Future<Output = Result<T>>,
{
    match tokio::time::timeout(Duration::from_secs(seconds), fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(seconds, "request deadline exceeded");
            Err(GandalfError::Timeout { seconds })
        }
    }
}

/// The partial result a timed-out `recall`/`search` call returns instead
/// of a hard failure: no conversations, but `partial = true` so the
/// caller knows the window was cut short rather than genuinely empty.
#[must_use]
pub fn timed_out_result(seconds: u64) -> crate::aggregator::AggregateResult {
    crate::aggregator::AggregateResult {
        conversations: Vec::new(),
        source_errors: Vec::new(),
        processing_stats: crate::aggregator::ProcessingStats {
            total_processed: 0,
            skipped: 0,
            efficiency_percent: 0.0,
            extract_seconds: seconds as f64,
            filter_seconds: 0.0,
            sort_seconds: 0.0,
        },
        partial: true,
    }
}

/// Shared, request-independent state handed to every tool: the resolved
/// project root, the effective config, the fixed adapter list, and the
/// on-disk cache. Cheap to share behind an `Arc` since every field is
/// itself `Send + Sync`.
pub struct ToolContext {
    pub project_root: PathBuf,
    pub gandalf_home: PathBuf,
    pub config: GandalfConfig,
    pub sources: Vec<Box<dyn ConversationSource>>,
    pub cache: Cache,
}

/// Builds the §4.6 cache key: the ordered source list, normalized
/// filter, and the `(path, size, mtime_ns)` tuple of every store each
/// source touches, so a changed conversation store invalidates the
/// cache even within the TTL window.
#[must_use]
pub fn cache_key(ctx: &ToolContext, filter: &AggregateFilter, sort_label: &str) -> String {
    let mut fingerprint = FingerprintInput::new()
        .field("sort", sort_label)
        .field("days_lookback", filter.days_lookback)
        .field("limit", filter.limit)
        .field("fast_mode", filter.fast_mode)
        .field("query", filter.query.as_deref().unwrap_or(""))
        .field("conversation_types", filter.conversation_types.join(","))
        .field("project_root", ctx.project_root.display());

    for source in &ctx.sources {
        fingerprint = fingerprint.field("source", source.source().as_str());
        for path in source.store_paths() {
            fingerprint = fingerprint.store_stat(&path);
        }
    }

    fingerprint.finish()
}
