//! `export_individual_conversations` tool (§4.1, §4.7).

use crate::aggregator::{self, AggregateFilter, SortBy};
use crate::error::{GandalfError, Result, SourceError};
use crate::exporter::{self, ExportFormat};
use crate::tools::{with_timeout, ToolContext, EXPORT_TIMEOUT_SECS};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Conversations older than this many days are never candidates for
/// export; there is no `days_lookback` RPC argument for this tool, so
/// this stands in as a generous ceiling rather than an unbounded scan.
const EXPORT_LOOKBACK_DAYS: u32 = 365;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExportInput {
    /// Maximum conversations to export.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// One of `json`, `md`, `txt`.
    #[serde(default = "default_format")]
    pub format: String,
    /// Destination directory. Relative paths are resolved under the
    /// Gandalf home directory; defaults to `<home>/exports`.
    #[serde(default)]
    pub output_dir: Option<String>,
    /// Restrict to these conversation types.
    #[serde(default)]
    pub conversation_types: Vec<String>,
}

const fn default_limit() -> usize {
    20
}

fn default_format() -> String {
    "json".to_string()
}

#[derive(Debug, Serialize)]
pub struct ExportOutput {
    pub files_written: Vec<PathBuf>,
    pub conversation_count: usize,
}

/// Executes `export_individual_conversations`: gathers matching
/// conversations (uncached — exporting is a write operation, not an
/// idempotent read), then renders each to its own file under
/// `output_dir` (§4.7), bounded by a single deadline covering both steps.
pub async fn execute_export(ctx: &Arc<ToolContext>, input: ExportInput) -> Result<ExportOutput> {
    with_timeout(EXPORT_TIMEOUT_SECS, run_export(ctx, input)).await
}

async fn run_export(ctx: &Arc<ToolContext>, input: ExportInput) -> Result<ExportOutput> {
    let format = ExportFormat::parse(&input.format)?;

    let output_dir = input.output_dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("exports"));

    let filter = AggregateFilter {
        days_lookback: EXPORT_LOOKBACK_DAYS,
        limit: input.limit,
        fast_mode: false,
        query: None,
        conversation_types: input.conversation_types,
    };

    let build_ctx = Arc::clone(ctx);
    let result = tokio::task::spawn_blocking(move || aggregator::aggregate(&build_ctx.sources, None, &filter, SortBy::Activity))
        .await
        .map_err(|e| GandalfError::Internal(e.to_string()))?;

    if aggregator::all_sources_failed(&result) {
        let reason = result
            .source_errors
            .iter()
            .map(|e| format!("{}: {}", e.source.as_str(), e.message))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(GandalfError::Source(SourceError::Unavailable { source: "all", reason }));
    }

    let gandalf_home = ctx.gandalf_home.clone();
    let conversations = result.conversations;
    let files_written = tokio::task::spawn_blocking(move || {
        exporter::export_conversations(&gandalf_home, &output_dir, &conversations, format)
    })
    .await
    .map_err(|e| GandalfError::Internal(e.to_string()))??;

    Ok(ExportOutput { conversation_count: files_written.len(), files_written })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Cache;
    use crate::config::GandalfConfig;
    use std::time::Duration;

    fn empty_ctx() -> (tempfile::TempDir, Arc<ToolContext>) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Arc::new(ToolContext {
            project_root: dir.path().to_path_buf(),
            gandalf_home: dir.path().to_path_buf(),
            config: GandalfConfig::default(),
            sources: Vec::new(),
            cache: Cache::new(dir.path().join("cache"), Duration::from_secs(3600)),
        });
        (dir, ctx)
    }

    #[tokio::test]
    async fn rejects_unknown_format() {
        let (_dir, ctx) = empty_ctx();
        let input = ExportInput { limit: 20, format: "yaml".to_string(), output_dir: None, conversation_types: Vec::new() };
        assert!(execute_export(&ctx, input).await.is_err());
    }

    #[tokio::test]
    async fn no_conversations_writes_nothing_and_does_not_fail() {
        let (_dir, ctx) = empty_ctx();
        let input = ExportInput { limit: 20, format: "json".to_string(), output_dir: None, conversation_types: Vec::new() };
        let output = execute_export(&ctx, input).await.unwrap();
        assert_eq!(output.conversation_count, 0);
        assert!(output.files_written.is_empty());
    }
}
