//! `search_conversations` tool (§4.1, §4.5, §4.6).

use crate::aggregator::{self, AggregateFilter, AggregateResult, SortBy};
use crate::error::{GandalfError, Result, SourceError};
use crate::tools::{cache_key, timed_out_result, with_timeout, ToolContext, DEFAULT_TIMEOUT_SECS};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchInput {
    /// Search query (1..=10000 characters).
    pub query: String,
    /// Maximum conversations to return.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// How many days back to look.
    #[serde(default = "default_days_lookback")]
    pub days_lookback: u32,
    /// Keep full message bodies in the response rather than just the
    /// matched snippet.
    #[serde(default)]
    pub include_content: bool,
}

const fn default_limit() -> usize {
    10
}
const fn default_days_lookback() -> u32 {
    30
}

pub type SearchOutput = AggregateResult;

/// Executes `search_conversations`: validates the query, builds the
/// §4.6 cache key, resolves the aggregation (cached or freshly built),
/// then strips message bodies down to the matched snippet unless the
/// caller asked to keep them.
pub async fn execute_search(ctx: &Arc<ToolContext>, input: SearchInput) -> Result<SearchOutput> {
    let query_len = input.query.chars().count();
    if query_len == 0 || query_len > 10_000 {
        return Err(GandalfError::InvalidArgument(format!(
            "query must be 1..=10000 characters, got {query_len}"
        )));
    }

    let filter = AggregateFilter {
        days_lookback: input.days_lookback,
        limit: input.limit,
        fast_mode: false,
        query: Some(input.query.clone()),
        conversation_types: Vec::new(),
    };

    let key = cache_key(ctx, &filter, "relevance");

    let build_ctx = Arc::clone(ctx);
    let build_filter = filter.clone();
    let build = ctx.cache.get_or_build(&key, None, move || async move {
        let result = tokio::task::spawn_blocking(move || {
            aggregator::aggregate(&build_ctx.sources, None, &build_filter, SortBy::Relevance)
        })
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

        Ok(result)
    });

    let mut result = match with_timeout(DEFAULT_TIMEOUT_SECS, build).await {
        Err(GandalfError::Timeout { seconds }) => timed_out_result(seconds),
        other => other?,
    };

    if !input.include_content {
        for conv in &mut result.conversations {
            conv.messages.clear();
        }
    }

    Ok(result)
}
