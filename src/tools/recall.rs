//! `recall_conversations` tool (§4.1, §4.5, §4.6).

use crate::aggregator::{self, AggregateFilter, AggregateResult, SortBy};
use crate::error::{GandalfError, Result, SourceError};
use crate::tools::{
    cache_key, timed_out_result, with_timeout, ToolContext, COMPREHENSIVE_RECALL_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RecallInput {
    /// Skip full message bodies and per-message classification for speed.
    #[serde(default = "default_fast_mode")]
    pub fast_mode: bool,
    /// How many days back to look (1..=365).
    #[serde(default = "default_days_lookback")]
    pub days_lookback: u32,
    /// Maximum conversations to return (0..=1000).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Restrict to these conversation types. Only honored when `fast_mode`
    /// is `false`, since classification requires message content.
    #[serde(default)]
    pub conversation_types: Vec<String>,
}

const fn default_fast_mode() -> bool {
    true
}
const fn default_days_lookback() -> u32 {
    7
}
const fn default_limit() -> usize {
    20
}

impl Default for RecallInput {
    fn default() -> Self {
        Self { fast_mode: true, days_lookback: 7, limit: 20, conversation_types: Vec::new() }
    }
}

pub type RecallOutput = AggregateResult;

/// Executes `recall_conversations`: validates inputs, builds the §4.6
/// cache key, and either serves a cached aggregation or builds one (at
/// most once per key across concurrent callers).
pub async fn execute_recall(ctx: &Arc<ToolContext>, input: RecallInput) -> Result<RecallOutput> {
    if !(1..=365).contains(&input.days_lookback) {
        return Err(GandalfError::InvalidArgument(format!(
            "days_lookback must be in 1..=365, got {}",
            input.days_lookback
        )));
    }
    if input.limit > 1000 {
        return Err(GandalfError::InvalidArgument(format!("limit must be in 0..=1000, got {}", input.limit)));
    }

    let conversation_types = if input.fast_mode { Vec::new() } else { input.conversation_types };

    let filter = AggregateFilter {
        days_lookback: input.days_lookback,
        limit: input.limit,
        fast_mode: input.fast_mode,
        query: None,
        conversation_types,
    };

    let key = cache_key(ctx, &filter, "activity");
    let timeout_secs = if filter.fast_mode { DEFAULT_TIMEOUT_SECS } else { COMPREHENSIVE_RECALL_TIMEOUT_SECS };

    let build_ctx = Arc::clone(ctx);
    let build_filter = filter.clone();
    let build = ctx.cache.get_or_build(&key, None, move || async move {
        let result = tokio::task::spawn_blocking(move || {
            aggregator::aggregate(&build_ctx.sources, None, &build_filter, SortBy::Activity)
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

    match with_timeout(timeout_secs, build).await {
        Err(GandalfError::Timeout { seconds }) => Ok(timed_out_result(seconds)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Cache;
    use crate::config::GandalfConfig;
    use std::time::Duration;

    fn empty_ctx() -> Arc<ToolContext> {
        let dir = tempfile::tempdir().unwrap();
        Arc::new(ToolContext {
            project_root: dir.path().to_path_buf(),
            gandalf_home: dir.path().to_path_buf(),
            config: GandalfConfig::default(),
            sources: Vec::new(),
            cache: Cache::new(dir.path().join("cache"), Duration::from_secs(3600)),
        })
    }

    #[tokio::test]
    async fn rejects_out_of_range_days_lookback() {
        let ctx = empty_ctx();
        let input = RecallInput { days_lookback: 0, ..Default::default() };
        assert!(execute_recall(&ctx, input).await.is_err());
    }

    #[tokio::test]
    async fn rejects_limit_over_max() {
        let ctx = empty_ctx();
        let input = RecallInput { limit: 1001, ..Default::default() };
        assert!(execute_recall(&ctx, input).await.is_err());
    }

    #[tokio::test]
    async fn no_sources_yields_empty_conversations_not_a_hard_failure() {
        let ctx = empty_ctx();
        let output = execute_recall(&ctx, RecallInput::default()).await.unwrap();
        assert!(output.conversations.is_empty());
    }

    #[tokio::test]
    async fn deadline_exceeded_yields_partial_result_not_an_error() {
        let result: Result<AggregateResult> = with_timeout(0, async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            unreachable!("deadline of 0s should elapse before this future resolves")
        })
        .await;
        match result {
            Err(GandalfError::Timeout { seconds }) => {
                let partial = timed_out_result(seconds);
                assert!(partial.partial);
                assert!(partial.conversations.is_empty());
            }
            other => panic!("expected a timeout, got {other:?}"),
        }
    }
}
