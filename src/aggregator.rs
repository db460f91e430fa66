//! Aggregator (§4.5): parallel fan-out across conversation sources,
//! dedup, post-filtering, ranking, and partial-failure bookkeeping.

use crate::sources::classify::classify;
use crate::sources::{ConversationSource, SourceFilter};
use crate::types::{Conversation, ConversationType, Millis, Score, Source};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

/// Keyword/date/type filter shared by `recall_conversations` and
/// `search_conversations`.
#[derive(Debug, Clone, Default)]
pub struct AggregateFilter {
    pub days_lookback: u32,
    pub limit: usize,
    pub fast_mode: bool,
    pub query: Option<String>,
    pub conversation_types: Vec<String>,
}

/// One source's extraction failure, recorded rather than failing the
/// whole call (§4.5, §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceErrorEntry {
    pub source: Source,
    pub kind: &'static str,
    pub message: String,
}

/// Per-phase elapsed time and efficiency accounting emitted with every
/// aggregate result (§4.5 step 8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub total_processed: usize,
    pub skipped: usize,
    pub efficiency_percent: f64,
    pub extract_seconds: f64,
    pub filter_seconds: f64,
    pub sort_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResult {
    pub conversations: Vec<Conversation>,
    pub source_errors: Vec<SourceErrorEntry>,
    pub processing_stats: ProcessingStats,
    pub partial: bool,
}

/// Runs the full aggregation pipeline over `sources`, restricted to those
/// whose `detect()` returns true (unless `restrict_to` names an explicit
/// subset).
#[must_use]
pub fn aggregate(
    sources: &[Box<dyn ConversationSource>],
    restrict_to: Option<&[Source]>,
    filter: &AggregateFilter,
    sort_by: SortBy,
) -> AggregateResult {
    let active: Vec<&Box<dyn ConversationSource>> = sources
        .iter()
        .filter(|s| restrict_to.is_none_or(|names| names.contains(&s.source())))
        .filter(|s| s.detect())
        .collect();

    let source_filter = SourceFilter { days_lookback: filter.days_lookback, fast_mode: filter.fast_mode };

    let extract_start = Instant::now();
    let extraction_results: Vec<(Source, Result<Vec<Conversation>, String>)> = active
        .par_iter()
        .map(|source| (source.source(), source.extract(&source_filter).map_err(|e| e.to_string())))
        .collect();
    let extract_seconds = extract_start.elapsed().as_secs_f64();

    let mut source_errors = Vec::new();
    let mut raw_conversations = Vec::new();
    let mut any_succeeded = false;

    for (source, result) in extraction_results {
        match result {
            Ok(mut convs) => {
                any_succeeded = true;
                raw_conversations.append(&mut convs);
            }
            Err(message) => {
                source_errors.push(SourceErrorEntry { source, kind: "source_unavailable", message });
            }
        }
    }

    let total_processed = raw_conversations.len();

    let filter_start = Instant::now();
    let deduped = dedup_keep_most_messages(raw_conversations);
    let mut filtered = apply_post_filters(deduped, filter);
    let skipped = total_processed.saturating_sub(filtered.len());
    let filter_seconds = filter_start.elapsed().as_secs_f64();

    let sort_start = Instant::now();
    sort_by.apply(&mut filtered);
    filtered.truncate(filter.limit);
    let sort_seconds = sort_start.elapsed().as_secs_f64();

    let efficiency_percent = 100.0 * (total_processed.saturating_sub(skipped)) as f64 / (total_processed.max(1) as f64);

    AggregateResult {
        conversations: filtered,
        partial: !source_errors.is_empty() && !active.is_empty(),
        source_errors,
        processing_stats: ProcessingStats {
            total_processed,
            skipped,
            efficiency_percent,
            extract_seconds,
            filter_seconds,
            sort_seconds,
        },
    }
    .finalize(any_succeeded || active.is_empty())
}

impl AggregateResult {
    /// When every active source failed, the call as a whole fails — the
    /// caller surfaces `source_errors` as the primary error rather than an
    /// empty success.
    fn finalize(self, ok: bool) -> Self {
        if ok {
            self
        } else {
            Self { partial: true, ..self }
        }
    }
}

/// Whether every source that was attempted failed (used by the dispatcher
/// to decide whether to fail the call outright, per §4.5).
#[must_use]
pub fn all_sources_failed(result: &AggregateResult) -> bool {
    result.conversations.is_empty() && !result.source_errors.is_empty()
}

/// Deduplicates by `(source, id)`; when the same logical conversation
/// appears twice, keeps the one with more messages (§4.5 step 4, and the
/// fixed rule for the open question in §9).
fn dedup_keep_most_messages(conversations: Vec<Conversation>) -> Vec<Conversation> {
    let mut by_key: HashMap<(Source, String), Conversation> = HashMap::new();
    for conv in conversations {
        let key = (conv.source, conv.id.clone());
        match by_key.get(&key) {
            Some(existing) if existing.messages.len() >= conv.messages.len() => {}
            _ => {
                by_key.insert(key, conv);
            }
        }
    }
    by_key.into_values().collect()
}

fn apply_post_filters(conversations: Vec<Conversation>, filter: &AggregateFilter) -> Vec<Conversation> {
    let cutoff = Millis::now().saturating_sub_days(i64::from(filter.days_lookback));

    conversations
        .into_iter()
        .filter(|c| c.updated_at.0 >= cutoff.0)
        .filter_map(|mut c| {
            if !filter.conversation_types.is_empty() {
                let kind = classify(&c.messages);
                c.conversation_type = Some(kind);
                if !filter.conversation_types.iter().any(|wanted| wanted == kind.as_str()) {
                    return None;
                }
            }

            if let Some(query) = &filter.query {
                if !matches_query(&c, query) {
                    return None;
                }
                c.relevance_score = Some(keyword_relevance(&c, query));
                c.snippet = find_snippet(&c, query);
            }

            Some(c)
        })
        .collect()
}

const SNIPPET_MAX_CHARS: usize = 280;
const CONTENT_SCAN_WINDOW: usize = 50;

/// Whether `query` appears in the title or the first `CONTENT_SCAN_WINDOW`
/// messages. Conversations that don't match are dropped entirely before
/// scoring — recency/volume only rank among matches, they never qualify
/// a conversation on their own.
fn matches_query(conv: &Conversation, query: &str) -> bool {
    let needle = query.to_lowercase();
    conv.title.to_lowercase().contains(&needle)
        || conv.messages.iter().take(CONTENT_SCAN_WINDOW).any(|m| m.content.to_lowercase().contains(&needle))
}

/// Weighted relevance score for `search_conversations`: title match,
/// bounded content scan, recency, and exchange volume (§4.5 step 5). Only
/// called for conversations that already passed [`matches_query`].
fn keyword_relevance(conv: &Conversation, query: &str) -> Score {
    let needle = query.to_lowercase();

    let title_match = f64::from(conv.title.to_lowercase().contains(&needle));

    let content_match = conv
        .messages
        .iter()
        .take(CONTENT_SCAN_WINDOW)
        .any(|m| m.content.to_lowercase().contains(&needle));
    let content_match = f64::from(content_match);

    let age_days = (Millis::now().0 - conv.updated_at.0).max(0) as f64 / 86_400_000.0;
    let recency = (1.0 - age_days / 30.0).clamp(0.0, 1.0);

    let volume = (f64::from(conv.total_exchanges) / 20.0).min(1.0);

    Score::new(0.4 * title_match + 0.4 * content_match + 0.1 * recency + 0.1 * volume)
}

fn find_snippet(conv: &Conversation, query: &str) -> Option<String> {
    let needle = query.to_lowercase();
    conv.messages.iter().take(CONTENT_SCAN_WINDOW).find_map(|m| {
        let lower = m.content.to_lowercase();
        let pos = lower.find(&needle)?;
        let start = pos.saturating_sub(SNIPPET_MAX_CHARS / 2);
        let end = (pos + needle.len() + SNIPPET_MAX_CHARS / 2).min(m.content.len());
        let start = nearest_char_boundary(&m.content, start);
        let end = nearest_char_boundary(&m.content, end);
        Some(m.content[start..end].trim().to_string())
    })
}

fn nearest_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx.min(s.len())
}

/// Which field the aggregator sorts by: `activity_score` for recall,
/// `relevance_score` for search (§4.5 step 6).
#[derive(Debug, Clone, Copy)]
pub enum SortBy {
    Activity,
    Relevance,
}

impl SortBy {
    fn apply(self, conversations: &mut [Conversation]) {
        match self {
            Self::Activity => conversations.sort_by(|a, b| {
                b.activity_score
                    .partial_cmp(&a.activity_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| (a.source, a.id.as_str()).cmp(&(b.source, b.id.as_str())))
            }),
            Self::Relevance => conversations.sort_by(|a, b| {
                let a_score = a.relevance_score.unwrap_or(Score::ZERO);
                let b_score = b.relevance_score.unwrap_or(Score::ZERO);
                b_score
                    .partial_cmp(&a_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| (a.source, a.id.as_str()).cmp(&(b.source, b.id.as_str())))
            }),
        }
    }
}
