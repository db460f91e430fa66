//! Boundary-behavior and cross-tool invariant coverage that isn't tied to
//! one specific named scenario.

mod common;

use common::TestEnv;
use gandalf_mcp::config::GandalfConfig;
use gandalf_mcp::tools::{execute_list_files, execute_project_info, execute_recall, ListFilesInput, ProjectInfoInput, RecallInput};
use gandalf_mcp::types::Millis;

#[tokio::test]
async fn limit_zero_yields_empty_list_with_populated_stats() {
    let env = TestEnv::new();
    let claude_dir = env.home.path().join("claude-projects");
    std::fs::create_dir_all(&claude_dir).unwrap();
    common::write_claude_session(&claude_dir, "conv-a", &[("user", "hi", Millis::now().0)]);

    let ctx = env.tool_context(Some(claude_dir));
    let input = RecallInput { fast_mode: true, days_lookback: 7, limit: 0, conversation_types: Vec::new() };
    let output = execute_recall(&ctx, input).await.unwrap();

    assert!(output.conversations.is_empty());
    // total_processed still reflects the pre-limit extraction, not zero.
    assert_eq!(output.processing_stats.total_processed, 1);
}

#[tokio::test]
async fn days_lookback_of_one_excludes_conversations_older_than_a_day() {
    let env = TestEnv::new();
    let claude_dir = env.home.path().join("claude-projects");
    std::fs::create_dir_all(&claude_dir).unwrap();

    let now = Millis::now().0;
    common::write_claude_session(&claude_dir, "conv-fresh", &[("user", "just now", now)]);
    common::write_claude_session(&claude_dir, "conv-stale", &[("user", "two days ago", now - 2 * 86_400_000)]);

    let ctx = env.tool_context(Some(claude_dir));
    let input = RecallInput { fast_mode: true, days_lookback: 1, limit: 100, conversation_types: Vec::new() };
    let output = execute_recall(&ctx, input).await.unwrap();

    assert_eq!(output.conversations.len(), 1);
}

#[tokio::test]
async fn recall_rejects_days_lookback_zero_and_limit_over_1000() {
    let env = TestEnv::new();
    let ctx = env.tool_context(None);

    let zero_lookback = RecallInput { days_lookback: 0, ..RecallInput::default() };
    assert!(execute_recall(&ctx, zero_lookback).await.is_err());

    let oversized_limit = RecallInput { limit: 1001, ..RecallInput::default() };
    assert!(execute_recall(&ctx, oversized_limit).await.is_err());
}

#[test]
fn max_files_zero_yields_empty_listing_without_erroring() {
    let env = TestEnv::new();
    env.write_file("a.rs", "fn main() {}");

    let input = ListFilesInput { max_files: 0, ..ListFilesInput::default() };
    let output = execute_list_files(env.project.path(), &GandalfConfig::default(), input).unwrap();

    assert!(output.files.is_empty());
    assert_eq!(output.total_matched, 1);
}

#[test]
fn empty_project_root_reports_zero_total_files() {
    let env = TestEnv::new();
    let output = execute_project_info(env.project.path(), ProjectInfoInput { include_stats: true }).unwrap();
    assert_eq!(output.stats.unwrap().total_files, 0);
}

#[tokio::test]
async fn absent_source_store_yields_zero_conversations_without_a_hard_error() {
    let env = TestEnv::new();
    // Points at a directory that doesn't exist; the source's `detect()`
    // returns false and the aggregator skips it rather than failing.
    let ctx = env.tool_context(Some(env.home.path().join("no-such-claude-dir")));
    let output = execute_recall(&ctx, RecallInput::default()).await.unwrap();
    assert!(output.conversations.is_empty());
    assert!(output.source_errors.is_empty());
}

#[tokio::test]
async fn recall_result_is_idempotent_across_calls_modulo_processing_stats() {
    let env = TestEnv::new();
    let claude_dir = env.home.path().join("claude-projects");
    std::fs::create_dir_all(&claude_dir).unwrap();
    common::write_claude_session(&claude_dir, "conv-a", &[("user", "hi", Millis::now().0)]);

    let ctx = env.tool_context(Some(claude_dir));
    let first = execute_recall(&ctx, RecallInput::default()).await.unwrap();
    let second = execute_recall(&ctx, RecallInput::default()).await.unwrap();

    assert_eq!(first.conversations.len(), second.conversations.len());
    assert_eq!(first.conversations[0].id, second.conversations[0].id);
}
