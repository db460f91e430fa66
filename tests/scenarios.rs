//! End-to-end scenarios over the public tool entry points, seeded with
//! real files/git repos/JSONL session stores instead of mocked sources.

mod common;

use common::TestEnv;
use gandalf_mcp::tools::{
    execute_export, execute_list_files, execute_project_info, execute_recall, execute_search, ExportInput,
    ListFilesInput, ProjectInfoInput, RecallInput, SearchInput,
};
use gandalf_mcp::types::Millis;
use std::time::{Duration, SystemTime};

#[test]
fn basic_project_info_reports_git_branch_and_file_count() {
    let env = TestEnv::new();
    env.write_file("README.md", "hello");
    env.init_git_repo();

    let output = execute_project_info(env.project.path(), ProjectInfoInput { include_stats: true }).unwrap();

    assert!(output.context.is_git_repo);
    assert_eq!(output.context.current_branch.as_deref(), Some("main"));
    assert_eq!(output.stats.unwrap().total_files, 1);
}

#[test]
fn file_listing_respects_type_filter() {
    let env = TestEnv::new();
    env.write_file("a.py", "print(1)");
    env.write_file("b.js", "console.log(1)");
    env.write_file("c.md", "# notes");

    let input = ListFilesInput {
        max_files: 1000,
        file_types: vec![".py".to_string(), ".md".to_string()],
        use_relevance_scoring: false,
        include_hidden: false,
    };
    let output = execute_list_files(env.project.path(), &gandalf_mcp::config::GandalfConfig::default(), input).unwrap();

    let names: Vec<&str> = output.files.iter().map(|f| f.relative_path.as_str()).collect();
    assert_eq!(names, vec!["a.py", "c.md"]);
    assert!(!names.contains(&"b.js"));
}

#[test]
fn scoring_prefers_recent_python_over_older_javascript() {
    let env = TestEnv::new();
    env.write_file("recent.py", "print('new')");
    env.write_file("old.js", "console.log('old')");

    let old_path = env.project.path().join("old.js");
    let old_time = SystemTime::now() - Duration::from_secs(40 * 24 * 3600);
    std::fs::File::options().write(true).open(&old_path).unwrap().set_modified(old_time).unwrap();

    let input = ListFilesInput { max_files: 1000, file_types: Vec::new(), use_relevance_scoring: true, include_hidden: false };
    let output = execute_list_files(env.project.path(), &gandalf_mcp::config::GandalfConfig::default(), input).unwrap();

    let recent_pos = output.files.iter().position(|f| f.relative_path == "recent.py").unwrap();
    let old_pos = output.files.iter().position(|f| f.relative_path == "old.js").unwrap();
    assert!(recent_pos < old_pos);
}

#[tokio::test]
async fn fast_recall_returns_only_conversations_within_lookback_with_empty_messages() {
    let env = TestEnv::new();
    let claude_dir = env.home.path().join("claude-projects");
    std::fs::create_dir_all(&claude_dir).unwrap();

    let now = Millis::now().0;
    common::write_claude_session(&claude_dir, "conv-now", &[("user", "hi", now), ("assistant", "hello", now + 1000)]);
    common::write_claude_session(
        &claude_dir,
        "conv-3d",
        &[("user", "hi again", now - 3 * 86_400_000)],
    );
    common::write_claude_session(
        &claude_dir,
        "conv-10d",
        &[("user", "old discussion", now - 10 * 86_400_000)],
    );

    let ctx = env.tool_context(Some(claude_dir));
    let input = RecallInput { fast_mode: true, days_lookback: 7, limit: 10, conversation_types: Vec::new() };
    let output = execute_recall(&ctx, input).await.unwrap();

    assert_eq!(output.conversations.len(), 2);
    assert!(output.conversations.iter().all(|c| c.messages.is_empty()));
    assert!(output.conversations[0].updated_at.0 >= output.conversations[1].updated_at.0);
}

#[tokio::test]
async fn keyword_search_finds_matching_conversation_with_snippet() {
    let env = TestEnv::new();
    let claude_dir = env.home.path().join("claude-projects");
    std::fs::create_dir_all(&claude_dir).unwrap();

    let now = Millis::now().0;
    common::write_claude_session(
        &claude_dir,
        "conv-fellowship",
        &[("user", "tell me about the fellowship of the ring", now)],
    );
    common::write_claude_session(&claude_dir, "conv-other-1", &[("user", "how do I write a parser", now)]);
    common::write_claude_session(&claude_dir, "conv-other-2", &[("user", "what's the weather like", now)]);

    let ctx = env.tool_context(Some(claude_dir));
    let input = SearchInput { query: "fellowship".to_string(), limit: 5, days_lookback: 30, include_content: true };
    let output = execute_search(&ctx, input).await.unwrap();

    assert_eq!(output.conversations.len(), 1);
    let hit = &output.conversations[0];
    assert!(hit.relevance_score.unwrap().as_f64() > 0.0);
    assert!(hit.snippet.as_ref().unwrap().to_lowercase().contains("fellowship"));
}

#[tokio::test]
async fn export_round_trips_against_a_subsequent_recall() {
    let env = TestEnv::new();
    let claude_dir = env.home.path().join("claude-projects");
    std::fs::create_dir_all(&claude_dir).unwrap();

    let now = Millis::now().0;
    common::write_claude_session(&claude_dir, "conv-a", &[("user", "export me", now), ("assistant", "ok", now + 1000)]);

    let ctx = env.tool_context(Some(claude_dir));

    let export_input = ExportInput { limit: 1, format: "json".to_string(), output_dir: None, conversation_types: Vec::new() };
    let export_output = execute_export(&ctx, export_input).await.unwrap();
    assert_eq!(export_output.conversation_count, 1);
    assert_eq!(export_output.files_written.len(), 1);

    let exported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&export_output.files_written[0]).unwrap()).unwrap();

    let recall_input = RecallInput { fast_mode: false, days_lookback: 7, limit: 1, conversation_types: Vec::new() };
    let recall_output = execute_recall(&ctx, recall_input).await.unwrap();
    assert_eq!(recall_output.conversations.len(), 1);
    let recalled = &recall_output.conversations[0];

    assert_eq!(exported["id"], serde_json::json!(recalled.id));
    assert_eq!(exported["source"], serde_json::json!(recalled.source));
    assert_eq!(exported["title"], serde_json::json!(recalled.title));
    assert_eq!(exported["messages"].as_array().unwrap().len(), recalled.messages.len());
}
