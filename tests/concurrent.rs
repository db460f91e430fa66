//! Cache concurrency invariant: at most one adapter extraction per source
//! per cache key when concurrent callers race on an identical miss.

mod common;

use gandalf_mcp::cache::Cache;
use gandalf_mcp::config::GandalfConfig;
use gandalf_mcp::error::Result;
use gandalf_mcp::sources::{ConversationSource, SourceFilter};
use gandalf_mcp::tools::{execute_recall, RecallInput, ToolContext};
use gandalf_mcp::types::{Conversation, Message, Millis, Role, Score, Source, Workspace};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A source whose `extract` counts its own invocations and sleeps briefly,
/// so concurrent callers racing on the same cache key would observe more
/// than one call if the at-most-once guarantee were broken.
struct CountingSource {
    calls: Arc<AtomicUsize>,
}

impl ConversationSource for CountingSource {
    fn source(&self) -> Source {
        Source::ClaudeCode
    }

    fn detect(&self) -> bool {
        true
    }

    fn store_paths(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    fn list_workspaces(&self) -> Result<Vec<Workspace>> {
        Ok(Vec::new())
    }

    fn extract(&self, _filter: &SourceFilter) -> Result<Vec<Conversation>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));
        Ok(vec![Conversation {
            id: "only".to_string(),
            source: Source::ClaudeCode,
            workspace_id: "ws".to_string(),
            title: "only conversation".to_string(),
            created_at: Millis::now(),
            updated_at: Millis::now(),
            prompt_count: 1,
            generation_count: 1,
            total_exchanges: 2,
            messages: vec![Message { role: Role::User, content: "hi".to_string(), timestamp: None, metadata: Default::default() }],
            activity_score: Score::new(1.0),
            relevance_score: None,
            snippet: None,
            conversation_type: None,
        }])
    }
}

#[tokio::test]
async fn concurrent_identical_recalls_build_the_cache_at_most_once() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let sources: Vec<Box<dyn ConversationSource>> = vec![Box::new(CountingSource { calls: Arc::clone(&calls) })];

    let ctx = Arc::new(ToolContext {
        project_root: dir.path().to_path_buf(),
        gandalf_home: dir.path().to_path_buf(),
        config: GandalfConfig::default(),
        sources,
        cache: Cache::new(dir.path().join("cache"), Duration::from_secs(3600)),
    });

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ctx = Arc::clone(&ctx);
        handles.push(tokio::spawn(async move {
            execute_recall(&ctx, RecallInput::default()).await.unwrap()
        }));
    }

    for handle in handles {
        let output = handle.await.unwrap();
        assert_eq!(output.conversations.len(), 1);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
