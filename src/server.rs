//! MCP server implementation using rmcp.

use crate::tools::{self, ToolContext};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::tool::ToolCallContext;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult, LoggingLevel,
    LoggingMessageNotification, LoggingMessageNotificationParam, PaginatedRequestParams,
    ProtocolVersion, RawContent, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{tool, tool_router, RoleServer, ServerHandler};
use serde::Serialize;
use std::sync::Arc;

/// Maximum response size in bytes. Responses exceeding this are truncated
/// to prevent context window exhaustion in LLM consumers.
const MAX_RESPONSE_BYTES: usize = 512 * 1024; // 512KB

/// Truncates a JSON response string at a clean boundary before the limit,
/// appending a truncation notice. Works with both compact and pretty JSON.
fn truncate_response(mut json: String) -> String {
    if json.len() <= MAX_RESPONSE_BYTES {
        return json;
    }
    let original_len = json.len();
    let search_region = &json[..MAX_RESPONSE_BYTES];
    let cut_point = search_region.rfind(',').or_else(|| search_region.rfind('\n')).unwrap_or(MAX_RESPONSE_BYTES);
    let safe_cut = json.floor_char_boundary(cut_point + 1);
    json.truncate(safe_cut);
    json.push_str(&format!(
        "...\n[TRUNCATED: response exceeded {original_len} bytes, showing first {safe_cut}]"
    ));
    json
}

/// Truncates large text content within a `CallToolResult`.
fn truncate_call_tool_result(mut result: CallToolResult) -> CallToolResult {
    for content in &mut result.content {
        if let RawContent::Text(ref mut text) = content.raw {
            if text.text.len() > MAX_RESPONSE_BYTES {
                text.text = truncate_response(std::mem::take(&mut text.text));
            }
        }
    }
    result
}

#[cfg(test)]
mod truncate_tests {
    use super::*;

    #[test]
    fn truncate_under_limit_is_unchanged() {
        let input = "short string".to_string();
        assert_eq!(truncate_response(input.clone()), input);
    }

    #[test]
    fn truncate_over_limit_cuts_at_comma() {
        let segment = "\"file\": \"data\",";
        let repeats = (MAX_RESPONSE_BYTES / segment.len()) + 10;
        let input = segment.repeat(repeats);
        let result = truncate_response(input);
        assert!(result.contains("[TRUNCATED:"));
    }
}

/// Converts an already-resolved tool result into a `CallToolResult`,
/// classifying errors the same way as [`spawn_tool`]: client-fixable
/// errors surface on the tool-result channel (LLM-visible), everything
/// else escalates to the protocol error channel.
fn tool_result<T: Serialize>(result: crate::error::Result<T>) -> Result<CallToolResult, rmcp::ErrorData> {
    match result {
        Ok(output) => {
            let json = serde_json::to_string(&output).map_err(|e| rmcp::ErrorData::internal_error(e.to_string(), None))?;
            Ok(CallToolResult::success(vec![Content::text(json)]))
        }
        Err(e) => {
            if e.is_client_fixable() {
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            } else {
                Err(e.into())
            }
        }
    }
}

/// Runs a blocking tool operation (file walk, git subprocess) on the
/// blocking thread pool and converts its result the same way as
/// [`tool_result`].
async fn spawn_tool<T, F>(f: F) -> Result<CallToolResult, rmcp::ErrorData>
where
    T: Serialize + Send + 'static,
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => tool_result(result),
        Err(e) => Err(rmcp::ErrorData::internal_error(e.to_string(), None)),
    }
}

/// MCP server for Gandalf: cross-tool conversation recall and
/// file-relevance scoring over a single, fixed project root.
#[derive(Clone)]
pub struct GandalfServer {
    ctx: Arc<ToolContext>,
    tool_router: ToolRouter<GandalfServer>,
}

impl GandalfServer {
    #[must_use]
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx, tool_router: Self::tool_router() }
    }

    /// Returns the tool schemas without requiring an async MCP context.
    #[must_use]
    pub fn tool_schemas(&self) -> Vec<Tool> {
        self.tool_router.list_all()
    }
}

#[tool_router]
impl GandalfServer {
    #[tool(
        description = "Recall recent conversations across Cursor, Claude Code, and Windsurf, \
        ranked by activity. Use fast_mode=true (default) for a quick overview without full \
        message content; set fast_mode=false and pass conversation_types to filter by \
        classified topic.",
        annotations(
            title = "Recall Conversations",
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = false
        )
    )]
    async fn recall_conversations(
        &self,
        Parameters(input): Parameters<tools::RecallInput>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        tool_result(tools::execute_recall(&self.ctx, input).await)
    }

    #[tool(
        description = "Search conversation history by keyword, ranked by relevance (title \
        match, content match, recency, exchange volume). Set include_content=true to keep \
        full message bodies in the response instead of just the matched snippet.",
        annotations(
            title = "Search Conversations",
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = false
        )
    )]
    async fn search_conversations(
        &self,
        Parameters(input): Parameters<tools::SearchInput>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        tool_result(tools::execute_search(&self.ctx, input).await)
    }

    #[tool(
        description = "List project files ranked by relevance (recent modification, file \
        size, file type, directory importance, git activity). Use file_types to restrict \
        by extension and use_relevance_scoring=false for a plain lexicographic listing.",
        annotations(
            title = "List Project Files",
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = false
        )
    )]
    async fn list_project_files(
        &self,
        Parameters(input): Parameters<tools::ListFilesInput>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let root = self.ctx.project_root.clone();
        let config = self.ctx.config.clone();
        spawn_tool(move || tools::execute_list_files(&root, &config, input)).await
    }

    #[tool(
        description = "Get the current project's git metadata (branch, HEAD, repo status) \
        and recent-activity sets. Set include_stats=false to skip the file-count block.",
        annotations(
            title = "Get Project Info",
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = false
        )
    )]
    async fn get_project_info(
        &self,
        Parameters(input): Parameters<tools::ProjectInfoInput>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let root = self.ctx.project_root.clone();
        spawn_tool(move || tools::execute_project_info(&root, input)).await
    }

    #[tool(
        description = "Export matching conversations to individual files (json, md, or txt) \
        under output_dir, which defaults to <gandalf home>/exports.",
        annotations(
            title = "Export Conversations",
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = false
        )
    )]
    async fn export_individual_conversations(
        &self,
        Parameters(input): Parameters<tools::ExportInput>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        tool_result(tools::execute_export(&self.ctx, input).await)
    }

    #[tool(
        description = "Report the running server and protocol version. Accepts any input.",
        annotations(
            title = "Get Server Version",
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = false
        )
    )]
    async fn get_server_version(
        &self,
        Parameters(input): Parameters<tools::VersionInput>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        tool_result(tools::execute_version(input))
    }
}

impl ServerHandler for GandalfServer {
    fn get_info(&self) -> ServerInfo {
        let instructions = format!(
            "gandalf: cross-tool AI conversation recall and file-relevance scoring for {}.\n\n\
             WORKFLOW:\n\
             1. recall_conversations -> what has been discussed recently\n\
             2. search_conversations -> find a specific past discussion by keyword\n\
             3. list_project_files -> which files matter most right now\n\
             4. get_project_info -> current branch, HEAD, git activity\n\
             5. export_individual_conversations -> persist conversations to disk\n\n\
             Sources: Cursor, Claude Code, Windsurf. A source with no data on this host is \
             skipped silently; the call only fails outright if every active source fails.",
            self.ctx.project_root.display()
        );

        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            server_info: Implementation {
                name: "gandalf-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            capabilities: ServerCapabilities::builder().enable_tools().enable_logging().build(),
            instructions: Some(instructions),
        }
    }

    /// Manual impl (no `#[tool_handler]`) so errors can be logged as MCP
    /// notifications and large responses truncated before they reach the
    /// client.
    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let tool_name = request.name.to_string();
        let peer = context.peer.clone();
        let mcp_debug = self.ctx.config.mcp_debug;

        let tcc = ToolCallContext::new(self, request, context);
        let result = self.tool_router.call(tcc).await;

        if let Ok(ref r) = result {
            if r.is_error == Some(true) {
                let _ = peer
                    .send_notification(
                        LoggingMessageNotification::new(LoggingMessageNotificationParam {
                            level: LoggingLevel::Warning,
                            logger: Some("gandalf".to_string()),
                            data: serde_json::json!({ "tool": tool_name, "error": true }),
                        })
                        .into(),
                    )
                    .await;
            } else if mcp_debug {
                // MCP_DEBUG (or --debug) additionally surfaces a debug-level
                // notification for every successful call, not just failures.
                let _ = peer
                    .send_notification(
                        LoggingMessageNotification::new(LoggingMessageNotificationParam {
                            level: LoggingLevel::Debug,
                            logger: Some("gandalf".to_string()),
                            data: serde_json::json!({ "tool": tool_name, "error": false }),
                        })
                        .into(),
                    )
                    .await;
            }
        }

        result.map(truncate_call_tool_result)
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::ErrorData> {
        Ok(ListToolsResult { tools: self.tool_router.list_all(), next_cursor: None, meta: None })
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.tool_router.get(name).cloned()
    }
}
