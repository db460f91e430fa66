//! Exporter (§4.7): serializes selected conversations to JSON, Markdown,
//! or plain text files on disk, with collision-safe naming.

use crate::error::{ExportError, GandalfError, Result};
use crate::security;
use crate::types::Conversation;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Markdown,
    Text,
}

impl ExportFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
            Self::Text => "txt",
        }
    }

    /// Parses the `format` RPC argument; any value outside `{json, md, txt}`
    /// is an `invalid_argument` (§4.1), not an export-specific failure,
    /// since nothing has been written yet.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "json" => Ok(Self::Json),
            "md" => Ok(Self::Markdown),
            "txt" => Ok(Self::Text),
            other => Err(GandalfError::InvalidArgument(format!(
                "format must be one of json, md, txt, got {other:?}"
            ))),
        }
    }
}

/// Writes each conversation to `<output_dir>/<sanitized_title>-<short_id>.<ext>`,
/// resolving filename collisions with a numeric suffix. Returns the paths
/// written, in the same order as `conversations`.
pub fn export_conversations(
    gandalf_home: &Path,
    output_dir: &Path,
    conversations: &[Conversation],
    format: ExportFormat,
) -> Result<Vec<PathBuf>> {
    let resolved_dir = security::validate_export_dir(gandalf_home, output_dir)
        .map_err(|_| ExportError::PathEscapesRoot { path: output_dir.to_path_buf() })?;

    std::fs::create_dir_all(&resolved_dir)
        .map_err(|e| ExportError::Write { path: resolved_dir.clone(), source: e })?;

    let mut written = Vec::with_capacity(conversations.len());
    let mut used_names: std::collections::HashSet<String> = std::collections::HashSet::new();

    for conv in conversations {
        let path = write_one(&resolved_dir, conv, format, &mut used_names)?;
        written.push(path);
    }

    Ok(written)
}

fn write_one(
    dir: &Path,
    conv: &Conversation,
    format: ExportFormat,
    used_names: &mut std::collections::HashSet<String>,
) -> Result<PathBuf> {
    let short_id = short_hash(conv.source.as_str(), &conv.id);
    let sanitized_title = sanitize_filename_component(&conv.title);
    let stem = format!("{sanitized_title}-{short_id}");

    let mut candidate_stem = stem.clone();
    let mut suffix = 1u32;
    while used_names.contains(&candidate_stem) {
        candidate_stem = format!("{stem}-{suffix}");
        suffix += 1;
    }
    used_names.insert(candidate_stem.clone());

    let path = dir.join(format!("{candidate_stem}.{}", format.extension()));
    let contents = render(conv, format)?;

    std::fs::write(&path, contents).map_err(|e| ExportError::Write { path: path.clone(), source: e })?;
    Ok(path)
}

fn short_hash(source: &str, id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"\0");
    hasher.update(id.as_bytes());
    let digest = hasher.finalize();
    digest[..4].iter().map(|b| format!("{b:02x}")).collect()
}

fn sanitize_filename_component(title: &str) -> String {
    let sanitized: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') { c } else { '_' })
        .collect();
    let trimmed: String = sanitized.chars().take(60).collect();
    if trimmed.is_empty() { "untitled".to_string() } else { trimmed }
}

fn render(conv: &Conversation, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => serde_json::to_string_pretty(conv).map_err(crate::error::GandalfError::Json),
        ExportFormat::Markdown => Ok(render_markdown(conv)),
        ExportFormat::Text => Ok(strip_markdown(&render_markdown(conv))),
    }
}

fn render_markdown(conv: &Conversation) -> String {
    let mut out = String::new();
    out.push_str("---\n");
    out.push_str(&format!("title: {}\n", conv.title));
    out.push_str(&format!("source: {}\n", conv.source));
    out.push_str(&format!("created_at: {}\n", conv.created_at));
    out.push_str(&format!("updated_at: {}\n", conv.updated_at));
    out.push_str(&format!("prompt_count: {}\n", conv.prompt_count));
    out.push_str(&format!("generation_count: {}\n", conv.generation_count));
    out.push_str("---\n\n");
    out.push_str("## Messages\n\n");
    for message in &conv.messages {
        out.push_str(&format!("[{:?}] {}\n\n", message.role, message.content));
    }
    out
}

fn strip_markdown(markdown: &str) -> String {
    markdown
        .lines()
        .filter(|line| !(*line == "---" || line.starts_with("## ")))
        .map(|line| line.trim_start_matches("[").to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
