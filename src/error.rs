//! Error types for gandalf-mcp.
//!
//! Uses thiserror for ergonomic error handling with proper
//! error chain propagation.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level server error.
#[derive(Error, Debug)]
pub enum GandalfError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Project context error: {0}")]
    Project(#[from] ProjectError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors loading or layering configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid weight override {name}: {value} is not a valid float")]
    InvalidWeight { name: String, value: String },
}

/// Cache-specific errors.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to read cache entry {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write cache entry {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache entry {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Unsupported cache entry version: {version}")]
    UnsupportedVersion { version: u32 },
}

/// Errors from conversation source adapters.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source '{source}' is unavailable: {reason}")]
    Unavailable { source: &'static str, reason: String },

    #[error("Source '{source}' store is corrupt: {reason}")]
    Corrupt { source: &'static str, reason: String },

    #[error("Source '{source}' timed out")]
    Timeout { source: &'static str },

    #[error("IO error in source '{source}': {error}")]
    Io {
        source: &'static str,
        #[source]
        error: std::io::Error,
    },
}

/// Errors resolving project context.
#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("No usable project root could be resolved")]
    NoRoot,

    #[error("Project root {path} does not exist")]
    RootNotFound { path: PathBuf },

    #[error("Failed to enumerate files under {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors exporting conversations.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Output directory {path} is outside the allowed export root")]
    PathEscapesRoot { path: PathBuf },

    #[error("Failed to write export file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, GandalfError>;

impl GandalfError {
    /// Returns the machine-readable error kind from the core error taxonomy.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::UnknownTool(_) => "unknown_tool",
            Self::Source(SourceError::Unavailable { .. }) => "source_unavailable",
            Self::Source(SourceError::Corrupt { .. }) => "source_corrupt",
            Self::Source(SourceError::Timeout { .. }) | Self::Timeout { .. } => "timeout",
            Self::Source(SourceError::Io { .. }) | Self::Io(_) => "io",
            Self::Config(_) | Self::Cache(_) | Self::Project(_) | Self::Export(_) => "io",
            Self::Json(_) => "io",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether this error is safe to surface directly to the calling LLM
    /// (malformed input, unknown tool) versus a server-side fault that
    /// should be logged and reported as a generic failure.
    #[must_use]
    pub fn is_client_fixable(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::UnknownTool(_))
    }
}

impl From<GandalfError> for rmcp::ErrorData {
    fn from(err: GandalfError) -> Self {
        rmcp::ErrorData::internal_error(err.to_string(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument_is_client_fixable() {
        let e = GandalfError::InvalidArgument("bad limit".into());
        assert!(e.is_client_fixable());
        assert_eq!(e.code(), "invalid_argument");
    }

    #[test]
    fn unknown_tool_is_client_fixable() {
        let e = GandalfError::UnknownTool("frobnicate".into());
        assert!(e.is_client_fixable());
        assert_eq!(e.code(), "unknown_tool");
    }

    #[test]
    fn source_unavailable_is_not_client_fixable() {
        let e = GandalfError::Source(SourceError::Unavailable {
            source: "cursor",
            reason: "no workspaceStorage directory".into(),
        });
        assert!(!e.is_client_fixable());
        assert_eq!(e.code(), "source_unavailable");
    }

    #[test]
    fn internal_error_code() {
        let e = GandalfError::Internal("unreachable state".into());
        assert_eq!(e.code(), "internal");
        assert!(!e.is_client_fixable());
    }
}
