//! gandalf-mcp: an MCP sidecar that recalls AI-assistant conversation
//! history across Cursor, Claude Code, and Windsurf, and ranks project
//! files by relevance to the current work.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              MCP Server (rmcp)              │
//! │         JSON-RPC over stdin/stdout          │
//! └─────────────────┬───────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────┐
//! │               Tool Router                    │
//! │  recall, search, list_files, project_info,  │
//! │  export, version                            │
//! └─────────────────┬───────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────┐
//! │              Aggregator                      │
//! │   fan-out · dedup · filter · rank · cache   │
//! └───────┬─────────┬─────────┬─────────────────┘
//!         │         │         │
//!    ┌────▼───┐ ┌───▼───┐ ┌───▼────┐
//!    │ Cursor │ │ Claude│ │Windsurf│
//!    │(SQLite)│ │ Code  │ │(jsonl) │
//!    └────────┘ └───────┘ └────────┘
//! ```

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod error;
pub mod exporter;
pub mod logging;
pub mod project;
pub mod scorer;
pub mod security;
pub mod server;
pub mod sources;
pub mod tools;
pub mod types;

pub use error::{GandalfError, Result};
