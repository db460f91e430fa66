//! gandalf-mcp: an MCP sidecar that recalls AI-assistant conversation
//! history across Cursor, Claude Code, and Windsurf, and ranks project
//! files by relevance to the current work.
//!
//! Usage:
//!   gandalf-mcp run [--project-root DIR] [--debug]   # Start MCP server over stdio
//!   gandalf-mcp install                               # Stub, see below
//!   gandalf-mcp uninstall                             # Stub, see below
//!
//! `install`/`uninstall` register or remove gandalf from a client's MCP
//! config (Cursor, Claude Code, Windsurf); that per-client config wiring
//! lives in the project's shell installer, not in this binary.

use clap::{Parser, Subcommand};
use gandalf_mcp::cache::Cache;
use gandalf_mcp::config::GandalfConfig;
use gandalf_mcp::server::GandalfServer;
use gandalf_mcp::tools::ToolContext;
use rmcp::ServiceExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "gandalf-mcp")]
#[command(about = "MCP sidecar for project context and cross-agent conversation recall")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server over stdin/stdout
    Run {
        /// Project root to serve. Defaults to the resolved workspace/git/cwd root.
        #[arg(long)]
        project_root: Option<PathBuf>,

        /// Force debug-level logging regardless of RUST_LOG/MCP_DEBUG.
        #[arg(long)]
        debug: bool,
    },

    /// Register gandalf with a supported client (handled by install.sh)
    Install,

    /// Remove gandalf from a supported client (handled by install.sh)
    Uninstall,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Run { project_root, debug } => match run(project_root, debug).await {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("gandalf-mcp: {e:#}");
                1
            }
        },
        Commands::Install | Commands::Uninstall => {
            eprintln!("gandalf-mcp: client registration is handled by install.sh, not this binary.");
            eprintln!("See https://github.com/agentika-labs/gandalf-mcp for the installer.");
            1
        }
    };

    std::process::exit(exit_code);
}

/// Resolves the project root and effective config, wires up logging, and
/// serves the MCP protocol over stdio until the peer disconnects.
async fn run(project_root: Option<PathBuf>, debug: bool) -> anyhow::Result<()> {
    let root = gandalf_mcp::project::resolve_root(project_root.as_deref())?;
    let gandalf_home = GandalfConfig::gandalf_home();
    let mut config = GandalfConfig::load(&root);
    if debug {
        config.mcp_debug = true;
    }

    let session_id = format!("{}-{}", root_slug(&root), std::process::id());
    let _logging_guard = gandalf_mcp::logging::init(&gandalf_home, &session_id)?;

    if config.mcp_debug {
        tracing::debug!("debug logging enabled");
    }
    tracing::info!(root = %root.display(), home = %gandalf_home.display(), "starting gandalf-mcp");

    let cache = Cache::new(gandalf_home.join("cache"), Duration::from_secs(config.cache_ttl_seconds));
    let sources = gandalf_mcp::sources::all_sources();
    size_aggregation_pool(sources.len());

    let ctx = Arc::new(ToolContext { project_root: root, gandalf_home, config, sources, cache });

    let server = GandalfServer::new(ctx);
    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}

/// Sizes the global `rayon` pool the aggregator's `par_iter` fan-out uses
/// to `min(available_parallelism, num_sources + 2)` (§5), instead of
/// rayon's unconfigured default of one thread per core. Best-effort: a
/// pool can only be installed once per process, so a second call (e.g. in
/// tests that construct more than one server) is logged and ignored.
fn size_aggregation_pool(num_sources: usize) {
    let available = std::thread::available_parallelism().map(std::num::NonZeroUsize::get).unwrap_or(1);
    let pool_size = available.min(num_sources + 2).max(1);
    if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(pool_size).build_global() {
        tracing::warn!(error = %e, "rayon global pool already configured, using existing pool");
    }
}

/// A short, filesystem-safe tag for the session log file name.
fn root_slug(root: &std::path::Path) -> String {
    let raw = root.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| "root".to_string());
    gandalf_mcp::project::sanitize_name(&raw).0
}
