//! Taskly server binary.
//!
//! Loads an optional snapshot into an in-memory store and serves it over a
//! Unix domain socket.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use taskly_core::types::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use taskly_core::{MemoryStore, ServiceConfig};
use taskly_server::TasklyServer;
use tracing::info;

/// Taskly server: to-do records with bidirectional pagination over a Unix socket.
#[derive(Parser, Debug)]
#[command(name = "taskly-server", version)]
struct Cli {
    /// Unix socket path (default: ~/.local/share/taskly/server.sock).
    #[arg(long, env = "TASKLY_SOCKET")]
    socket: Option<PathBuf>,

    /// JSON snapshot loaded at start and written at shutdown.
    #[arg(long, env = "TASKLY_DATA")]
    data: Option<PathBuf>,

    /// Page size used when a list request asks for zero or fewer items.
    #[arg(long, env = "TASKLY_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Upper bound on items per page.
    #[arg(long, env = "TASKLY_MAX_PAGE_SIZE", default_value_t = MAX_PAGE_SIZE)]
    max_page_size: usize,
}

fn default_socket_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskly")
        .join("server.sock")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let socket_path = cli.socket.unwrap_or_else(default_socket_path);

    // Ensure parent directories exist.
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if let Some(parent) = cli.data.as_ref().and_then(|p| p.parent()) {
        std::fs::create_dir_all(parent)?;
    }

    let store = match &cli.data {
        Some(path) => MemoryStore::load(path)?,
        None => MemoryStore::new(),
    };
    let config = ServiceConfig {
        default_page_size: cli.page_size,
        max_page_size: cli.max_page_size,
    };

    info!(
        socket = %socket_path.display(),
        data = ?cli.data,
        items = store.len(),
        page_size = config.default_page_size,
        max_page_size = config.max_page_size,
        "starting"
    );

    let mut server = TasklyServer::new(Arc::new(store), config, socket_path);
    if let Some(path) = cli.data {
        server = server.with_snapshot(path);
    }
    server.run().await?;

    Ok(())
}
