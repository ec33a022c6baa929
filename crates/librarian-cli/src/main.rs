//! Command-line entry point for the Librarian MCP server
//!
//! Serves a markdown knowledge base over the Model Context Protocol on
//! stdio. Logging goes to stderr so stdout carries nothing but JSON-RPC
//! messages.

use anyhow::Result;
use clap::Parser;
use librarian_core::{create_server, LibrarianConfig};
use log::LevelFilter;

#[derive(Parser, Debug)]
#[clap(
    name = "librarian",
    author,
    version,
    about = "Librarian - MCP server for structuring and serving markdown knowledge bases"
)]
struct Cli {
    #[clap(
        long,
        help = "Root directory for documentation files. Falls back to LIBRARIAN_DOCS_ROOT, then ./docs"
    )]
    docs_root: Option<String>,

    #[clap(long, short, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level_filter = match cli.log_level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    };
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .init();

    let config = LibrarianConfig::resolve(cli.docs_root.as_deref());
    config.check_docs_root()?;
    log::info!("Using docs root: {}", config.docs_root.display());

    let server = create_server(config).await?;
    log::info!("Librarian MCP server started");
    server.run_stdio().await?;

    Ok(())
}
