//! qbridge - OAuth broker and query proxy for QuickBooks Online
//!
//! Main entry point for the qbridge CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{gen_key, serve};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// qbridge - OAuth broker and query proxy for QuickBooks Online
#[derive(Parser, Debug)]
#[command(name = "qbridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the authorization broker and tool server
    Serve(serve::ServeArgs),

    /// Print a fresh base64 key for refresh-token encryption
    GenKey,
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "qbridge=debug,qbridge_oauth=debug,qbridge_server=debug,tower_http=debug,info"
    } else {
        "qbridge=info,qbridge_oauth=info,qbridge_server=info,warn"
    };

    let log_dir = dirs::data_local_dir()
        .map(|d| d.join("qbridge").join("logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "qbridge.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "qbridge=trace,qbridge_oauth=trace,qbridge_server=trace,info",
                )),
        )
        .init();

    match cli.command {
        Commands::Serve(args) => serve::run(args).await,
        Commands::GenKey => gen_key::run(),
    }
}
