//! snipvault - named text snippets with per-snippet version history.
//!
//! This is the main entry point for the snipvault CLI.

mod commands;

use clap::{Parser, Subcommand};
use commands::history::{show_diff, show_history};
use commands::logging::init_logging;
use snipvault_core::{config::Config, SnippetService};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "snipvault")]
#[command(author, version, about = "Snippet server with version history", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding snippets and history (overrides config)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Subcommand (defaults to `serve`)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind to (overrides config)
        #[arg(short, long)]
        address: Option<SocketAddr>,
    },
    /// Show configuration
    Config {
        /// Write the effective configuration to ./snipvault.json
        #[arg(long)]
        save: bool,
    },
    /// Print version information
    Version,
    /// Show the recorded versions of a snippet
    History {
        /// Snippet ID
        id: String,
    },
    /// Show the change introduced by a commit
    Diff {
        /// Snippet ID
        id: String,
        /// Commit hash (at least 7 characters)
        commit: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    let (mut config, sources) = Config::load(Some(&cwd)).await?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }

    let command = cli.command.unwrap_or(Commands::Serve { address: None });
    init_logging(cli.verbose, matches!(command, Commands::Serve { .. }), &config);

    match command {
        Commands::Serve { address } => {
            let address = match address {
                Some(address) => address,
                None => config.server_address()?,
            };
            run_server(&config, address).await
        }
        Commands::Config { save } => {
            show_config(&config, &sources)?;
            if save {
                let path = config.save(&cwd).await?;
                println!();
                println!("Saved configuration to {}", path.display());
            }
            Ok(())
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
        Commands::History { id } => {
            let service = SnippetService::open(&config).await?;
            show_history(&service, &id).await
        }
        Commands::Diff { id, commit } => {
            let service = SnippetService::open(&config).await?;
            show_diff(&service, &id, &commit).await
        }
    }
}

/// Serve the HTTP API until interrupted.
async fn run_server(config: &Config, address: SocketAddr) -> anyhow::Result<()> {
    let service = SnippetService::open(config).await?;
    let app = snipvault_server::create_router(snipvault_server::AppState::new(service));

    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

fn show_config(config: &Config, sources: &[PathBuf]) -> anyhow::Result<()> {
    println!("Configuration sources:");
    if sources.is_empty() {
        println!("  (none)");
    } else {
        for source in sources {
            println!("  {}", source.display());
        }
    }
    println!();

    let data_dir = config.data_dir()?;
    println!("Data directory:    {}", data_dir.display());
    println!(
        "  snippets:        {}",
        snipvault_util::path::snippets_dir(&data_dir).display()
    );
    println!(
        "  history:         {}",
        snipvault_util::path::history_dir(&data_dir).display()
    );
    println!("Server address:    {}", config.server_address()?);
    println!();

    println!("Current configuration:");
    println!("{}", serde_json::to_string_pretty(config)?);

    Ok(())
}

/// Print version information.
fn print_version() {
    println!("snipvault {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Named text snippets with per-snippet version history.");
}
