//! wabridge CLI: the main entry point.
//!
//! Commands:
//! - `serve`   : Run the webhook server
//! - `send`    : Send a text or template message
//! - `sessions`: List stored sender → thread mappings
//! - `doctor`  : Diagnose configuration
//! - `onboard` : Write a default config file

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "wabridge",
    about = "wabridge: WhatsApp Cloud API webhook bridge",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send a message through the WhatsApp Cloud API
    Send(commands::send::SendArgs),

    /// List stored conversation sessions
    Sessions,

    /// Diagnose configuration
    Doctor,

    /// Initialize the configuration file
    Onboard,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Secrets usually live in a local .env during development
    dotenv::dotenv().ok();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Send(args) => commands::send::run(args).await?,
        Commands::Sessions => commands::sessions::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Onboard => commands::onboard::run().await?,
    }

    Ok(())
}
