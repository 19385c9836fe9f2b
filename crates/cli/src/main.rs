//! PitchScout CLI — the main entry point.
//!
//! Commands:
//! - `research`     — Run the research agent on a request
//! - `capabilities` — List what the agent can call
//! - `config`       — Show, validate or initialize configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "pitchscout",
    about = "PitchScout — investment research agent",
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
    /// Research a company or founder and answer the request
    Research {
        /// What to research (defaults to a sample pitch request)
        request: Option<String>,

        /// Override the step ceiling
        #[arg(long)]
        max_steps: Option<u32>,

        /// Emit events and the final report as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// List registered capabilities
    Capabilities {
        /// Print the full definitions as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Print the config file path
    Path,
    /// Load and validate the configuration
    Validate,
    /// Write a default config file if none exists
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Research {
            request,
            max_steps,
            json,
        } => commands::research::run(request, max_steps, json).await?,
        Commands::Capabilities { json } => commands::capabilities::run(json).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
            ConfigAction::Init => commands::config_cmd::init().await?,
        },
    }

    Ok(())
}
