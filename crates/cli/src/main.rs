//! docfill CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Initialize config directory and default config
//! - `credential`: Store, show or clear the service credential
//! - `fill`: Upload a document and fill it interactively
//! - `export`: Upload, fill from `--set` pairs, write the result
//! - `status`: Show configuration status

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod repl;

#[derive(Parser)]
#[command(
    name = "docfill",
    about = "docfill — fill templated documents interactively or with an agent",
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
    /// Initialize configuration directory and default config
    Onboard,

    /// Manage the stored service credential
    Credential {
        #[command(subcommand)]
        action: CredentialAction,
    },

    /// Upload a document and fill its placeholders interactively
    Fill {
        /// The templated document
        file: PathBuf,
    },

    /// Upload a document, apply values, and write the filled copy
    Export {
        /// The templated document
        file: PathBuf,

        /// A value to apply, as `name=value` (repeatable)
        #[arg(short, long = "set", value_parser = repl::parse_assignment)]
        set: Vec<(String, String)>,

        /// Where to write the result (defaults to `<name>_filled.<ext>`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show configuration status
    Status,
}

#[derive(Subcommand)]
enum CredentialAction {
    /// Store a credential, replacing any previous one
    Set {
        /// The credential string
        key: String,
    },
    /// Show whether a credential is stored (redacted)
    Show,
    /// Remove the stored credential
    Clear,
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
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Credential { action } => match action {
            CredentialAction::Set { key } => commands::credential::set(&key).await?,
            CredentialAction::Show => commands::credential::show().await?,
            CredentialAction::Clear => commands::credential::clear().await?,
        },
        Commands::Fill { file } => commands::fill::run(file).await?,
        Commands::Export { file, set, output } => commands::export::run(file, set, output).await?,
        Commands::Status => commands::status::run().await?,
    }

    Ok(())
}
