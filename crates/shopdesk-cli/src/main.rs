use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shopdesk_infrastructure::{ShopdeskPaths, TomlSettingsRepository};

mod bootstrap;
mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "shopdesk")]
#[command(about = "Shopdesk - unattended storefront chat console responder", long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/shopdesk/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and answer conversations every interval
    Run {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// Print the reply mode for a moment
    Mode {
        /// Local time as "YYYY-MM-DD HH:MM" (default: now)
        #[arg(long)]
        at: Option<String>,
    },
    /// Inspect the reply throttle ledger
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum LedgerAction {
    /// List every customer and their last automated reply
    List,
    /// Tell whether a customer would get a reply
    Check {
        customer: String,
        #[arg(long)]
        at: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a template configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the configuration path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = ShopdeskPaths::resolve().context("Failed to resolve shopdesk directories")?;
    paths.ensure_dirs().context("Failed to create shopdesk directories")?;
    let settings = match cli.config {
        Some(path) => TomlSettingsRepository::with_path(path, paths.clone()),
        None => TomlSettingsRepository::new(paths.clone()),
    };

    let _guard = match &cli.command {
        Commands::Run { .. } => logging::init("info", Some(paths.logs_dir().as_path())),
        _ => logging::init("warn", None),
    };

    match cli.command {
        Commands::Run { once } => commands::run::run(&settings, &paths, once).await?,
        Commands::Mode { at } => commands::mode::show(&settings, at.as_deref())?,
        Commands::Ledger { action } => match action {
            LedgerAction::List => commands::ledger::list(&paths).await?,
            LedgerAction::Check { customer, at } => {
                commands::ledger::check(&settings, &paths, &customer, at.as_deref()).await?
            }
        },
        Commands::Config { action } => match action {
            ConfigAction::Init { force } => commands::config::init(&settings, force)?,
            ConfigAction::Path => commands::config::path(&settings),
        },
    }

    Ok(())
}
