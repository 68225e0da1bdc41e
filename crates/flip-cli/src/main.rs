//! Flip CLI
//!
//! Command-line interface for Flip - a feature-flag control panel.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use flip_core::Config;

mod commands;
mod inventory;
mod output;
mod report;
mod tui;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "flip")]
#[command(about = "Feature flag dashboard with optimistic toggle sync")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the TUI dashboard
    Tui,
    /// List flag bindings and their current values
    List {
        /// Show the laptop inventory instead of flag bindings
        #[arg(long)]
        inventory: bool,
    },
    /// Toggle a flag through its relay endpoint
    Toggle {
        /// Flag key to change
        flag: String,
        /// Desired state (on or off)
        state: String,
    },
    /// Show configuration and relay health
    Status,
    /// Show or manage configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Print the config file location
    Path,
    /// Write a starter config file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config path and init work even when the config file is malformed
    if let Some(Commands::Config { command }) = &cli.command {
        return handle_config_command(command.clone(), &output);
    }

    let config = Config::load().context("Failed to load configuration")?;

    // TUI is the default when no command is given
    match cli.command {
        Some(Commands::Tui) | None => tui::run(config).await,
        Some(Commands::List { inventory }) => {
            commands::list::run(&config, inventory, &output).await
        }
        Some(Commands::Toggle { flag, state }) => {
            commands::toggle::run(&config, &flag, &state, &output).await
        }
        Some(Commands::Status) => commands::status::run(&config, &output).await,
        Some(Commands::Config { .. }) => unreachable!(), // Handled above
    }
}

fn handle_config_command(command: Option<ConfigCommands>, output: &Output) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(output),
        Some(ConfigCommands::Path) => commands::config::path(output),
        Some(ConfigCommands::Init) => commands::config::init(output),
    }
}
