use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod sync;

use commands::{
    ConfigCommand, EditCommand, JournalCommand, LogCommand, RemoveCommand, SessionCommand,
    SyncCommand, TeamCommand,
};
use config::Config;

#[derive(Parser)]
#[command(name = "standup")]
#[command(version)]
#[command(about = "Log work and share daily standups", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Show debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log time spent on a task
    Log(LogCommand),

    /// Change a logged work item
    Edit(EditCommand),

    /// Remove a logged work item
    Remove(RemoveCommand),

    /// Show the work items logged on a day
    Journal(JournalCommand),

    /// Show team availability for a day
    Team(TeamCommand),

    /// Edit a day interactively
    Session(SessionCommand),

    /// Sync with remote server
    Sync(SyncCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Save config path for config commands
    let cli_config_path = cli.config.clone();

    let config = Config::load(cli.config)?;

    match &cli.command {
        Some(Commands::Log(cmd)) => cmd.run(&config)?,
        Some(Commands::Edit(cmd)) => cmd.run(&config)?,
        Some(Commands::Remove(cmd)) => cmd.run(&config)?,
        Some(Commands::Journal(cmd)) => cmd.run(&config)?,
        Some(Commands::Team(cmd)) => cmd.run(&config)?,
        Some(Commands::Session(cmd)) => cmd.run(&config)?,
        Some(Commands::Sync(cmd)) => cmd.run(&config)?,
        Some(Commands::Config(cmd)) => cmd.run(&config, cli_config_path)?,
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "standup=debug,standup_core=debug"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}
