//! Sync CLI commands.

use clap::{Args, Subcommand};
use standup_core::check_server;

use crate::config::Config;
use crate::sync::{client_from_config, runtime};

/// Inspect the connection to the sync server
#[derive(Debug, Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: SyncSubcommand,
}

#[derive(Debug, Subcommand)]
enum SyncSubcommand {
    /// Show sync configuration and server status
    Status,
}

impl SyncCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            SyncSubcommand::Status => self.status(config),
        }
    }

    fn status(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        println!("Sync Configuration");
        println!("==================");
        println!();

        let Some(server_url) = config.sync.server_url.as_deref() else {
            print_setup_help();
            return Ok(());
        };
        if config.sync.api_key.is_none() {
            print_setup_help();
            return Ok(());
        }

        let retry = config.sync.scheduler_options().retry;
        println!("Server:    {}", server_url);
        println!("Debounce:  {}ms", config.sync.debounce_ms);
        println!(
            "Retries:   {} (first after {}ms)",
            retry.max_attempts, config.sync.retry.backoff_ms
        );
        println!();

        let rt = runtime()?;
        print!("Server status: ");
        if !rt.block_on(check_server(server_url)) {
            println!("✗ unreachable");
            return Ok(());
        }
        println!("✓ connected");

        let client = client_from_config(config)?;
        match rt.block_on(client.me()) {
            Ok(me) => println!("Signed in as: {} (group {})", me.user_id, me.group_id),
            Err(e) => println!("Identity:      ✗ {}", e),
        }

        Ok(())
    }
}

fn print_setup_help() {
    println!("Status: Not configured");
    println!();
    println!("To enable sync, add to your config file:");
    println!();
    println!("  sync:");
    println!("    server_url: \"http://localhost:8080\"");
    println!("    api_key: \"your-api-key\"");
    println!();
    println!("Or set environment variables:");
    println!("  STANDUP_SYNC_URL");
    println!("  STANDUP_SYNC_API_KEY");
}
