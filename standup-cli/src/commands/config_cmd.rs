use clap::{Args, Subcommand};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use super::OutputFormat;
use crate::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the config file path
    Path,

    /// Initialize configuration file
    Init,
}

const DEFAULT_CONFIG: &str = r#"# standup configuration

# Name recorded on new work items
user: default

# Minutes in a full working day, used by `standup team`
# daily_capacity_minutes: 480

# sync:
#   server_url: "http://localhost:8080"
#   api_key: "your-api-key"
#   debounce_ms: 2000
#   request_timeout_secs: 10
#   retry:
#     max_attempts: 3
#     backoff_ms: 5000
"#;

impl ConfigCommand {
    pub fn run(
        &self,
        config: &Config,
        cli_config_path: Option<PathBuf>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => print!("{}", render(config)),
                }
                Ok(())
            }

            ConfigSubcommand::Path => {
                let path = cli_config_path.unwrap_or_else(Config::default_config_path);
                println!("{}", path.display());
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = cli_config_path.unwrap_or_else(Config::default_config_path);

                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'standup config show' to view current configuration.");
                    return Ok(());
                }

                if let Some(parent) = config_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                let mut file = fs::File::create(&config_path)?;
                file.write_all(DEFAULT_CONFIG.as_bytes())?;

                println!("Created config file: {}", config_path.display());
                println!("\nEdit this file to customize your settings.");
                Ok(())
            }
        }
    }
}

fn render(config: &Config) -> String {
    let mut out = String::from("Configuration\n=============\n\n");

    match &config.config_file {
        Some(path) => out.push_str(&format!("Config file: {}\n\n", path.display())),
        None => out.push_str(&format!(
            "Config file: {} (not found)\n\n",
            Config::default_config_path().display()
        )),
    }

    out.push_str(&format!("user: {}\n", config.user.value));
    out.push_str(&format!("  source: {}\n\n", config.user.source));

    out.push_str(&format!(
        "daily_capacity_minutes: {}\n",
        config.daily_capacity_minutes.value
    ));
    out.push_str(&format!(
        "  source: {}\n\n",
        config.daily_capacity_minutes.source
    ));

    let sync = &config.sync;
    out.push_str("sync:\n");
    out.push_str(&format!(
        "  server_url: {}\n",
        sync.server_url.as_deref().unwrap_or("(not set)")
    ));
    out.push_str(&format!(
        "  api_key: {}\n",
        if sync.api_key.is_some() { "(set)" } else { "(not set)" }
    ));
    out.push_str(&format!("  debounce_ms: {}\n", sync.debounce_ms));
    out.push_str(&format!(
        "  request_timeout_secs: {}\n",
        sync.request_timeout_secs
    ));
    out.push_str(&format!(
        "  retry: {} attempt(s), backoff {}ms\n",
        sync.retry.max_attempts, sync.retry.backoff_ms
    ));

    out
}
