mod config_cmd;
mod edit;
mod journal;
mod log;
mod remove;
mod session;
mod sync_cmd;
mod team;

pub use config_cmd::ConfigCommand;
pub use edit::EditCommand;
pub use journal::JournalCommand;
pub use log::LogCommand;
pub use remove::RemoveCommand;
pub use session::SessionCommand;
pub use sync_cmd::SyncCommand;
pub use team::TeamCommand;

use chrono::{Local, NaiveDate};
use clap::ValueEnum;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// The given date, or today in local time.
fn date_or_today(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Local::now().date_naive())
}
