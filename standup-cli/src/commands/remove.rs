use chrono::NaiveDate;
use clap::Args;

use super::date_or_today;
use crate::config::Config;
use crate::sync::DaySession;

/// Remove a logged work item
#[derive(Args)]
pub struct RemoveCommand {
    /// Work item id or unique prefix
    pub reference: String,

    /// Date (YYYY-MM-DD) the item was logged on, defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

impl RemoveCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let session = DaySession::open(config, date_or_today(self.date))?;
        let item = session.find(&self.reference)?;
        session.remove(&item.client_id)?;
        session.close()?;

        println!("Removed {}", item);
        Ok(())
    }
}
