use chrono::NaiveDate;
use clap::Args;
use standup_core::models::duration::parse_minutes;
use standup_core::{TaskRef, WorkItem, WorkStatus};

use super::date_or_today;
use crate::config::Config;
use crate::sync::DaySession;

/// Change a logged work item
#[derive(Args)]
pub struct EditCommand {
    /// Work item id or unique prefix (see `standup journal`)
    pub reference: String,

    /// Date (YYYY-MM-DD) the item was logged on, defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// New duration, e.g. 45m or 1h30m
    #[arg(long, short, value_parser = parse_minutes)]
    pub duration: Option<u32>,

    /// New status
    #[arg(long, short)]
    pub status: Option<WorkStatus>,

    /// New description
    #[arg(long = "message", short = 'm')]
    pub description: Option<String>,

    /// Move to another task (kind:name)
    #[arg(long, short)]
    pub task: Option<TaskRef>,
}

impl EditCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        if !self.has_changes() {
            return Err("Nothing to change. Pass --duration, --status, --message or --task.".into());
        }

        let session = DaySession::open(config, date_or_today(self.date))?;
        let item = self.apply(session.find(&self.reference)?);
        session.save(item.clone())?;
        session.close()?;

        println!("Updated {}", item);
        Ok(())
    }

    fn has_changes(&self) -> bool {
        self.duration.is_some()
            || self.status.is_some()
            || self.description.is_some()
            || self.task.is_some()
    }

    fn apply(&self, mut item: WorkItem) -> WorkItem {
        if let Some(minutes) = self.duration {
            item.duration_minutes = minutes;
        }
        if let Some(status) = self.status {
            item.status = status;
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
        if let Some(task) = &self.task {
            item.task = task.clone();
        }
        item
    }
}
