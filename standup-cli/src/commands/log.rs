use chrono::NaiveDate;
use clap::Args;
use standup_core::models::duration::parse_minutes;
use standup_core::{TaskRef, WorkItem, WorkStatus};

use super::date_or_today;
use crate::config::Config;
use crate::sync::DaySession;

/// Log time spent on a task
#[derive(Args)]
pub struct LogCommand {
    /// Task as kind:name (kind is task, contract or project; default task)
    #[arg(long, short)]
    pub task: TaskRef,

    /// Time spent, e.g. 45m, 1h30m or 90
    #[arg(long, short, value_parser = parse_minutes)]
    pub duration: u32,

    /// Date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Status (planned, in_progress, done, blocked)
    #[arg(long, short, default_value = "in_progress")]
    pub status: WorkStatus,

    /// What was done
    #[arg(long = "message", short = 'm', default_value = "")]
    pub description: String,
}

impl LogCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let item = self.to_work_item(config);

        let session = DaySession::open(config, item.date)?;
        session.save(item.clone())?;
        session.close()?;

        println!("Logged {}", item);
        Ok(())
    }

    fn to_work_item(&self, config: &Config) -> WorkItem {
        WorkItem::new(
            date_or_today(self.date),
            self.task.clone(),
            config.user.value.clone(),
        )
        .with_duration(self.duration)
        .with_status(self.status)
        .with_description(self.description.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use standup_core::TaskKind;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        log: LogCommand,
    }

    fn config() -> Config {
        let temp_dir = tempfile::tempdir().unwrap();
        Config::load_with_env(Some(temp_dir.path().join("none.yaml")), |name| {
            (name == "STANDUP_USER").then(|| "alice".to_string())
        })
        .unwrap()
    }

    #[test]
    fn test_parse_log_arguments() {
        let cli = Cli::try_parse_from([
            "log",
            "--task",
            "contract:acme",
            "-d",
            "1h30m",
            "--date",
            "2025-03-14",
            "-s",
            "done",
            "-m",
            "migration",
        ])
        .unwrap();

        let item = cli.log.to_work_item(&config());
        assert_eq!(item.task.kind, TaskKind::Contract);
        assert_eq!(item.task.name, "acme");
        assert_eq!(item.duration_minutes, 90);
        assert_eq!(item.date, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
        assert_eq!(item.status, WorkStatus::Done);
        assert_eq!(item.description, "migration");
        assert_eq!(item.created_by, "alice");
        assert!(item.id.is_none());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["log", "-t", "JIRA-7", "-d", "20"]).unwrap();
        let item = cli.log.to_work_item(&config());

        assert_eq!(item.task, TaskRef::task("JIRA-7"));
        assert_eq!(item.status, WorkStatus::InProgress);
        assert!(item.description.is_empty());
    }

    #[test]
    fn test_rejects_bad_duration() {
        assert!(Cli::try_parse_from(["log", "-t", "x", "-d", "soon"]).is_err());
        assert!(Cli::try_parse_from(["log", "-t", "x", "-d", "25h"]).is_err());
    }
}
