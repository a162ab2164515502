//! Interactive editing of one day.
//!
//! Edits are applied locally right away and committed in the background once
//! typing pauses for the configured quiet period.

use chrono::{Local, NaiveDate};
use clap::Args;
use standup_core::models::duration::{format_minutes, parse_minutes};
use standup_core::sync::SyncOutcome;
use standup_core::{TaskRef, WorkItem, WorkStatus};
use std::io::{self, BufRead, Write};

use super::date_or_today;
use crate::config::Config;
use crate::sync::DaySession;

const HELP: &str = "\
Commands:
  add <kind:name> <duration> [description...]   log new work
  set <id> duration|status|description|task <value...>
  rm <id>                                       remove a work item
  ls                                            list the day's work items
  status                                        show sync state
  sync                                          commit pending edits now
  date <YYYY-MM-DD>                             switch to another day
  help                                          show this help
  quit                                          sync and leave";

/// Edit a day interactively, syncing in the background
#[derive(Args)]
pub struct SessionCommand {
    /// Date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
enum Change {
    Duration(u32),
    Status(WorkStatus),
    Description(String),
    Task(TaskRef),
}

#[derive(Debug, Clone, PartialEq)]
enum Input {
    Empty,
    Add {
        task: TaskRef,
        minutes: u32,
        description: String,
    },
    Set {
        reference: String,
        change: Change,
    },
    Remove(String),
    List,
    Status,
    Sync,
    Date(NaiveDate),
    Help,
    Quit,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(Input::Empty);
    };
    let rest: Vec<&str> = words.collect();

    match (command, rest.as_slice()) {
        ("add", [task, duration, description @ ..]) => Ok(Input::Add {
            task: task.parse().map_err(|e| format!("{}", e))?,
            minutes: parse_minutes(duration).map_err(|e| format!("{}", e))?,
            description: description.join(" "),
        }),
        ("add", _) => Err("usage: add <kind:name> <duration> [description...]".to_string()),
        ("set", [reference, field, value @ ..]) if !value.is_empty() => {
            let value = value.join(" ");
            let change = match *field {
                "duration" => Change::Duration(parse_minutes(&value).map_err(|e| e.to_string())?),
                "status" => Change::Status(value.parse().map_err(|e| format!("{}", e))?),
                "description" => Change::Description(value),
                "task" => Change::Task(value.parse().map_err(|e| format!("{}", e))?),
                other => return Err(format!("Unknown field '{}'", other)),
            };
            Ok(Input::Set {
                reference: reference.to_string(),
                change,
            })
        }
        ("set", _) => {
            Err("usage: set <id> duration|status|description|task <value...>".to_string())
        }
        ("rm", [reference]) => Ok(Input::Remove(reference.to_string())),
        ("rm", _) => Err("usage: rm <id>".to_string()),
        ("date", [date]) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(Input::Date)
            .map_err(|_| format!("Invalid date '{}', expected YYYY-MM-DD", date)),
        ("date", _) => Err("usage: date <YYYY-MM-DD>".to_string()),
        ("ls", []) => Ok(Input::List),
        ("status", []) => Ok(Input::Status),
        ("sync", []) => Ok(Input::Sync),
        ("help", _) => Ok(Input::Help),
        ("quit" | "exit", _) => Ok(Input::Quit),
        (other, _) => Err(format!("Unknown command '{}'. Type 'help'.", other)),
    }
}

impl SessionCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let mut session = DaySession::open(config, date_or_today(self.date))?;
        println!(
            "Editing {} ({} work item(s)). Type 'help' for commands.",
            session.date(),
            session.items().len()
        );

        let stdin = io::stdin();
        let mut line = String::new();
        loop {
            print!("standup> ");
            io::stdout().flush()?;

            line.clear();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }

            match parse_input(&line) {
                Ok(Input::Quit) => break,
                Ok(input) => {
                    if let Err(e) = handle(&mut session, input, config) {
                        eprintln!("Error: {}", e);
                    }
                }
                Err(message) => eprintln!("{}", message),
            }
        }

        session.close()?;
        println!("All changes synced.");
        Ok(())
    }
}

fn handle(
    session: &mut DaySession,
    input: Input,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match input {
        Input::Empty | Input::Quit => {}
        Input::Help => println!("{}", HELP),
        Input::Add {
            task,
            minutes,
            description,
        } => {
            let item = WorkItem::new(session.date(), task, config.user.value.clone())
                .with_duration(minutes)
                .with_description(description);
            session.save(item.clone())?;
            println!("Added {}", item);
        }
        Input::Set { reference, change } => {
            let item = apply_change(session.find(&reference)?, change);
            session.save(item.clone())?;
            println!("Updated {}", item);
        }
        Input::Remove(reference) => {
            let item = session.find(&reference)?;
            session.remove(&item.client_id)?;
            println!("Removed {}", item);
        }
        Input::List => {
            let items = session.items();
            if items.is_empty() {
                println!("No work logged on {}.", session.date());
            }
            for item in items.iter() {
                println!("  {}", item);
            }
            let total: u32 = items.iter().map(|item| item.duration_minutes).sum();
            if total > 0 {
                println!("  total {}", format_minutes(total));
            }
        }
        Input::Status => {
            let status = session.status();
            if status.in_flight {
                println!("Sync in progress");
            } else if status.obsolete {
                println!("{} change(s) waiting to sync", status.pending);
            } else {
                println!("In sync");
            }
            if let Some(at) = status.last_mutation_on {
                println!("Last synced at {}", at.with_timezone(&Local).format("%H:%M:%S"));
            }
            if let Some(e) = &status.last_error {
                println!(
                    "Last sync failed ({} attempt(s)): {}",
                    status.failed_attempts, e
                );
            }
        }
        Input::Sync => match session.flush()? {
            SyncOutcome::NothingToSync => println!("Nothing to sync"),
            SyncOutcome::Committed { sent, .. } => println!("Synced {} change(s)", sent),
            SyncOutcome::Failed(e) => println!("Sync failed: {}", e),
        },
        Input::Date(date) => {
            session.switch_date(date)?;
            println!(
                "Editing {} ({} work item(s))",
                date,
                session.items().len()
            );
        }
    }
    Ok(())
}

fn apply_change(mut item: WorkItem, change: Change) -> WorkItem {
    match change {
        Change::Duration(minutes) => item.duration_minutes = minutes,
        Change::Status(status) => item.status = status,
        Change::Description(description) => item.description = description,
        Change::Task(task) => item.task = task,
    }
    item
}
