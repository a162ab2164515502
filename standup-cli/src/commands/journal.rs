use chrono::NaiveDate;
use clap::Args;
use standup_core::models::duration::format_minutes;
use standup_core::DailyJournal;

use super::{date_or_today, OutputFormat};
use crate::config::Config;
use crate::sync::{client_from_config, runtime};

/// Show the work items logged on a day
#[derive(Args)]
pub struct JournalCommand {
    /// Date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl JournalCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let date = date_or_today(self.date);
        let client = client_from_config(config)?;
        let items = runtime()?.block_on(client.fetch_day(date))?;
        let journal = DailyJournal::for_date(date, &items);

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&journal)?),
            OutputFormat::Text => print!("{}", render(&journal)),
        }
        Ok(())
    }
}

/// Renders a journal as standup notes.
pub fn render(journal: &DailyJournal) -> String {
    let mut out = format!("Journal for {}\n", journal.date);

    if journal.is_empty() {
        out.push_str("\nNo work logged.\n");
        return out;
    }

    out.push('\n');
    for item in &journal.items {
        out.push_str(&format!("  {}\n", item));
    }

    out.push_str(&format!(
        "\nTotal: {}\n",
        format_minutes(journal.total_minutes())
    ));
    for (status, minutes) in journal.minutes_by_status() {
        out.push_str(&format!("  {:<12} {}\n", status, format_minutes(minutes)));
    }

    let tasks = journal.task_totals();
    if tasks.len() > 1 {
        out.push_str("\nBy task:\n");
        for total in tasks {
            out.push_str(&format!(
                "  {:<24} {:>6} ({} entr{})\n",
                total.task.to_string(),
                format_minutes(total.minutes),
                total.entries,
                if total.entries == 1 { "y" } else { "ies" }
            ));
        }
    }

    let blockers: Vec<_> = journal.blockers().collect();
    if !blockers.is_empty() {
        out.push_str("\nBlocked:\n");
        for item in blockers {
            out.push_str(&format!("  {}\n", item));
        }
    }

    out
}
