use chrono::NaiveDate;
use clap::Args;
use standup_core::models::duration::format_minutes;
use standup_core::{team_availability, MemberAvailability};

use super::{date_or_today, OutputFormat};
use crate::config::Config;
use crate::sync::{client_from_config, runtime};

/// Show how booked each team member is on a day
#[derive(Args)]
pub struct TeamCommand {
    /// Date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl TeamCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let date = date_or_today(self.date);
        let client = client_from_config(config)?;
        let items = runtime()?.block_on(client.fetch_team_day(date))?;
        let team = team_availability(date, &items, config.daily_capacity_minutes.value);

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&team)?),
            OutputFormat::Text => print!("{}", render(date, &team)),
        }
        Ok(())
    }
}

fn render(date: NaiveDate, team: &[MemberAvailability]) -> String {
    let mut out = format!("Team availability for {}\n\n", date);

    if team.is_empty() {
        out.push_str("Nobody has logged work yet.\n");
        return out;
    }

    for member in team {
        out.push_str(&format!(
            "  {:<16} logged {:>6}  available {:>6}  {:>3}%",
            member.user,
            format_minutes(member.logged_minutes),
            format_minutes(member.available_minutes()),
            member.utilization_percent()
        ));
        if member.is_overbooked() {
            out.push_str("  overbooked");
        }
        if member.blocked > 0 {
            out.push_str(&format!("  blocked: {}", member.blocked));
        }
        out.push('\n');
    }

    out
}
