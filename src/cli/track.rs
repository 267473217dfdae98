use ansi_term::Colour;
use anyhow::{bail, Result};
use chrono::{Local, NaiveDate};
use clap::Subcommand;

use crate::{
    services::Services,
    tracker::entities::DayActivities,
    utils::time::{date_to_key, parse_day},
};

const DATE_HELP: &str =
    "Day to use. Examples are \"today\", \"yesterday\", \"2025-03-15\", \"15/03/2025\"";

#[derive(Subcommand, Debug)]
pub enum TrackCommand {
    #[command(about = "Replace the activity recorded for a day")]
    Set {
        #[arg(help = DATE_HELP)]
        date: String,
        #[arg(
            required = true,
            value_parser = parse_entry,
            help = "Activity counts such as coding=3 reading=40"
        )]
        entries: Vec<(String, u32)>,
    },
    #[command(about = "Forget the activity recorded for a day")]
    Clear {
        #[arg(help = DATE_HELP)]
        date: String,
    },
    #[command(about = "Show the activity recorded for a day")]
    Show {
        #[arg(help = DATE_HELP)]
        date: String,
    },
    #[command(about = "Show every day with a positive count for one activity")]
    Type { activity: String },
    #[command(about = "Show the activity of one calendar month")]
    Month {
        year: i32,
        #[arg(value_parser = clap::value_parser!(u32).range(1..=12), help = "Month from 1 to 12")]
        month: u32,
    },
    #[command(about = "Show the sum of every activity over the whole history")]
    Totals,
    #[command(about = "Show the number of consecutive active days")]
    Streak,
}

fn parse_entry(value: &str) -> Result<(String, u32), String> {
    let Some((activity, count)) = value.split_once('=') else {
        return Err(format!("Expected <activity>=<count>, got {value:?}"));
    };
    let activity = activity.trim();
    if activity.is_empty() {
        return Err(format!("Missing activity name in {value:?}"));
    }
    let count = count
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("Invalid count in {value:?}: {e}"))?;
    Ok((activity.to_string(), count))
}

pub async fn process_track_command(command: TrackCommand, services: &mut Services) -> Result<()> {
    let now = services.clock.time().with_timezone(&Local);
    let tracker = &mut services.tracker;
    match command {
        TrackCommand::Set { date, entries } => {
            let date = parse_day(&date, now)?;
            let activities = entries.into_iter().collect::<DayActivities>();
            tracker.save(date, activities).await;
            println!("{} {}", Colour::Green.paint("Saved"), date_to_key(date));
        }
        TrackCommand::Clear { date } => {
            let date = parse_day(&date, now)?;
            if !tracker.clear(date).await {
                bail!("Nothing recorded for {}", date_to_key(date));
            }
            println!("{} {}", Colour::Green.paint("Cleared"), date_to_key(date));
        }
        TrackCommand::Show { date } => {
            let date = parse_day(&date, now)?;
            match tracker.by_date(date) {
                Some(activities) => print_day(date, activities),
                None => println!("Nothing recorded for {}", date_to_key(date)),
            }
        }
        TrackCommand::Type { activity } => {
            for (date, count) in tracker.by_type(&activity) {
                println!("{}\t{count}", date_to_key(date));
            }
        }
        TrackCommand::Month { year, month } => {
            for (date, activities) in tracker.by_month(year, month - 1) {
                print_day(date, &activities);
            }
        }
        TrackCommand::Totals => {
            for (activity, total) in tracker.totals_by_type() {
                println!("{activity}\t{total}");
            }
        }
        TrackCommand::Streak => {
            let streak = tracker.current_streak();
            let colour = if streak > 0 { Colour::Green } else { Colour::Yellow };
            println!(
                "{}",
                colour.paint(format!(
                    "{streak} day{}",
                    if streak == 1 { "" } else { "s" }
                ))
            );
        }
    }
    Ok(())
}

fn print_day(date: NaiveDate, activities: &DayActivities) {
    let entries = activities
        .iter()
        .map(|(activity, count)| format!("{activity}={count}"))
        .collect::<Vec<_>>();
    println!("{}\t{}", date_to_key(date), entries.join(" "));
}

#[cfg(test)]
mod tests {
    use super::parse_entry;

    #[test]
    fn test_parse_entry() {
        assert_eq!(parse_entry("coding=3"), Ok(("coding".to_string(), 3)));
        assert_eq!(parse_entry(" reading = 40 "), Ok(("reading".to_string(), 40)));
        assert!(parse_entry("coding").is_err());
        assert!(parse_entry("=3").is_err());
        assert!(parse_entry("coding=-1").is_err());
    }
}
