use anyhow::Result;
use owo_colors::OwoColorize;
use poolday_core::constants::MAX_MATERIALIZED_OCCURRENCES;
use poolday_core::date_range::DayRange;
use poolday_core::recurrence::{Frequency, RecurrenceSeries, expand, occurrence_position};
use poolday_core::series::materialize_through;
use poolday_core::time_window::CalendarDay;

use crate::render::Render;

/// Without `--to`, shows what creating the series would materialize.
pub fn run(
    horizon_days: i64,
    frequency: &str,
    start: &str,
    end: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<()> {
    let frequency: Frequency = frequency.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let start = parse_day(start)?;
    let end = end.map(parse_day).transpose()?;

    if let Some(end) = end {
        if end < start {
            anyhow::bail!("Series end {} is before its start {}", end, start);
        }
    }

    let from = from.map(parse_day).transpose()?.unwrap_or(start);
    let to = match to {
        Some(s) => parse_day(s)?,
        None => materialize_through(from, end, horizon_days),
    };
    if to < from {
        anyhow::bail!("Range end {} is before start {}", to, from);
    }

    let series = RecurrenceSeries::new("preview", frequency, start, end);
    let days: Vec<CalendarDay> = expand(&series, DayRange::new(from, to))
        .take(MAX_MATERIALIZED_OCCURRENCES)
        .collect();

    if days.is_empty() {
        println!("{}", "No occurrences in range".dimmed());
        return Ok(());
    }

    for day in &days {
        let position = occurrence_position(&series, *day)
            .map(|p| format!("#{}", p + 1))
            .unwrap_or_default();
        println!("{} {}", day.render(), position.dimmed());
    }

    if days.len() == MAX_MATERIALIZED_OCCURRENCES {
        println!(
            "{}",
            format!("(showing the first {} occurrences)", MAX_MATERIALIZED_OCCURRENCES).dimmed()
        );
    }

    Ok(())
}

fn parse_day(s: &str) -> Result<CalendarDay> {
    CalendarDay::parse(s).map_err(|e| anyhow::anyhow!(e))
}
