use anyhow::Result;
use owo_colors::OwoColorize;
use poolday_core::calendar_index::CalendarIndex;
use poolday_core::remote::{AppointmentStore, Remote};
use poolday_core::time_window::{CalendarDay, CalendarViewWindow, ViewKind};

use crate::render::Render;
use crate::utils::tui::with_spinner;

pub async fn run(remote: &Remote, view: &str, date: Option<&str>, today: CalendarDay) -> Result<()> {
    let kind: ViewKind = view.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let anchor = match date {
        Some(s) => CalendarDay::parse(s).map_err(|e| anyhow::anyhow!(e))?,
        None => today,
    };
    let window = CalendarViewWindow::new(kind, anchor);
    let range = window.range();

    let appointments = with_spinner(
        format!("Loading {} of {}", kind, anchor),
        remote.list_appointments(range),
    )
    .await?;

    let index = CalendarIndex::build(&appointments, &window);

    println!("{}", format!("{} → {}", range.start, range.end).bold());

    if index.is_empty() {
        println!("   {}", "No appointments".dimmed());
        return Ok(());
    }

    for (day, bucket) in index.iter() {
        println!();
        println!("{}", day.render());
        for appointment in bucket {
            println!("   {}", appointment.render());
        }
    }

    println!(
        "\n{} {}",
        index.len(),
        if index.len() == 1 { "appointment" } else { "appointments" }
    );

    Ok(())
}
