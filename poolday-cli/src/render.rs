//! Colored terminal rendering for poolday-core types.

use owo_colors::OwoColorize;
use poolday_core::appointment::{Appointment, AppointmentStatus};
use poolday_core::queue::{DeliveryState, FailureKind, QueuedServiceRecord};
use poolday_core::sync::{FailedRecord, SyncReport};
use poolday_core::time_window::CalendarDay;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for CalendarDay {
    fn render(&self) -> String {
        format!("{} {}", self.weekday(), self).bold().to_string()
    }
}

impl Render for AppointmentStatus {
    fn render(&self) -> String {
        let label = self.to_string();
        match self {
            AppointmentStatus::Scheduled => label.dimmed().to_string(),
            AppointmentStatus::Confirmed => label.blue().to_string(),
            AppointmentStatus::InProgress => label.yellow().to_string(),
            AppointmentStatus::Completed => label.green().to_string(),
            AppointmentStatus::Cancelled => label.red().strikethrough().to_string(),
        }
    }
}

impl Render for Appointment {
    fn render(&self) -> String {
        let recurring = if self.is_recurring() { " ↻" } else { "" };
        let technician = self
            .technician_id
            .as_deref()
            .map(|t| format!(" ({})", t))
            .unwrap_or_default();

        format!(
            "{} {}{}{} {}",
            self.time.format("%H:%M").dimmed(),
            self.customer_id,
            technician.dimmed(),
            recurring.cyan(),
            self.status.render()
        )
    }
}

impl Render for DeliveryState {
    fn render(&self) -> String {
        match self {
            DeliveryState::Pending => "pending".yellow().to_string(),
            DeliveryState::Committed => "committed".green().to_string(),
            DeliveryState::Failed { kind, reason } => {
                format!("{} {}", kind.render(), reason.dimmed())
            }
        }
    }
}

impl Render for FailureKind {
    fn render(&self) -> String {
        match self {
            FailureKind::Unavailable => "unavailable".red().to_string(),
            FailureKind::Rejected => "rejected".magenta().bold().to_string(),
        }
    }
}

impl Render for QueuedServiceRecord {
    fn render(&self) -> String {
        let short_id: String = self.id.chars().take(8).collect();
        format!(
            "{} {} {} {}",
            short_id.dimmed(),
            self.payload.customer_id,
            self.queued_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            self.state.render()
        )
    }
}

impl Render for FailedRecord {
    fn render(&self) -> String {
        format!(
            "   {} {} {}\n      {}",
            "✗".red(),
            self.id,
            self.kind.render(),
            self.reason.dimmed()
        )
    }
}

impl Render for SyncReport {
    fn render(&self) -> String {
        let mut lines = Vec::new();

        for id in &self.committed {
            lines.push(format!("   {} {}", "✓".green(), id));
        }
        for failed in &self.failed {
            lines.push(failed.render());
        }

        let summary = if self.is_clean() {
            self.summary().green().to_string()
        } else {
            self.summary().yellow().to_string()
        };
        lines.push(String::new());
        lines.push(summary);

        if self.failed.iter().any(|f| f.kind == FailureKind::Rejected) {
            lines.push(
                "Rejected records need fixing before they can be sent; they stay in the queue."
                    .dimmed()
                    .to_string(),
            );
        }

        lines.join("\n")
    }
}
