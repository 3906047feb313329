//! Change plans between two schedule states.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::appointment::Appointment;
use crate::error::PoolDayResult;
use crate::recurrence::RecurrenceSeries;
use crate::remote::AppointmentStore;
use crate::series::Schedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffKind {
    Create,
    Update,
    Delete,
}

impl DiffKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            DiffKind::Create => "+",
            DiffKind::Update => "~",
            DiffKind::Delete => "-",
        }
    }
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

fn kind_of<T>(old: &Option<T>, new: &Option<T>) -> Option<DiffKind> {
    match (old, new) {
        (None, Some(_)) => Some(DiffKind::Create),
        (Some(_), None) => Some(DiffKind::Delete),
        (Some(_), Some(_)) => Some(DiffKind::Update),
        (None, None) => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesDiff {
    pub kind: DiffKind,
    pub old: Option<RecurrenceSeries>,
    pub new: Option<RecurrenceSeries>,
}

impl SeriesDiff {
    /// Only definition changes count; ownership moves show up on the appointments.
    pub fn get_diff(
        old: Option<RecurrenceSeries>,
        new: Option<RecurrenceSeries>,
    ) -> Option<SeriesDiff> {
        if let (Some(o), Some(n)) = (&old, &new) {
            if o.same_definition(n) {
                return None;
            }
        }
        kind_of(&old, &new).map(|kind| SeriesDiff { kind, old, new })
    }

    /// Get the series (prefer new, fallback to old)
    pub fn series(&self) -> &RecurrenceSeries {
        self.new
            .as_ref()
            .or(self.old.as_ref())
            .expect("SeriesDiff must have at least one series")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentDiff {
    pub kind: DiffKind,
    pub old: Option<Appointment>,
    pub new: Option<Appointment>,
}

impl AppointmentDiff {
    pub fn get_diff(old: Option<Appointment>, new: Option<Appointment>) -> Option<AppointmentDiff> {
        if old.is_some() && old == new {
            return None;
        }
        kind_of(&old, &new).map(|kind| AppointmentDiff { kind, old, new })
    }

    /// Get the appointment (prefer new, fallback to old)
    pub fn appointment(&self) -> &Appointment {
        self.new
            .as_ref()
            .or(self.old.as_ref())
            .expect("AppointmentDiff must have at least one appointment")
    }
}

impl fmt::Display for AppointmentDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.appointment())
    }
}

/// Everything that changed between two schedule states, in store order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleDiff {
    pub series: Vec<SeriesDiff>,
    pub appointments: Vec<AppointmentDiff>,
}

impl ScheduleDiff {
    pub fn between(before: &Schedule, after: &Schedule) -> Self {
        let series_ids: BTreeSet<&String> =
            before.series.keys().chain(after.series.keys()).collect();
        let series = series_ids
            .into_iter()
            .filter_map(|id| {
                SeriesDiff::get_diff(before.series.get(id).cloned(), after.series.get(id).cloned())
            })
            .collect();

        let appointment_ids: BTreeSet<&String> = before
            .appointments
            .keys()
            .chain(after.appointments.keys())
            .collect();
        let mut appointments: Vec<AppointmentDiff> = appointment_ids
            .into_iter()
            .filter_map(|id| {
                AppointmentDiff::get_diff(
                    before.appointments.get(id).cloned(),
                    after.appointments.get(id).cloned(),
                )
            })
            .collect();

        // Sort by date (ascending), then id for stable output
        appointments.sort_by(|a, b| {
            a.appointment()
                .date
                .cmp(&b.appointment().date)
                .then_with(|| a.appointment().id.cmp(&b.appointment().id))
        });

        ScheduleDiff {
            series,
            appointments,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty() && self.appointments.is_empty()
    }

    /// (created, updated, deleted) appointment counts.
    pub fn counts(&self) -> (usize, usize, usize) {
        let mut created = 0;
        let mut updated = 0;
        let mut deleted = 0;

        for diff in &self.appointments {
            match diff.kind {
                DiffKind::Create => created += 1,
                DiffKind::Update => updated += 1,
                DiffKind::Delete => deleted += 1,
            }
        }

        (created, updated, deleted)
    }

    fn series_of(&self, kind: DiffKind) -> impl Iterator<Item = &SeriesDiff> {
        self.series.iter().filter(move |d| d.kind == kind)
    }

    fn appointments_of(&self, kind: DiffKind) -> impl Iterator<Item = &AppointmentDiff> {
        self.appointments.iter().filter(move |d| d.kind == kind)
    }

    /// Push the plan to the remote store.
    ///
    /// New series go first so appointments can reference them, and series
    /// are deleted last once nothing points at them. Stops at the first
    /// failure; every remote write is an idempotent upsert or delete, so the
    /// whole plan can be re-applied.
    pub async fn apply<S: AppointmentStore>(&self, store: &S) -> PoolDayResult<()> {
        for diff in self.series_of(DiffKind::Create) {
            store.create_series(diff.series()).await?;
        }

        for diff in self.series_of(DiffKind::Update) {
            let (Some(old), Some(new)) = (&diff.old, &diff.new) else {
                continue;
            };
            if old.end != new.end {
                store.update_series_end_date(&new.id, new.end).await?;
            }
            if old.exceptions != new.exceptions {
                store
                    .update_series_exceptions(&new.id, &new.exceptions)
                    .await?;
            }
        }

        for diff in self.appointments_of(DiffKind::Create) {
            store.create_appointment(diff.appointment()).await?;
        }

        for diff in self.appointments_of(DiffKind::Update) {
            let appointment = diff.appointment();
            store.update_appointment(&appointment.id, appointment).await?;
        }

        for diff in self.appointments_of(DiffKind::Delete) {
            store.delete_appointment(&diff.appointment().id).await?;
        }

        for diff in self.series_of(DiffKind::Delete) {
            store.delete_series(&diff.series().id).await?;
        }

        let (created, updated, deleted) = self.counts();
        debug!(created, updated, deleted, series = self.series.len(), "applied schedule diff");

        Ok(())
    }
}
