//! Recurring series ownership, materialization and scoped edits.
//!
//! `Schedule` is the in-memory set of series and appointments. Every
//! operation that changes it runs against a copy, commits only on success,
//! and returns the `ScheduleDiff` to push to the remote appointment store.

mod diff;
mod mutation;

pub use diff::{AppointmentDiff, DiffKind, ScheduleDiff, SeriesDiff};
pub use mutation::{MutationAction, MutationRequest, MutationScope};

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::appointment::{Appointment, AppointmentTemplate};
use crate::constants::MAX_MATERIALIZED_OCCURRENCES;
use crate::date_range::DayRange;
use crate::error::{PoolDayError, PoolDayResult};
use crate::recurrence::{Frequency, RecurrenceSeries, expand, occurrence_position};
use crate::time_window::CalendarDay;

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Last day a new series starting on `start` is materialized through: its
/// end when it has one, otherwise `start + horizon_days`.
pub fn materialize_through(
    start: CalendarDay,
    end: Option<CalendarDay>,
    horizon_days: i64,
) -> CalendarDay {
    end.unwrap_or_else(|| start.add_days(horizon_days.max(0)))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    series: BTreeMap<String, RecurrenceSeries>,
    appointments: BTreeMap<String, Appointment>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from records loaded from the remote store.
    ///
    /// Series ownership is rebuilt from each appointment's `series_id`;
    /// appointments pointing at an unknown series are kept as standalone.
    pub fn from_parts(
        series: impl IntoIterator<Item = RecurrenceSeries>,
        appointments: impl IntoIterator<Item = Appointment>,
    ) -> Self {
        let mut series: BTreeMap<String, RecurrenceSeries> = series
            .into_iter()
            .map(|mut s| {
                s.appointment_ids.clear();
                (s.id.clone(), s)
            })
            .collect();

        let appointments = appointments
            .into_iter()
            .map(|mut appointment| {
                match appointment
                    .series_id
                    .as_ref()
                    .and_then(|id| series.get_mut(id))
                {
                    Some(owner) => {
                        owner.appointment_ids.insert(appointment.id.clone());
                    }
                    None => appointment.detach(),
                }
                (appointment.id.clone(), appointment)
            })
            .collect();

        Schedule {
            series,
            appointments,
        }
    }

    pub fn series(&self, id: &str) -> Option<&RecurrenceSeries> {
        self.series.get(id)
    }

    pub fn all_series(&self) -> impl Iterator<Item = &RecurrenceSeries> {
        self.series.values()
    }

    pub fn appointment(&self, id: &str) -> Option<&Appointment> {
        self.appointments.get(id)
    }

    pub fn appointments(&self) -> impl Iterator<Item = &Appointment> {
        self.appointments.values()
    }

    /// Appointments owned by a series, ordered by date.
    pub fn appointments_of(&self, series_id: &str) -> Vec<&Appointment> {
        let Some(series) = self.series.get(series_id) else {
            return Vec::new();
        };

        let mut owned: Vec<_> = series
            .appointment_ids
            .iter()
            .filter_map(|id| self.appointments.get(id))
            .collect();
        owned.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        owned
    }

    /// Add a standalone appointment. Any series membership on it is dropped.
    pub fn add_appointment(&mut self, mut appointment: Appointment) -> ScheduleDiff {
        let before = self.clone();
        appointment.detach();
        debug!(appointment_id = %appointment.id, date = %appointment.date, "adding appointment");
        self.appointments.insert(appointment.id.clone(), appointment);
        ScheduleDiff::between(&before, self)
    }

    /// Create a series and materialize its first occurrences.
    ///
    /// Closed series are materialized through their end, open-ended ones
    /// through `start + horizon_days`; either way at most
    /// `MAX_MATERIALIZED_OCCURRENCES` appointments are created.
    pub fn create_series(
        &mut self,
        template: &AppointmentTemplate,
        frequency: Frequency,
        start: CalendarDay,
        end: Option<CalendarDay>,
        horizon_days: i64,
    ) -> (String, ScheduleDiff) {
        let before = self.clone();
        let series = RecurrenceSeries::new(new_id(), frequency, start, end);
        let series_id = series.id.clone();
        let through = materialize_through(start, end, horizon_days);

        debug!(series_id = %series_id, %frequency, %start, ?end, "creating series");
        self.series.insert(series_id.clone(), series);
        self.materialize_with(&series_id, template, through);

        (series_id, ScheduleDiff::between(&before, self))
    }

    /// Materialize any missing occurrences of a series through `through`.
    ///
    /// New appointments copy the latest owned appointment. Days that already
    /// have an appointment, and exception days, are left alone, so calling
    /// this repeatedly is harmless.
    pub fn materialize(
        &mut self,
        series_id: &str,
        through: CalendarDay,
    ) -> PoolDayResult<ScheduleDiff> {
        let latest = self
            .appointments_of(series_id)
            .last()
            .map(|a| (*a).clone())
            .ok_or_else(|| {
                PoolDayError::NotFound(format!(
                    "series {} has no appointment to copy from",
                    series_id
                ))
            })?;

        let template = AppointmentTemplate {
            time: latest.time,
            duration_minutes: latest.duration_minutes,
            customer_id: latest.customer_id,
            technician_id: latest.technician_id,
            notes: latest.notes,
        };

        let before = self.clone();
        self.materialize_with(series_id, &template, through);
        Ok(ScheduleDiff::between(&before, self))
    }

    fn materialize_with(
        &mut self,
        series_id: &str,
        template: &AppointmentTemplate,
        through: CalendarDay,
    ) {
        let Some(series) = self.series.get(series_id) else {
            return;
        };
        if through < series.start {
            return;
        }

        let taken: BTreeSet<CalendarDay> = series
            .appointment_ids
            .iter()
            .filter_map(|id| self.appointments.get(id))
            .map(|a| a.date)
            .collect();

        let created: Vec<Appointment> = expand(series, DayRange::new(series.start, through))
            .filter(|day| !taken.contains(day))
            .take(MAX_MATERIALIZED_OCCURRENCES)
            .map(|day| {
                let mut appointment = template.instantiate(new_id(), day);
                appointment.series_id = Some(series.id.clone());
                appointment.series_position = occurrence_position(series, day);
                appointment.recurrence_end_date = series.end;
                appointment
            })
            .collect();

        debug!(series_id, count = created.len(), %through, "materialized occurrences");

        for appointment in created {
            self.adopt(series_id, appointment);
        }
    }

    fn adopt(&mut self, series_id: &str, appointment: Appointment) {
        if let Some(series) = self.series.get_mut(series_id) {
            series.appointment_ids.insert(appointment.id.clone());
        }
        self.appointments.insert(appointment.id.clone(), appointment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn day(y: i32, m: u32, d: u32) -> CalendarDay {
        CalendarDay::from_ymd(y, m, d).unwrap()
    }

    fn make_test_template() -> AppointmentTemplate {
        AppointmentTemplate {
            time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            duration_minutes: 30,
            customer_id: "cust-42".to_string(),
            technician_id: Some("tech-7".to_string()),
            notes: None,
        }
    }

    #[test]
    fn test_create_closed_series_materializes_all() {
        let mut schedule = Schedule::new();
        let (series_id, diff) = schedule.create_series(
            &make_test_template(),
            Frequency::Weekly,
            day(2024, 1, 1),
            Some(day(2024, 1, 31)),
            365,
        );

        let owned = schedule.appointments_of(&series_id);
        assert_eq!(owned.len(), 5);
        assert_eq!(owned[4].date, day(2024, 1, 29));
        assert_eq!(owned[4].series_position, Some(4));
        assert!(owned.iter().all(|a| a.recurrence_end_date == Some(day(2024, 1, 31))));

        assert_eq!(diff.series.len(), 1);
        assert_eq!(diff.appointments.len(), 5);
        assert!(diff.appointments.iter().all(|d| d.kind == DiffKind::Create));
    }

    #[test]
    fn test_materialize_through_prefers_end_over_horizon() {
        let start = day(2024, 1, 1);
        assert_eq!(materialize_through(start, None, 365), day(2024, 12, 31));
        assert_eq!(
            materialize_through(start, Some(day(2024, 3, 1)), 365),
            day(2024, 3, 1)
        );
        assert_eq!(materialize_through(start, None, -5), start);
    }

    #[test]
    fn test_open_series_respects_horizon_and_cap() {
        let mut schedule = Schedule::new();
        let (weekly, _) = schedule.create_series(
            &make_test_template(),
            Frequency::Weekly,
            day(2024, 1, 1),
            None,
            28,
        );
        assert_eq!(schedule.appointments_of(&weekly).len(), 5);

        let (daily, _) = schedule.create_series(
            &make_test_template(),
            Frequency::Daily,
            day(2024, 1, 1),
            None,
            1000,
        );
        assert_eq!(
            schedule.appointments_of(&daily).len(),
            MAX_MATERIALIZED_OCCURRENCES
        );
    }

    #[test]
    fn test_materialize_extends_without_duplicates() {
        let mut schedule = Schedule::new();
        let (series_id, _) = schedule.create_series(
            &make_test_template(),
            Frequency::Weekly,
            day(2024, 1, 1),
            None,
            14,
        );
        assert_eq!(schedule.appointments_of(&series_id).len(), 3);

        let diff = schedule.materialize(&series_id, day(2024, 1, 29)).unwrap();
        assert_eq!(diff.appointments.len(), 2);
        assert_eq!(schedule.appointments_of(&series_id).len(), 5);

        let again = schedule.materialize(&series_id, day(2024, 1, 29)).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_materialize_unknown_series_is_not_found() {
        let mut schedule = Schedule::new();
        let err = schedule.materialize("missing", day(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, PoolDayError::NotFound(_)));
    }

    #[test]
    fn test_from_parts_rebuilds_ownership() {
        let mut source = Schedule::new();
        let (series_id, _) = source.create_series(
            &make_test_template(),
            Frequency::Daily,
            day(2024, 1, 1),
            Some(day(2024, 1, 3)),
            365,
        );
        let mut orphan = make_test_template().instantiate("orphan".into(), day(2024, 1, 9));
        orphan.series_id = Some("gone".to_string());

        let series: Vec<_> = source.all_series().cloned().collect();
        let mut appointments: Vec<_> = source.appointments().cloned().collect();
        appointments.push(orphan);

        let rebuilt = Schedule::from_parts(series, appointments);
        assert_eq!(rebuilt.appointments_of(&series_id).len(), 3);
        assert_eq!(rebuilt.appointment("orphan").unwrap().series_id, None);
    }
}
