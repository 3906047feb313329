//! Day buckets for calendar views.

use std::collections::BTreeMap;

use crate::appointment::Appointment;
use crate::date_range::DayRange;
use crate::time_window::{CalendarDay, CalendarViewWindow};

/// Appointments of one view window, grouped by day.
///
/// A pure projection: build a new index whenever the appointments or the
/// window change.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarIndex {
    range: DayRange,
    days: BTreeMap<CalendarDay, Vec<Appointment>>,
}

impl CalendarIndex {
    /// Bucket the appointments that fall inside `window`, each day ordered by
    /// time of day and then id.
    pub fn build<'a>(
        appointments: impl IntoIterator<Item = &'a Appointment>,
        window: &CalendarViewWindow,
    ) -> Self {
        Self::for_range(appointments, window.range())
    }

    pub fn for_range<'a>(
        appointments: impl IntoIterator<Item = &'a Appointment>,
        range: DayRange,
    ) -> Self {
        let mut days: BTreeMap<CalendarDay, Vec<Appointment>> = BTreeMap::new();

        for appointment in appointments {
            if range.contains(appointment.date) {
                days.entry(appointment.date)
                    .or_default()
                    .push(appointment.clone());
            }
        }

        for bucket in days.values_mut() {
            bucket.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.id.cmp(&b.id)));
        }

        CalendarIndex { range, days }
    }

    pub fn range(&self) -> DayRange {
        self.range
    }

    /// Appointments on `day`; empty for days without any.
    pub fn day(&self, day: CalendarDay) -> &[Appointment] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Days that have at least one appointment.
    pub fn iter(&self) -> impl Iterator<Item = (CalendarDay, &[Appointment])> {
        self.days.iter().map(|(day, appts)| (*day, appts.as_slice()))
    }

    /// Every day of the window, including empty ones, for grid layouts.
    pub fn grid(&self) -> impl Iterator<Item = (CalendarDay, &[Appointment])> {
        self.range.days().map(|day| (day, self.day(day)))
    }

    pub fn len(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}
