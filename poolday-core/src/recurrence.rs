//! Recurring series expansion.
//!
//! Expands a series definition into the civil days it occurs on within a
//! bounded range. The n-th occurrence is always computed from the anchor
//! (`start + n * step`, or `start + n months`), never by stepping from the
//! previous occurrence, so month-end clamping cannot drift and the output for
//! a given series and range is the same on every call.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::date_range::DayRange;
use crate::time_window::CalendarDay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

impl Frequency {
    fn step_days(&self) -> Option<i64> {
        match self {
            Frequency::Daily => Some(1),
            Frequency::Weekly => Some(7),
            Frequency::Biweekly => Some(14),
            Frequency::Monthly => None,
        }
    }

    /// The `n`-th occurrence counted from `anchor` (n = 0 is the anchor).
    pub fn nth(&self, anchor: CalendarDay, n: u32) -> Option<CalendarDay> {
        match self.step_days() {
            Some(step) => Some(anchor.add_days(step * i64::from(n))),
            None => anchor.add_months(n),
        }
    }

    /// Smallest index whose occurrence falls on or after `day`.
    fn first_index_on_or_after(&self, anchor: CalendarDay, day: CalendarDay) -> u32 {
        if day <= anchor {
            return 0;
        }

        match self.step_days() {
            Some(step) => {
                let delta = anchor.days_until(day);
                u32::try_from((delta + step - 1) / step).unwrap_or(u32::MAX)
            }
            None => {
                let months = months_between(anchor, day);
                match self.nth(anchor, months) {
                    Some(candidate) if candidate >= day => months,
                    _ => months.saturating_add(1),
                }
            }
        }
    }
}

/// Whole calendar months from `from`'s month to `to`'s month (0 if `to` is earlier).
pub(crate) fn months_between(from: CalendarDay, to: CalendarDay) -> u32 {
    let months =
        (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    u32::try_from(months).unwrap_or(0)
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Biweekly => write!(f, "biweekly"),
            Frequency::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "biweekly" => Ok(Frequency::Biweekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(format!(
                "Unknown frequency '{}'. Expected daily, weekly, biweekly or monthly",
                other
            )),
        }
    }
}

/// A repeating appointment definition and the appointments it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceSeries {
    pub id: String,
    pub frequency: Frequency,
    pub start: CalendarDay,
    /// Last day an occurrence may fall on; open-ended when `None`
    pub end: Option<CalendarDay>,
    /// Generated days that were removed from the series (EXDATE)
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub exceptions: BTreeSet<CalendarDay>,
    /// Ids of materialized appointments owned by this series
    #[serde(default)]
    pub appointment_ids: BTreeSet<String>,
}

impl RecurrenceSeries {
    pub fn new(
        id: impl Into<String>,
        frequency: Frequency,
        start: CalendarDay,
        end: Option<CalendarDay>,
    ) -> Self {
        if let Some(end) = end {
            assert!(end >= start, "series end {} is before start {}", end, start);
        }

        RecurrenceSeries {
            id: id.into(),
            frequency,
            start,
            end,
            exceptions: BTreeSet::new(),
            appointment_ids: BTreeSet::new(),
        }
    }

    pub fn is_open_ended(&self) -> bool {
        self.end.is_none()
    }

    /// Compare what the series generates, ignoring which appointments it owns.
    pub fn same_definition(&self, other: &RecurrenceSeries) -> bool {
        self.id == other.id
            && self.frequency == other.frequency
            && self.start == other.start
            && self.end == other.end
            && self.exceptions == other.exceptions
    }
}

/// Lazy, restartable sequence of occurrence days. Clone it to restart.
#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    frequency: Frequency,
    anchor: CalendarDay,
    exceptions: &'a BTreeSet<CalendarDay>,
    index: u32,
    stop: CalendarDay,
}

impl Iterator for Occurrences<'_> {
    type Item = CalendarDay;

    fn next(&mut self) -> Option<CalendarDay> {
        loop {
            let day = self.frequency.nth(self.anchor, self.index)?;
            if day > self.stop {
                return None;
            }
            self.index = self.index.checked_add(1)?;
            if !self.exceptions.contains(&day) {
                return Some(day);
            }
        }
    }
}

/// Occurrence days of `series` that fall within `range`, in increasing order.
///
/// Bounded by `range` even when the series is open-ended.
pub fn expand(series: &RecurrenceSeries, range: DayRange) -> Occurrences<'_> {
    let stop = match series.end {
        Some(end) => end.min(range.end),
        None => range.end,
    };
    let from = series.start.max(range.start);

    Occurrences {
        frequency: series.frequency,
        anchor: series.start,
        exceptions: &series.exceptions,
        index: series.frequency.first_index_on_or_after(series.start, from),
        stop,
    }
}

/// Ordinal of `day` within `series`, or `None` if the series does not occur on it.
pub fn occurrence_position(series: &RecurrenceSeries, day: CalendarDay) -> Option<u32> {
    if day < series.start || series.end.is_some_and(|end| day > end) {
        return None;
    }
    if series.exceptions.contains(&day) {
        return None;
    }

    let index = series.frequency.first_index_on_or_after(series.start, day);
    (series.frequency.nth(series.start, index)? == day).then_some(index)
}

pub fn is_occurrence(series: &RecurrenceSeries, day: CalendarDay) -> bool {
    occurrence_position(series, day).is_some()
}
