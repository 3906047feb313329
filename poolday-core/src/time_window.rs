//! Fixed-offset civil days and calendar view windows.
//!
//! All timezone policy lives here. The service area sits on one UTC offset
//! with no daylight-saving transitions, so a day is fully determined by an
//! instant plus that offset. Everything else in the crate works on
//! `CalendarDay` values and never sees a raw instant.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, Offset, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::date_range::DayRange;
use crate::error::{PoolDayError, PoolDayResult};

/// A (year, month, day) triple in the service's civil timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalendarDay(NaiveDate);

impl CalendarDay {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(CalendarDay)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        CalendarDay(date)
    }

    /// Parse `YYYY-MM-DD`.
    pub fn parse(s: &str) -> Result<Self, String> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(CalendarDay)
            .map_err(|_| format!("Invalid date format '{}'. Expected YYYY-MM-DD", s))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn weekday(&self) -> Weekday {
        self.0.weekday()
    }

    pub fn add_days(&self, days: i64) -> Self {
        CalendarDay(self.0 + Duration::days(days))
    }

    pub fn succ(&self) -> Self {
        self.add_days(1)
    }

    pub fn pred(&self) -> Self {
        self.add_days(-1)
    }

    /// Add calendar months, clamping the day-of-month to the target month's
    /// last day (Jan 31 + 1 month is Feb 28 or 29).
    pub fn add_months(&self, months: u32) -> Option<Self> {
        self.0.checked_add_months(Months::new(months)).map(CalendarDay)
    }

    pub fn sub_months(&self, months: u32) -> Option<Self> {
        self.0.checked_sub_months(Months::new(months)).map(CalendarDay)
    }

    /// Signed number of days from `self` to `other`.
    pub fn days_until(&self, other: CalendarDay) -> i64 {
        (other.0 - self.0).num_days()
    }

    pub fn first_of_month(&self) -> Self {
        CalendarDay(self.0 - Duration::days(i64::from(self.0.day0())))
    }

    pub fn last_of_month(&self) -> Self {
        let first = self.first_of_month();
        match first.add_months(1) {
            Some(next_first) => next_first.pred(),
            // Only reachable in the last representable month
            None => CalendarDay(NaiveDate::MAX),
        }
    }

    /// Sunday on or before this day.
    pub fn week_start(&self) -> Self {
        self.add_days(-i64::from(self.0.weekday().num_days_from_sunday()))
    }

    /// Saturday on or after this day.
    pub fn week_end(&self) -> Self {
        self.week_start().add_days(6)
    }
}

impl fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for CalendarDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CalendarDay::parse(s)
    }
}

/// Maps instants to civil days at one fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    offset: FixedOffset,
}

impl Default for TimeWindow {
    fn default() -> Self {
        TimeWindow::utc()
    }
}

impl TimeWindow {
    pub fn utc() -> Self {
        TimeWindow {
            offset: Utc.fix(),
        }
    }

    /// Offsets must be strictly within ±24h.
    pub fn from_offset_minutes(utc_offset_minutes: i32) -> PoolDayResult<Self> {
        utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(|offset| TimeWindow { offset })
            .ok_or_else(|| {
                PoolDayError::Config(format!(
                    "UTC offset of {} minutes is out of range",
                    utc_offset_minutes
                ))
            })
    }

    pub fn offset_minutes(&self) -> i32 {
        self.offset.local_minus_utc() / 60
    }

    /// The civil day `instant` falls on.
    pub fn day_identity(&self, instant: DateTime<Utc>) -> CalendarDay {
        CalendarDay(instant.with_timezone(&self.offset).date_naive())
    }

    pub fn same_day(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        self.day_identity(a) == self.day_identity(b)
    }

    /// Today as seen at `now`. The clock is always passed in.
    pub fn today(&self, now: DateTime<Utc>) -> CalendarDay {
        self.day_identity(now)
    }
}

/// Calendar view granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Month,
    Week,
    Day,
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewKind::Month => write!(f, "month"),
            ViewKind::Week => write!(f, "week"),
            ViewKind::Day => write!(f, "day"),
        }
    }
}

impl FromStr for ViewKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "month" => Ok(ViewKind::Month),
            "week" => Ok(ViewKind::Week),
            "day" => Ok(ViewKind::Day),
            other => Err(format!(
                "Unknown view '{}'. Expected month, week or day",
                other
            )),
        }
    }
}

/// Closed day range shown by a view anchored on `anchor`. Weeks start on Sunday.
///
/// - `Month`: Sunday on/before the 1st through Saturday on/after the last day
/// - `Week`: Sunday on/before `anchor` through the following Saturday
/// - `Day`: just `anchor`
pub fn range_for(kind: ViewKind, anchor: CalendarDay) -> DayRange {
    match kind {
        ViewKind::Month => DayRange::new(
            anchor.first_of_month().week_start(),
            anchor.last_of_month().week_end(),
        ),
        ViewKind::Week => DayRange::new(anchor.week_start(), anchor.week_end()),
        ViewKind::Day => DayRange::new(anchor, anchor),
    }
}

/// A calendar view: kind plus anchor day. Recomputed on navigation, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarViewWindow {
    pub kind: ViewKind,
    pub anchor: CalendarDay,
}

impl CalendarViewWindow {
    pub fn new(kind: ViewKind, anchor: CalendarDay) -> Self {
        CalendarViewWindow { kind, anchor }
    }

    pub fn range(&self) -> DayRange {
        range_for(self.kind, self.anchor)
    }

    pub fn next(&self) -> Self {
        self.shifted(1)
    }

    pub fn prev(&self) -> Self {
        self.shifted(-1)
    }

    fn shifted(&self, steps: i64) -> Self {
        let anchor = match self.kind {
            ViewKind::Day => self.anchor.add_days(steps),
            ViewKind::Week => self.anchor.add_days(steps * 7),
            ViewKind::Month => {
                let months = steps.unsigned_abs() as u32;
                let moved = if steps >= 0 {
                    self.anchor.add_months(months)
                } else {
                    self.anchor.sub_months(months)
                };
                moved.unwrap_or(self.anchor)
            }
        };
        CalendarViewWindow {
            kind: self.kind,
            anchor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> CalendarDay {
        CalendarDay::from_ymd(y, m, d).unwrap()
    }

    #[test]
    fn test_day_identity_uses_configured_offset() {
        let phoenix = TimeWindow::from_offset_minutes(-420).unwrap();
        let instant = Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap();

        assert_eq!(phoenix.day_identity(instant), day(2023, 12, 31));
        assert_eq!(TimeWindow::utc().day_identity(instant), day(2024, 1, 1));
    }

    #[test]
    fn test_same_day_across_utc_midnight() {
        let window = TimeWindow::from_offset_minutes(-420).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 3, 10, 1, 30, 0).unwrap();
        let afternoon = Utc.with_ymd_and_hms(2024, 3, 9, 20, 0, 0).unwrap();

        assert!(window.same_day(evening, afternoon));
        assert!(!TimeWindow::utc().same_day(evening, afternoon));
    }

    #[test]
    fn test_offset_out_of_range_is_config_error() {
        assert!(TimeWindow::from_offset_minutes(24 * 60).is_err());
        assert!(TimeWindow::from_offset_minutes(i32::MAX).is_err());
        assert_eq!(
            TimeWindow::from_offset_minutes(330).unwrap().offset_minutes(),
            330
        );
    }

    #[test]
    fn test_week_range_starts_sunday() {
        let range = range_for(ViewKind::Week, day(2024, 1, 3));
        assert_eq!(range.start, day(2023, 12, 31));
        assert_eq!(range.end, day(2024, 1, 6));

        // A Sunday anchors its own week
        let range = range_for(ViewKind::Week, day(2024, 1, 7));
        assert_eq!(range.start, day(2024, 1, 7));
        assert_eq!(range.end, day(2024, 1, 13));
    }

    #[test]
    fn test_month_range_pads_to_whole_weeks() {
        let range = range_for(ViewKind::Month, day(2024, 2, 14));
        assert_eq!(range.start, day(2024, 1, 28));
        assert_eq!(range.end, day(2024, 3, 2));
        assert_eq!(range.start.weekday(), Weekday::Sun);
        assert_eq!(range.end.weekday(), Weekday::Sat);
    }

    #[test]
    fn test_month_range_when_first_is_sunday() {
        let range = range_for(ViewKind::Month, day(2024, 9, 30));
        assert_eq!(range.start, day(2024, 9, 1));
        assert_eq!(range.end, day(2024, 10, 5));
    }

    #[test]
    fn test_day_range_is_anchor() {
        let range = range_for(ViewKind::Day, day(2024, 5, 5));
        assert_eq!(range.start, range.end);
        assert_eq!(range.start, day(2024, 5, 5));
    }

    #[test]
    fn test_month_navigation_clamps_anchor() {
        let view = CalendarViewWindow::new(ViewKind::Month, day(2024, 1, 31));
        assert_eq!(view.next().anchor, day(2024, 2, 29));
        assert_eq!(view.prev().anchor, day(2023, 12, 31));

        let week = CalendarViewWindow::new(ViewKind::Week, day(2024, 1, 3));
        assert_eq!(week.next().range().start, day(2024, 1, 7));
    }

    #[test]
    fn test_calendar_day_serializes_as_iso_date() {
        let json = serde_json::to_string(&day(2024, 7, 4)).unwrap();
        assert_eq!(json, "\"2024-07-04\"");
        assert_eq!("2024-07-04".parse::<CalendarDay>().unwrap(), day(2024, 7, 4));
        assert!("07/04/2024".parse::<CalendarDay>().is_err());
    }
}
