//! Closed ranges of civil days.

use crate::time_window::CalendarDay;

/// Closed range `[start, end]` of civil days.
///
/// `end < start` is a caller bug, not a recoverable condition, so the
/// constructor panics on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DayRange {
    pub start: CalendarDay,
    pub end: CalendarDay,
}

impl DayRange {
    pub fn new(start: CalendarDay, end: CalendarDay) -> Self {
        assert!(
            start <= end,
            "DayRange end {} is before start {}",
            end,
            start
        );
        DayRange { start, end }
    }

    pub fn single(day: CalendarDay) -> Self {
        DayRange {
            start: day,
            end: day,
        }
    }

    /// Parse CLI arguments into a range.
    /// - `from`: YYYY-MM-DD, defaults to `today`
    /// - `to`: YYYY-MM-DD, defaults to `from`
    pub fn from_args(
        from: Option<&str>,
        to: Option<&str>,
        today: CalendarDay,
    ) -> Result<Self, String> {
        let start = match from {
            Some(s) => CalendarDay::parse(s)?,
            None => today,
        };

        let end = match to {
            Some(s) => CalendarDay::parse(s)?,
            None => start,
        };

        if end < start {
            return Err(format!("Range end {} is before start {}", end, start));
        }

        Ok(DayRange { start, end })
    }

    pub fn contains(&self, day: CalendarDay) -> bool {
        self.start <= day && day <= self.end
    }

    /// Number of days in the range, counting both ends.
    pub fn len_days(&self) -> i64 {
        self.start.days_until(self.end) + 1
    }

    /// Every day of the range in order.
    pub fn days(&self) -> impl Iterator<Item = CalendarDay> + use<> {
        let start = self.start;
        (0..self.len_days()).map(move |offset| start.add_days(offset))
    }

    /// Overlap of two ranges, if any.
    pub fn intersect(&self, other: &DayRange) -> Option<DayRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(DayRange { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> CalendarDay {
        CalendarDay::from_ymd(y, m, d).unwrap()
    }

    #[test]
    #[should_panic(expected = "is before start")]
    fn test_reversed_range_panics() {
        DayRange::new(day(2024, 2, 1), day(2024, 1, 1));
    }

    #[test]
    fn test_days_are_inclusive() {
        let range = DayRange::new(day(2024, 2, 27), day(2024, 3, 1));
        let days: Vec<_> = range.days().collect();
        assert_eq!(
            days,
            vec![
                day(2024, 2, 27),
                day(2024, 2, 28),
                day(2024, 2, 29),
                day(2024, 3, 1)
            ]
        );
        assert_eq!(range.len_days(), 4);
    }

    #[test]
    fn test_from_args_defaults() {
        let today = day(2024, 6, 1);
        let range = DayRange::from_args(None, None, today).unwrap();
        assert_eq!(range, DayRange::single(today));

        let range = DayRange::from_args(Some("2024-06-03"), Some("2024-06-09"), today).unwrap();
        assert_eq!(range.len_days(), 7);

        assert!(DayRange::from_args(Some("2024-06-09"), Some("2024-06-03"), today).is_err());
        assert!(DayRange::from_args(Some("June 3"), None, today).is_err());
    }

    #[test]
    fn test_intersect() {
        let a = DayRange::new(day(2024, 1, 1), day(2024, 1, 10));
        let b = DayRange::new(day(2024, 1, 5), day(2024, 1, 20));
        assert_eq!(
            a.intersect(&b),
            Some(DayRange::new(day(2024, 1, 5), day(2024, 1, 10)))
        );

        let c = DayRange::new(day(2024, 2, 1), day(2024, 2, 2));
        assert_eq!(a.intersect(&c), None);
    }
}
