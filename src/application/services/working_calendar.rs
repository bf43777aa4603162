//! Working calendar service module
//!
//! Pure calendar-day arithmetic parameterized by a weekend mask and a
//! holiday set. All dates are whole days in UTC. Day-walking is deliberate:
//! holiday density is unbounded, so closed-form arithmetic is not attempted.

use chrono::{Datelike, Days, NaiveDate};
use std::collections::HashSet;

use crate::domain::entities::InstallationSettings;

/// Calendar of working days for one installation
///
/// Weekday indexing follows days-from-Sunday: 0 = Sunday .. 6 = Saturday.
#[derive(Debug, Clone)]
pub struct WorkingCalendar {
    /// Weekday indices treated as weekend
    weekend_mask: HashSet<u32>,
    /// Exact holiday dates
    holidays: HashSet<NaiveDate>,
    /// Recurring holidays by (month, day), matched in any year
    recurring: HashSet<(u32, u32)>,
}

impl Default for WorkingCalendar {
    fn default() -> Self {
        Self {
            weekend_mask: HashSet::from([0, 6]),
            holidays: HashSet::new(),
            recurring: HashSet::new(),
        }
    }
}

impl WorkingCalendar {
    /// Builds a calendar from installation settings and holiday rows
    ///
    /// # Arguments
    ///
    /// * `settings` - Per-installation settings carrying the weekend mask
    /// * `holidays` - (date, recurring) pairs from the holiday store
    pub fn from_settings(settings: &InstallationSettings, holidays: &[(NaiveDate, bool)]) -> Self {
        let mut calendar = Self {
            weekend_mask: settings.weekend_days.iter().copied().collect(),
            holidays: HashSet::new(),
            recurring: HashSet::new(),
        };
        for (date, recurring) in holidays {
            calendar.add_holiday(*date, *recurring);
        }
        calendar
    }

    /// Adds a holiday; recurring holidays match their month/day every year
    pub fn add_holiday(&mut self, date: NaiveDate, recurring: bool) {
        if recurring {
            self.recurring.insert((date.month(), date.day()));
        } else {
            self.holidays.insert(date);
        }
    }

    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date) || self.recurring.contains(&(date.month(), date.day()))
    }

    /// True iff the weekday is not masked and the date is not a holiday
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !self.weekend_mask.contains(&date.weekday().num_days_from_sunday())
            && !self.is_holiday(date)
    }

    /// Smallest working day >= `date`
    pub fn next_working_day(&self, date: NaiveDate) -> NaiveDate {
        let mut day = date;
        while !self.is_working_day(day) {
            day = day + Days::new(1);
        }
        day
    }

    /// Walks forward `n` working days; `n = 0` returns `date` unchanged
    ///
    /// Each calendar-day step decrements the remainder only when it lands
    /// on a working day, so weekends and holidays are skipped without ever
    /// being counted.
    pub fn add_working_days(&self, date: NaiveDate, n: u32) -> NaiveDate {
        let mut day = date;
        let mut remaining = n;
        while remaining > 0 {
            day = day + Days::new(1);
            if self.is_working_day(day) {
                remaining -= 1;
            }
        }
        day
    }

    /// Count of working days strictly after min(a, b) and <= max(a, b)
    pub fn working_days_between(&self, a: NaiveDate, b: NaiveDate) -> u32 {
        let (from, to) = if a <= b { (a, b) } else { (b, a) };
        let mut count = 0;
        let mut day = from + Days::new(1);
        while day <= to {
            if self.is_working_day(day) {
                count += 1;
            }
            day = day + Days::new(1);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_weekend_mask() {
        let cal = WorkingCalendar::default();
        // 2024-01-06 is a Saturday, 2024-01-07 a Sunday
        assert!(!cal.is_working_day(date(2024, 1, 6)));
        assert!(!cal.is_working_day(date(2024, 1, 7)));
        assert!(cal.is_working_day(date(2024, 1, 8)));
    }

    #[test]
    fn test_holiday_is_not_working() {
        let mut cal = WorkingCalendar::default();
        cal.add_holiday(date(2024, 1, 15), false);
        assert!(!cal.is_working_day(date(2024, 1, 15)));
        assert!(cal.is_working_day(date(2025, 1, 15)));
    }

    #[test]
    fn test_recurring_holiday_matches_every_year() {
        let mut cal = WorkingCalendar::default();
        cal.add_holiday(date(2024, 12, 25), true);
        assert!(!cal.is_working_day(date(2024, 12, 25)));
        assert!(!cal.is_working_day(date(2026, 12, 25)));
    }

    #[test]
    fn test_next_working_day_snaps_over_weekend() {
        let cal = WorkingCalendar::default();
        assert_eq!(cal.next_working_day(date(2024, 1, 6)), date(2024, 1, 8));
        // Already a working day: unchanged
        assert_eq!(cal.next_working_day(date(2024, 1, 8)), date(2024, 1, 8));
    }

    #[test]
    fn test_add_zero_does_not_snap() {
        let cal = WorkingCalendar::default();
        // Saturday stays Saturday at n = 0
        assert_eq!(cal.add_working_days(date(2024, 1, 6), 0), date(2024, 1, 6));
    }

    #[test]
    fn test_add_working_days_linear_chain() {
        // Scenario: M estimate (10d) + Medium buffer (2d) from Mon 2024-01-01
        let cal = WorkingCalendar::default();
        assert_eq!(cal.add_working_days(date(2024, 1, 1), 12), date(2024, 1, 17));
    }

    #[test]
    fn test_add_working_days_skips_holiday() {
        let mut cal = WorkingCalendar::default();
        cal.add_holiday(date(2024, 1, 15), false);
        assert_eq!(cal.add_working_days(date(2024, 1, 1), 12), date(2024, 1, 18));
    }

    #[test]
    fn test_working_days_between() {
        let cal = WorkingCalendar::default();
        // Mon .. Fri of the same week: Tue, Wed, Thu, Fri
        assert_eq!(cal.working_days_between(date(2024, 1, 1), date(2024, 1, 5)), 4);
        // Swapped arguments give the same count
        assert_eq!(cal.working_days_between(date(2024, 1, 5), date(2024, 1, 1)), 4);
        assert_eq!(cal.working_days_between(date(2024, 1, 1), date(2024, 1, 1)), 0);
    }

    proptest! {
        #[test]
        fn prop_add_zero_is_identity(offset in 0i64..3650) {
            let cal = WorkingCalendar::default();
            let d = date(2024, 1, 1) + chrono::Duration::days(offset);
            prop_assert_eq!(cal.add_working_days(d, 0), d);
        }

        #[test]
        fn prop_add_is_associative(offset in 0i64..730, a in 0u32..40, b in 0u32..40) {
            let mut cal = WorkingCalendar::default();
            cal.add_holiday(date(2024, 7, 4), true);
            let d = date(2024, 1, 1) + chrono::Duration::days(offset);
            prop_assert_eq!(
                cal.add_working_days(cal.add_working_days(d, a), b),
                cal.add_working_days(d, a + b)
            );
        }

        #[test]
        fn prop_add_lands_on_working_day(offset in 0i64..730, n in 1u32..60) {
            let cal = WorkingCalendar::default();
            let d = date(2024, 1, 1) + chrono::Duration::days(offset);
            prop_assert!(cal.is_working_day(cal.add_working_days(d, n)));
        }

        #[test]
        fn prop_next_working_day_is_working(offset in 0i64..730) {
            let mut cal = WorkingCalendar::default();
            cal.add_holiday(date(2024, 1, 1), true);
            let d = date(2024, 1, 1) + chrono::Duration::days(offset);
            let next = cal.next_working_day(d);
            prop_assert!(next >= d);
            prop_assert!(cal.is_working_day(next));
        }
    }
}
