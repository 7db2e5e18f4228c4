// Month arithmetic for the report: where today sits in the current month,
// how many (business) days are left, and how many hours per day are still
// needed to hit a monthly target.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};

/// Computes `(normal_daily_minimum, crunch_daily_minimum)` from the days
/// remaining in the month.
pub trait PacingSource {
    fn minimum_daily_hours(&self, business_days_left: u32, days_left: u32) -> (f64, f64);
}

/// Pace towards a fixed number of hours per month.
///
/// The normal minimum spreads the remaining hours over every calendar day
/// left; the crunch minimum spreads them over the weekdays only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyTarget {
    pub target_hours: f64,
    pub tracked_hours: f64,
}

impl MonthlyTarget {
    pub fn remaining_hours(&self) -> f64 {
        (self.target_hours - self.tracked_hours).max(0.0)
    }
}

impl PacingSource for MonthlyTarget {
    fn minimum_daily_hours(&self, business_days_left: u32, days_left: u32) -> (f64, f64) {
        let remaining = self.remaining_hours();
        let per_day = |days: u32| if days == 0 { remaining } else { remaining / days as f64 };
        (per_day(days_left), per_day(business_days_left))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub today: NaiveDate,
    pub month_start: NaiveDate,
    pub month_end: NaiveDate,
}

impl MonthWindow {
    pub fn containing(today: NaiveDate) -> Self {
        let month_start = today.with_day(1).unwrap_or(today);
        let month_end = next_month_start(month_start) - Duration::days(1);
        MonthWindow {
            today,
            month_start,
            month_end,
        }
    }

    pub fn current() -> Self {
        Self::containing(chrono::Local::now().date_naive())
    }

    pub fn month_end_day(&self) -> u32 {
        self.month_end.day()
    }

    /// Calendar days from today through the last day, both included.
    pub fn days_left(&self) -> u32 {
        ((self.month_end - self.today).num_days() + 1).max(0) as u32
    }

    /// Monday to Friday days from today through the last day.
    pub fn business_days_left(&self) -> u32 {
        self.today
            .iter_days()
            .take_while(|d| *d <= self.month_end)
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .count() as u32
    }

    /// `[first of this month, first of next month)` at midnight.
    pub fn this_month_range(&self) -> (NaiveDateTime, NaiveDateTime) {
        (midnight(self.month_start), midnight(next_month_start(self.month_start)))
    }

    /// `[first of last month, first of this month)` at midnight.
    pub fn last_month_range(&self) -> (NaiveDateTime, NaiveDateTime) {
        let last_month_start = (self.month_start - Duration::days(1))
            .with_day(1)
            .unwrap_or(self.month_start);
        (midnight(last_month_start), midnight(self.month_start))
    }
}

fn next_month_start(month_start: NaiveDate) -> NaiveDate {
    let (year, month) = if month_start.month() == 12 {
        (month_start.year() + 1, 1)
    } else {
        (month_start.year(), month_start.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(month_start)
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}
