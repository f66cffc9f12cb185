use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, CoreResult};

/// Hard cap on schedule expansion, shared by recurring bills and date math.
pub const MAX_OCCURRENCES: usize = 1024;

/// A calendar month used as the payroll and reporting granule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Period {
    pub month: u32,
    pub year: i32,
}

impl Period {
    pub fn new(month: u32, year: i32) -> CoreResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::validation(format!("invalid month: {month}")));
        }
        Ok(Self { month, year })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            month: date.month(),
            year: date.year(),
        }
    }

    pub fn start(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("valid period")
    }

    pub fn end(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, days_in_month(self.year, self.month))
            .expect("valid period")
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}

/// Recurrence cadence for bill templates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// The `index`-th occurrence counted from `anchor` (index 0 is the anchor
    /// itself). Month-based cadences are re-anchored on the anchor's
    /// day-of-month every step, clamped to short months, so a series started
    /// on the 31st lands on Feb 28 and returns to Mar 31 instead of drifting.
    pub fn occurrence(&self, anchor: NaiveDate, index: u32) -> NaiveDate {
        match self {
            Frequency::Weekly => anchor + Duration::days(7 * index as i64),
            Frequency::Biweekly => anchor + Duration::days(14 * index as i64),
            Frequency::Monthly => add_months_clamped(anchor, index as i32),
            Frequency::Yearly => add_months_clamped(anchor, 12 * index as i32),
        }
    }

    /// Every occurrence in `[anchor, end]`, bounded by [`MAX_OCCURRENCES`].
    pub fn occurrences_between(&self, anchor: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        for index in 0..MAX_OCCURRENCES as u32 {
            let date = self.occurrence(anchor, index);
            if date > end {
                break;
            }
            dates.push(date);
        }
        dates
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Frequency::Weekly => "Weekly",
            Frequency::Biweekly => "Biweekly",
            Frequency::Monthly => "Monthly",
            Frequency::Yearly => "Yearly",
        };
        f.write_str(label)
    }
}

/// Shifts `date` by whole months, keeping the anchor day clamped to the last
/// valid day of the target month.
pub fn add_months_clamped(date: NaiveDate, months: i32) -> NaiveDate {
    let mut year = date.year();
    let mut month = date.month() as i32 + months;
    while month > 12 {
        month -= 12;
        year += 1;
    }
    while month < 1 {
        month += 12;
        year -= 1;
    }
    let day = date.day().min(days_in_month(year, month as u32));
    NaiveDate::from_ymd_opt(year, month as u32, day).expect("clamped day is valid")
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };
    let first_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 28).expect("fallback date"));
    (first_next - Duration::days(1)).day()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn monthly_series_clamps_and_recovers_day_of_month() {
        let anchor = date(2024, 1, 31);
        assert_eq!(Frequency::Monthly.occurrence(anchor, 1), date(2024, 2, 29));
        assert_eq!(Frequency::Monthly.occurrence(anchor, 2), date(2024, 3, 31));
        assert_eq!(Frequency::Monthly.occurrence(anchor, 3), date(2024, 4, 30));
    }

    #[test]
    fn occurrences_between_is_inclusive() {
        let anchor = date(2024, 1, 10);
        let dates = Frequency::Monthly.occurrences_between(anchor, date(2024, 3, 10));
        assert_eq!(
            dates,
            vec![date(2024, 1, 10), date(2024, 2, 10), date(2024, 3, 10)]
        );
    }

    #[test]
    fn period_bounds_cover_leap_february() {
        let period = Period::new(2, 2024).unwrap();
        assert_eq!(period.start(), date(2024, 2, 1));
        assert_eq!(period.end(), date(2024, 2, 29));
        assert!(period.contains(date(2024, 2, 15)));
        assert!(!period.contains(date(2024, 3, 1)));
    }

    #[test]
    fn period_rejects_invalid_month() {
        assert!(Period::new(13, 2024).is_err());
    }
}
