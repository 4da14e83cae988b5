use std::{
    fmt::{Debug, Formatter},
    ops::Range,
};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::prelude::*;

pub const HOURS_PER_DAY: usize = 24;

pub const MONTH_ABBREVIATIONS: [&str; 12] =
    ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];

/// Calendar month abbreviation for a one-based month number.
pub fn month_abbreviation(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|index| MONTH_ABBREVIATIONS.get(index as usize))
        .copied()
        .unwrap_or("???")
}

/// Billing period: one calendar month.
#[must_use]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Period {
    pub year: i32,

    /// One-based calendar month.
    pub month: u32,

    pub n_days: u32,

    /// Midnight of the first day.
    pub start: NaiveDateTime,
}

impl Debug for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

impl Period {
    pub fn try_new(year: i32, month: u32) -> Result<Self> {
        let first_day = NaiveDate::from_ymd_opt(year, month, 1)
            .with_context(|| format!("invalid calendar month {year}-{month:02}"))?;
        let next_first_day = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .context("the calendar month is out of range")?;
        let n_days = u32::try_from((next_first_day - first_day).num_days())?;
        let start = first_day.and_hms_opt(0, 0, 0).context("invalid midnight")?;
        Ok(Self { year, month, n_days, start })
    }

    /// All twelve months of the year, in order.
    pub fn year(year: i32) -> Result<Vec<Self>> {
        (1..=12).map(|month| Self::try_new(year, month)).collect()
    }

    /// Start of the one-based day of the month.
    pub fn day_start(self, day: u32) -> NaiveDateTime {
        self.start + TimeDelta::days(i64::from(day) - 1)
    }

    pub const fn n_hours(self) -> usize {
        self.n_days as usize * HOURS_PER_DAY
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, clap::ValueEnum)]
pub enum Granularity {
    /// Every day is solved on its own.
    Daily,

    /// The whole month is solved at once.
    Monthly,
}

/// Contiguous sub-range of a [`Period`] handled by a single optimizer invocation.
///
/// The window does not own any data: consumers borrow the samples with
/// [`crate::core::series::TimeSeries::window`].
#[must_use]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Window {
    pub month: u32,

    /// One-based day of the month, [`None`] for a monthly window.
    pub day: Option<u32>,

    pub start: NaiveDateTime,

    /// Sample indices into the period-long series.
    pub range: Range<usize>,
}

impl Window {
    pub fn len(&self) -> usize {
        self.range.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_february_leap_year() {
        assert_eq!(Period::try_new(2020, 2).unwrap().n_days, 29);
        assert_eq!(Period::try_new(2019, 2).unwrap().n_days, 28);
    }

    #[test]
    fn test_december() {
        let period = Period::try_new(2019, 12).unwrap();
        assert_eq!(period.n_days, 31);
        assert_eq!(period.n_hours(), 744);
    }

    #[test]
    fn test_invalid_month() {
        assert!(Period::try_new(2019, 13).is_err());
    }

    #[test]
    fn test_month_abbreviation() {
        assert_eq!(month_abbreviation(1), "Jan");
        assert_eq!(month_abbreviation(12), "Dec");
        assert_eq!(month_abbreviation(0), "???");
    }
}
