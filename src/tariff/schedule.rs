use chrono::{Datelike, NaiveDateTime, TimeDelta, Timelike, Weekday};
use itertools::Itertools;

use crate::{
    core::{period::Period, series::TimeSeries},
    prelude::*,
};

/// Time-of-use period id, an index into the rate vector of its schedule.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TouPeriod(pub usize);

type YearSchedule = [[TouPeriod; 24]; 12];

/// Weekday and weekend hour → period assignment for every calendar month.
#[derive(Clone, Debug)]
pub struct WeekSchedules {
    weekday: YearSchedule,
    weekend: YearSchedule,
}

impl WeekSchedules {
    pub fn try_new(
        weekday: Vec<Vec<usize>>,
        weekend: Vec<Vec<usize>>,
        n_periods: usize,
    ) -> Result<Self> {
        Ok(Self {
            weekday: to_year_schedule(weekday, n_periods).context("invalid weekday schedule")?,
            weekend: to_year_schedule(weekend, n_periods).context("invalid weekend schedule")?,
        })
    }

    pub fn period_at(&self, timestamp: NaiveDateTime) -> TouPeriod {
        let schedule = match timestamp.weekday() {
            Weekday::Sat | Weekday::Sun => &self.weekend,
            _ => &self.weekday,
        };
        schedule[timestamp.month0() as usize][timestamp.hour() as usize]
    }

    /// Hourly period ids over the whole billing period.
    pub fn expand(&self, period: Period) -> TimeSeries<TouPeriod> {
        let values = (0..period.n_hours())
            .map(|hour| {
                #[expect(clippy::cast_possible_wrap)]
                let offset = TimeDelta::hours(hour as i64);
                self.period_at(period.start + offset)
            })
            .collect();
        TimeSeries::new(period.start, values)
    }
}

fn to_year_schedule(rows: Vec<Vec<usize>>, n_periods: usize) -> Result<YearSchedule> {
    let n_rows = rows.len();
    let rows: Vec<[TouPeriod; 24]> = rows
        .into_iter()
        .enumerate()
        .map(|(month0, row)| -> Result<[TouPeriod; 24]> {
            let n_hours = row.len();
            ensure!(n_hours == 24, "month #{} has {n_hours} hours instead of 24", month0 + 1);
            if let Some(id) = row.iter().find(|id| **id >= n_periods) {
                bail!(
                    "month #{} refers to period #{id}, but only {n_periods} are rated",
                    month0 + 1,
                );
            }
            row.into_iter()
                .map(TouPeriod)
                .collect_vec()
                .try_into()
                .map_err(|_| anyhow::anyhow!("month #{} does not have 24 hours", month0 + 1))
        })
        .try_collect()?;
    rows.try_into().map_err(|_| anyhow::anyhow!("expected 12 months, found {n_rows}"))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn schedules() -> WeekSchedules {
        let weekday =
            (0..12).map(|_| (0..24).map(|hour| usize::from(hour >= 12)).collect()).collect();
        let weekend = vec![vec![0; 24]; 12];
        WeekSchedules::try_new(weekday, weekend, 2).unwrap()
    }

    #[test]
    fn test_period_at() {
        let schedules = schedules();
        // 2019-02-01 is a Friday.
        let friday = NaiveDate::from_ymd_opt(2019, 2, 1).unwrap();
        let saturday = NaiveDate::from_ymd_opt(2019, 2, 2).unwrap();
        assert_eq!(schedules.period_at(friday.and_hms_opt(13, 0, 0).unwrap()), TouPeriod(1));
        assert_eq!(schedules.period_at(friday.and_hms_opt(11, 0, 0).unwrap()), TouPeriod(0));
        assert_eq!(schedules.period_at(saturday.and_hms_opt(13, 0, 0).unwrap()), TouPeriod(0));
    }

    #[test]
    fn test_expand() {
        let period = Period::try_new(2019, 2).unwrap();
        let periods = schedules().expand(period);
        assert_eq!(periods.len(), 28 * 24);
        assert_eq!(periods.start(), period.start);
        assert_eq!(periods.values()[12], TouPeriod(1));
        assert_eq!(periods.values()[24 + 12], TouPeriod(0));
    }

    #[test]
    fn test_wrong_shape() {
        assert!(WeekSchedules::try_new(vec![vec![0; 24]; 11], vec![vec![0; 24]; 12], 1).is_err());
        assert!(WeekSchedules::try_new(vec![vec![0; 23]; 12], vec![vec![0; 24]; 12], 1).is_err());
    }

    #[test]
    fn test_unrated_period() {
        assert!(WeekSchedules::try_new(vec![vec![1; 24]; 12], vec![vec![0; 24]; 12], 1).is_err());
    }
}
