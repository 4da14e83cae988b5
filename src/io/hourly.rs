use std::{collections::BTreeMap, io::Read};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::de::DeserializeOwned;

use crate::{
    core::{period::Period, series::TimeSeries},
    prelude::*,
};

/// CSV row stamped with a calendar month, day and hour of the day.
pub trait HourlyRow {
    fn month(&self) -> u32;

    fn day(&self) -> u32;

    /// Hour of the day, `0..=23`.
    fn hour(&self) -> u32;
}

/// Hourly rows of one calendar year, keyed by their start time.
#[derive(Clone, Debug)]
pub struct HourlyTable<R> {
    rows: BTreeMap<NaiveDateTime, R>,
}

impl<R: HourlyRow + DeserializeOwned> HourlyTable<R> {
    pub fn from_reader(reader: impl Read, year: i32) -> Result<Self> {
        let mut rows = BTreeMap::new();
        for (index, row) in csv::Reader::from_reader(reader).deserialize::<R>().enumerate() {
            // Line 1 is the header:
            let line = index + 2;
            let row = row.with_context(|| format!("failed to parse line {line}"))?;
            let timestamp = Self::timestamp(year, &row)
                .with_context(|| format!("invalid time on line {line}"))?;
            if rows.insert(timestamp, row).is_some() {
                bail!("duplicate hour {timestamp} on line {line}");
            }
        }
        Ok(Self { rows })
    }

    fn timestamp(year: i32, row: &R) -> Result<NaiveDateTime> {
        let date = NaiveDate::from_ymd_opt(year, row.month(), row.day())
            .with_context(|| format!("no such date: {year}-{:02}-{:02}", row.month(), row.day()))?;
        let time = NaiveTime::from_hms_opt(row.hour(), 0, 0)
            .with_context(|| format!("hour {} is out of range", row.hour()))?;
        Ok(date.and_time(time))
    }
}

impl<R> HourlyTable<R> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Extract a month-long series, requiring every hour of the month to be present.
    pub fn month<T>(&self, period: Period, value: impl Fn(&R) -> T) -> Result<TimeSeries<T>> {
        let end = period.day_start(period.n_days + 1);
        let values: Vec<T> =
            self.rows.range(period.start..end).map(|(_, row)| value(row)).collect();
        ensure!(
            values.len() == period.n_hours(),
            "{:?} has {} hourly rows, expected {}",
            period,
            values.len(),
            period.n_hours(),
        );
        Ok(TimeSeries::new(period.start, values))
    }
}
