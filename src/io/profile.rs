use std::{fs::File, path::Path};

use serde::Deserialize;

use crate::{
    core::{period::Period, series::TimeSeries},
    io::hourly::{HourlyRow, HourlyTable},
    prelude::*,
    quantity::power::Kilowatts,
};

#[derive(Deserialize)]
pub struct ProfileRow {
    month: u32,
    day: u32,
    hour: u32,

    #[serde(rename = "kw")]
    power: Kilowatts,
}

impl HourlyRow for ProfileRow {
    fn month(&self) -> u32 {
        self.month
    }

    fn day(&self) -> u32 {
        self.day
    }

    fn hour(&self) -> u32 {
        self.hour
    }
}

/// Hourly load or PV profile of a year.
pub struct HourlyProfile(HourlyTable<ProfileRow>);

impl HourlyProfile {
    #[instrument(skip_all, name = "Reading the profile…", fields(path = %path.display()))]
    pub fn read(path: &Path, year: i32) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
        let table = HourlyTable::from_reader(file, year)
            .with_context(|| format!("failed to read `{}`", path.display()))?;
        ensure!(!table.is_empty(), "`{}` has no rows", path.display());
        info!(n_hours = table.len(), "Loaded");
        Ok(Self(table))
    }

    pub fn month(&self, period: Period) -> Result<TimeSeries<Kilowatts>> {
        self.0.month(period, |row| row.power)
    }
}
