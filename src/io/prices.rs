use std::{fs::File, path::Path};

use serde::Deserialize;

use crate::{
    core::{harness::MarketPeriod, period::Period},
    io::hourly::{HourlyRow, HourlyTable},
    prelude::*,
    quantity::rate::KilowattHourRate,
};

/// Market prices in $/MWh.
#[derive(Deserialize)]
pub struct PriceRow {
    month: u32,
    day: u32,
    hour: u32,
    lmp: f64,
    reg_up: f64,
    reg_down: f64,
}

impl HourlyRow for PriceRow {
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

/// Hourly energy and regulation prices of a year.
pub struct MarketPrices(HourlyTable<PriceRow>);

impl MarketPrices {
    #[instrument(skip_all, name = "Reading the market prices…", fields(path = %path.display()))]
    pub fn read(path: &Path, year: i32) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
        let table = HourlyTable::from_reader(file, year)
            .with_context(|| format!("failed to read `{}`", path.display()))?;
        ensure!(!table.is_empty(), "`{}` has no rows", path.display());
        info!(n_hours = table.len(), "Loaded");
        Ok(Self(table))
    }

    pub fn month(&self, period: Period) -> Result<MarketPeriod> {
        Ok(MarketPeriod {
            period,
            energy_price: self
                .0
                .month(period, |row| KilowattHourRate::from_megawatt_hour_price(row.lmp))?,
            regulation_up_price: self
                .0
                .month(period, |row| KilowattHourRate::from_megawatt_hour_price(row.reg_up))?,
            regulation_down_price: self
                .0
                .month(period, |row| KilowattHourRate::from_megawatt_hour_price(row.reg_down))?,
        })
    }
}
