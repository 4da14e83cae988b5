//! CSV export of the reports.

use std::{fs::File, io::Write, path::Path};

use serde::Serialize;

use crate::{
    core::{
        aggregate::{BtmReport, Outcome, ValuationReport},
        bill::PeriodBillRecord,
    },
    prelude::*,
};

/// Monthly charges with both horizons, failed months left blank.
#[derive(Serialize)]
struct ChargesRow {
    month: u32,
    total_with_es_month: Option<f64>,
    total_without_es_month: Option<f64>,
    demand_charge_with_es_month: Option<f64>,
    demand_charge_without_es_month: Option<f64>,
    energy_charge_with_es_month: Option<f64>,
    energy_charge_without_es_month: Option<f64>,
    total_with_es_daily: Option<f64>,
    total_without_es_daily: Option<f64>,
    demand_charge_with_es_daily: Option<f64>,
    demand_charge_without_es_daily: Option<f64>,
    energy_charge_with_es_daily: Option<f64>,
    energy_charge_without_es_daily: Option<f64>,
}

struct Charges {
    total_with_es: Option<f64>,
    total_without_es: Option<f64>,
    demand_charge_with_es: Option<f64>,
    demand_charge_without_es: Option<f64>,
    energy_charge_with_es: Option<f64>,
    energy_charge_without_es: Option<f64>,
}

impl From<Option<&Outcome<PeriodBillRecord>>> for Charges {
    fn from(outcome: Option<&Outcome<PeriodBillRecord>>) -> Self {
        let record = outcome.and_then(|outcome| outcome.as_ref().ok());
        let with_storage = record.map(|record| record.with_storage);
        let without_storage = record.map(|record| record.without_storage);
        Self {
            total_with_es: with_storage.map(|bill| bill.total().0),
            total_without_es: without_storage.map(|bill| bill.total().0),
            demand_charge_with_es: with_storage.map(|bill| bill.demand.total().0),
            demand_charge_without_es: without_storage.map(|bill| bill.demand.total().0),
            energy_charge_with_es: with_storage.map(|bill| bill.energy.0),
            energy_charge_without_es: without_storage.map(|bill| bill.energy.0),
        }
    }
}

pub fn write_charges(path: &Path, report: &BtmReport) -> Result {
    let file =
        File::create(path).with_context(|| format!("failed to create `{}`", path.display()))?;
    write_charges_to(file, report)?;
    info!(path = %path.display(), "Exported the charges");
    Ok(())
}

fn write_charges_to(writer: impl Write, report: &BtmReport) -> Result {
    let mut writer = csv::Writer::from_writer(writer);
    let mut months: Vec<u32> = report.monthly.months().chain(report.daily.months()).collect();
    months.sort_unstable();
    months.dedup();
    for month in months {
        let monthly = Charges::from(report.monthly.get(month));
        let daily = Charges::from(report.daily.get(month));
        writer.serialize(ChargesRow {
            month,
            total_with_es_month: monthly.total_with_es,
            total_without_es_month: monthly.total_without_es,
            demand_charge_with_es_month: monthly.demand_charge_with_es,
            demand_charge_without_es_month: monthly.demand_charge_without_es,
            energy_charge_with_es_month: monthly.energy_charge_with_es,
            energy_charge_without_es_month: monthly.energy_charge_without_es,
            total_with_es_daily: daily.total_with_es,
            total_without_es_daily: daily.total_without_es,
            demand_charge_with_es_daily: daily.demand_charge_with_es,
            demand_charge_without_es_daily: daily.demand_charge_without_es,
            energy_charge_with_es_daily: daily.energy_charge_with_es,
            energy_charge_without_es_daily: daily.energy_charge_without_es,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Monthly revenue, one column per scenario.
pub fn write_revenues(path: &Path, report: &ValuationReport) -> Result {
    let file =
        File::create(path).with_context(|| format!("failed to create `{}`", path.display()))?;
    write_revenues_to(file, report)?;
    info!(path = %path.display(), "Exported the monthly revenues");
    Ok(())
}

fn write_revenues_to(writer: impl Write, report: &ValuationReport) -> Result {
    let mut writer = csv::Writer::from_writer(writer);
    let mut header = vec!["month".to_string()];
    header.extend(report.scenarios.keys().map(|scenario| scenario.slug()));
    writer.write_record(&header)?;
    for month in report.months() {
        let mut record = vec![month.to_string()];
        record.extend(report.scenarios.values().map(|series| match series.get(month) {
            Some(Ok(revenue)) => revenue.total().0.to_string(),
            Some(Err(_)) | None => String::new(),
        }));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct WindowRevenueRow {
    scenario: String,
    month: u32,
    day: Option<u32>,
    start: String,
    revenue: f64,
}

/// Revenue of every solved window.
pub fn write_window_revenues(path: &Path, report: &ValuationReport) -> Result {
    let file =
        File::create(path).with_context(|| format!("failed to create `{}`", path.display()))?;
    write_window_revenues_to(file, report)?;
    info!(path = %path.display(), "Exported the window revenues");
    Ok(())
}

fn write_window_revenues_to(writer: impl Write, report: &ValuationReport) -> Result {
    let mut writer = csv::Writer::from_writer(writer);
    for (scenario, series) in &report.scenarios {
        for (month, outcome) in series.iter() {
            let Ok(revenue) = outcome else { continue };
            for window in &revenue.windows {
                writer.serialize(WindowRevenueRow {
                    scenario: scenario.slug(),
                    month,
                    day: window.window.day,
                    start: window.window.start.format("%Y-%m-%dT%H:%M").to_string(),
                    revenue: window.revenue.0,
                })?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}
