use std::path::PathBuf;

use clap::Parser;
use rayon::prelude::*;

use crate::{
    cli::{calendar::CalendarArgs, storage::StorageArgs, workers::WorkerArgs},
    core::{
        aggregate::{BtmReport, MonthlySeries},
        btm::{MonthComparison, compare_horizons},
        runner::{BillingPeriod, PvProfile},
    },
    io::{export::write_charges, profile::HourlyProfile, read_rate_structure},
    prelude::*,
    solver::DpBillModel,
    tables::build_btm_table,
};

#[must_use]
#[derive(Parser)]
pub struct BtmArgs {
    /// Rate structure JSON.
    #[clap(long = "rate-structure", env = "RATE_STRUCTURE")]
    pub rate_structure: PathBuf,

    /// Hourly load profile CSV with `month,day,hour,kw` columns.
    #[clap(long = "load-profile", env = "LOAD_PROFILE")]
    pub load_profile: PathBuf,

    /// Hourly PV production profile CSV, no PV when omitted.
    #[clap(long = "pv-profile", env = "PV_PROFILE")]
    pub pv_profile: Option<PathBuf>,

    /// Where to export the monthly charges.
    #[clap(long = "charges-csv", default_value = "charges.csv", env = "CHARGES_CSV")]
    pub charges_csv: PathBuf,

    #[clap(flatten)]
    pub calendar: CalendarArgs,

    #[clap(flatten)]
    pub storage: StorageArgs,

    #[clap(flatten)]
    pub workers: WorkerArgs,
}

impl BtmArgs {
    #[instrument(skip_all, name = "Valuing behind the meter…", fields(year = self.calendar.year))]
    pub fn run(&self) -> Result {
        self.workers.init_pool()?;
        let rates = read_rate_structure(&self.rate_structure)?;
        let load = HourlyProfile::read(&self.load_profile, self.calendar.year)?;
        let pv = self
            .pv_profile
            .as_deref()
            .map(|path| HourlyProfile::read(path, self.calendar.year))
            .transpose()?;
        let model = DpBillModel::new(&self.storage.storage()?);

        let comparisons: Vec<(u32, MonthComparison)> = self
            .calendar
            .periods()?
            .into_par_iter()
            .map(|period| -> Result<(u32, MonthComparison)> {
                let pv = match &pv {
                    Some(pv) => PvProfile::Present(pv.month(period)?),
                    None => PvProfile::Absent,
                };
                let inputs = BillingPeriod::try_new(period, &rates, load.month(period)?, pv)?;
                Ok((period.month, compare_horizons(&model, &inputs)?))
            })
            .collect::<Result<_>>()?;

        let (monthly, daily): (Vec<_>, Vec<_>) = comparisons
            .into_iter()
            .map(|(month, comparison)| ((month, comparison.direct), (month, comparison.decomposed)))
            .unzip();
        let report = BtmReport {
            monthly: MonthlySeries::try_from_iter(monthly)?,
            daily: MonthlySeries::try_from_iter(daily)?,
        };
        if report.monthly.n_failures() + report.daily.n_failures() != 0 {
            warn!(
                n_monthly = report.monthly.n_failures(),
                n_daily = report.daily.n_failures(),
                "Some months failed",
            );
        }

        println!("{}", build_btm_table(&report));
        write_charges(&self.charges_csv, &report)
    }
}
