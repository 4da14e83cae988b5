use std::path::PathBuf;

use clap::Parser;
use rayon::prelude::*;

use crate::{
    cli::{calendar::CalendarArgs, storage::StorageArgs, workers::WorkerArgs},
    core::{
        aggregate::{Outcome, ValuationReport},
        harness::{ForecastSimulationHarness, MonthRevenue, Scenario},
    },
    io::{
        export::{write_revenues, write_window_revenues},
        prices::MarketPrices,
    },
    prelude::*,
    solver::DpArbitrageModel,
    tables::build_valuation_table,
};

#[must_use]
#[derive(Parser)]
pub struct ValuationArgs {
    /// Hourly market prices CSV with `month,day,hour,lmp,reg_up,reg_down` columns in $/MWh.
    #[clap(long = "prices", env = "PRICES")]
    pub prices: PathBuf,

    /// Where to export the monthly revenue of every scenario.
    #[clap(long = "revenue-csv", default_value = "revenue.csv", env = "REVENUE_CSV")]
    pub revenue_csv: PathBuf,

    /// Also export the revenue of every solved window.
    #[clap(long = "windows-csv", env = "WINDOWS_CSV")]
    pub windows_csv: Option<PathBuf>,

    #[clap(flatten)]
    pub calendar: CalendarArgs,

    #[clap(flatten)]
    pub storage: StorageArgs,

    #[clap(flatten)]
    pub workers: WorkerArgs,
}

impl ValuationArgs {
    #[instrument(
        skip_all,
        name = "Valuing market participation…",
        fields(year = self.calendar.year),
    )]
    pub fn run(&self) -> Result {
        self.workers.init_pool()?;
        let prices = MarketPrices::read(&self.prices, self.calendar.year)?;
        let model = DpArbitrageModel::new(&self.storage.storage()?);
        let harness = ForecastSimulationHarness::new(&model);

        let outcomes: Vec<Vec<(Scenario, u32, Outcome<MonthRevenue>)>> = self
            .calendar
            .periods()?
            .into_par_iter()
            .map(|period| -> Result<Vec<(Scenario, u32, Outcome<MonthRevenue>)>> {
                let actual = prices.month(period)?;
                Scenario::ALL
                    .into_iter()
                    .map(|scenario| -> Result<_> {
                        Ok((scenario, period.month, harness.run(scenario, &actual)?))
                    })
                    .collect()
            })
            .collect::<Result<_>>()?;

        let mut report = ValuationReport::default();
        for (scenario, month, outcome) in outcomes.into_iter().flatten() {
            report.scenarios.entry(scenario).or_default().insert(month, outcome)?;
        }
        for (scenario, series) in &report.scenarios {
            if series.n_failures() != 0 {
                warn!(%scenario, n_failures = series.n_failures(), "Some months failed");
            }
        }

        println!("{}", build_valuation_table(&report));
        write_revenues(&self.revenue_csv, &report)?;
        if let Some(path) = &self.windows_csv {
            write_window_revenues(path, &report)?;
        }
        Ok(())
    }
}
