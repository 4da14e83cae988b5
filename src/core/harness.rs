use std::fmt::{Display, Formatter};

use rayon::prelude::*;

use crate::{
    core::{
        aggregate::Outcome,
        dispatch::{ArbitrageModel, DispatchError, MarketSchedule, MarketWindow},
        period::{Granularity, HOURS_PER_DAY, Period, Window},
        series::TimeSeries,
        slicer::Slicer,
    },
    prelude::*,
    quantity::{currency::Dollars, rate::KilowattHourRate},
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ForecastMethod {
    /// Tomorrow looks like today: every price is the one observed 24 hours earlier.
    Persistent,
}

impl ForecastMethod {
    /// Forecast the whole period from the realized prices.
    ///
    /// The first day of the period is forecast from its last day.
    pub fn forecast(self, actual: &MarketPeriod) -> MarketPeriod {
        match self {
            Self::Persistent => MarketPeriod {
                period: actual.period,
                energy_price: actual.energy_price.rotated_right(HOURS_PER_DAY),
                regulation_up_price: actual.regulation_up_price.rotated_right(HOURS_PER_DAY),
                regulation_down_price: actual.regulation_down_price.rotated_right(HOURS_PER_DAY),
            },
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum InformationMode {
    PerfectForesight,
    Forecast(ForecastMethod),
}

/// Dispatch horizon and information available to the dispatch decision.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Scenario {
    pub horizon: Granularity,
    pub information: InformationMode,
}

impl Scenario {
    /// All scenarios in report order.
    pub const ALL: [Self; 4] = [
        Self { horizon: Granularity::Daily, information: InformationMode::PerfectForesight },
        Self {
            horizon: Granularity::Daily,
            information: InformationMode::Forecast(ForecastMethod::Persistent),
        },
        Self { horizon: Granularity::Monthly, information: InformationMode::PerfectForesight },
        Self {
            horizon: Granularity::Monthly,
            information: InformationMode::Forecast(ForecastMethod::Persistent),
        },
    ];

    const fn labels(self) -> (&'static str, &'static str) {
        let horizon = match self.horizon {
            Granularity::Daily => "daily",
            Granularity::Monthly => "monthly",
        };
        let information = match self.information {
            InformationMode::PerfectForesight => "perfect",
            InformationMode::Forecast(ForecastMethod::Persistent) => "persistent",
        };
        (horizon, information)
    }

    /// Machine-friendly name, used for CSV columns.
    pub fn slug(self) -> String {
        let (horizon, information) = self.labels();
        format!("{horizon}_{information}")
    }
}

impl Display for Scenario {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (horizon, information) = self.labels();
        write!(f, "{horizon} ({information})")
    }
}

/// Hourly market prices of one calendar month.
#[derive(Clone, Debug)]
pub struct MarketPeriod {
    pub period: Period,
    pub energy_price: TimeSeries<KilowattHourRate>,
    pub regulation_up_price: TimeSeries<KilowattHourRate>,
    pub regulation_down_price: TimeSeries<KilowattHourRate>,
}

impl MarketPeriod {
    pub fn windows(&self, granularity: Granularity) -> Result<Vec<Window>> {
        Slicer::new(self.period, granularity)
            .try_windows(&[
                ("energy price", &self.energy_price),
                ("regulation up price", &self.regulation_up_price),
                ("regulation down price", &self.regulation_down_price),
            ])
            .with_context(|| format!("failed to slice the market prices of {:?}", self.period))
    }

    pub fn window(&self, window: &Window) -> MarketWindow<'_> {
        MarketWindow {
            start: window.start,
            energy_price: self.energy_price.window(window),
            regulation_up_price: self.regulation_up_price.window(window),
            regulation_down_price: self.regulation_down_price.window(window),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WindowRevenue {
    pub window: Window,
    pub revenue: Dollars,
}

/// Realized revenue of one month, kept per window in chronological order.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct MonthRevenue {
    pub month: u32,
    pub windows: Vec<WindowRevenue>,
}

impl MonthRevenue {
    pub fn total(&self) -> Dollars {
        self.windows.iter().map(|window| window.revenue).sum()
    }
}

/// Decides on the information available to the scenario, and scores on realized prices.
pub struct ForecastSimulationHarness<'m, M> {
    model: &'m M,
}

impl<'m, M: ArbitrageModel> ForecastSimulationHarness<'m, M> {
    pub const fn new(model: &'m M) -> Self {
        Self { model }
    }

    #[instrument(
        skip_all,
        name = "Simulating…",
        fields(period = ?actual.period, scenario = %scenario),
    )]
    pub fn run(&self, scenario: Scenario, actual: &MarketPeriod) -> Result<Outcome<MonthRevenue>> {
        let windows = actual.windows(scenario.horizon)?;
        let decision_prices = match scenario.information {
            InformationMode::PerfectForesight => None,
            InformationMode::Forecast(method) => Some(method.forecast(actual)),
        };
        let revenues: Result<Vec<WindowRevenue>, DispatchError> = windows
            .par_iter()
            .map(|window| -> Result<WindowRevenue, DispatchError> {
                let realized = actual.window(window);
                let revenue = match &decision_prices {
                    None => self.model.solve(&realized)?.gross_revenue(),
                    Some(forecast) => {
                        self.model.solve(&forecast.window(window))?.reprocess(&realized)?
                    }
                };
                Ok(WindowRevenue { window: window.clone(), revenue })
            })
            .collect();
        match revenues {
            Ok(windows) => {
                let revenue = MonthRevenue { month: actual.period.month, windows };
                debug!(total = ?revenue.total(), "Simulated");
                Ok(Ok(revenue))
            }
            Err(error) => {
                let failure = error.into_failure()?;
                warn!(reason = %failure.reason, "The month failed");
                Ok(Err(failure))
            }
        }
    }
}
