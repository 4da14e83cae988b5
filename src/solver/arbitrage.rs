use crate::{
    core::dispatch::{ArbitrageModel, DispatchError, MarketSchedule, MarketWindow},
    quantity::{Zero, currency::Dollars, energy::KilowattHours, time::Hours},
    solver::{EnergyGrid, Storage, solve},
};

/// Wholesale arbitrage, with the full power offered as regulation capacity in idle hours.
pub struct DpArbitrageModel {
    grid: EnergyGrid,
    regulation_capacity: KilowattHours,
}

impl DpArbitrageModel {
    pub fn new(storage: &Storage) -> Self {
        Self {
            grid: EnergyGrid::new(storage),
            regulation_capacity: storage.power_rating * Hours::ONE,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct HourAction {
    /// Energy bought from the market (negative is sold).
    flow: KilowattHours,

    offers_regulation: bool,
}

impl HourAction {
    fn revenue(
        self,
        hour: usize,
        regulation_capacity: KilowattHours,
        prices: &MarketWindow<'_>,
    ) -> Dollars {
        let energy = -(self.flow * prices.energy_price[hour]);
        if self.offers_regulation {
            energy
                + regulation_capacity * prices.regulation_up_price[hour]
                + regulation_capacity * prices.regulation_down_price[hour]
        } else {
            energy
        }
    }
}

impl ArbitrageModel for DpArbitrageModel {
    type Schedule = MarketPlan;

    fn solve(&self, window: &MarketWindow<'_>) -> Result<MarketPlan, DispatchError> {
        window.check_len(window.len())?;
        let plan = solve(&self.grid, window.len(), |hour, flow| {
            let mut action = HourAction { flow, offers_regulation: false };
            if flow == KilowattHours::ZERO {
                let offered = HourAction { offers_regulation: true, ..action };
                if offered.revenue(hour, self.regulation_capacity, window) > Dollars::ZERO {
                    action = offered;
                }
            }
            Some((-action.revenue(hour, self.regulation_capacity, window), action))
        })
        .ok_or(DispatchError::Infeasible { start: window.start })?;
        Ok(MarketPlan {
            actions: plan.actions,
            regulation_capacity: self.regulation_capacity,
            gross_revenue: -plan.cost,
        })
    }
}

/// Solved hourly market schedule.
pub struct MarketPlan {
    actions: Vec<HourAction>,
    regulation_capacity: KilowattHours,
    gross_revenue: Dollars,
}

impl MarketSchedule for MarketPlan {
    fn gross_revenue(&self) -> Dollars {
        self.gross_revenue
    }

    fn reprocess(&self, actual: &MarketWindow<'_>) -> Result<Dollars, DispatchError> {
        actual.check_len(self.actions.len())?;
        Ok(self
            .actions
            .iter()
            .enumerate()
            .map(|(hour, action)| action.revenue(hour, self.regulation_capacity, actual))
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        core::{
            dispatch::Parameters,
            harness::{ForecastSimulationHarness, Scenario, tests::sample_market},
            period::Period,
        },
        quantity::{power::Kilowatts, rate::KilowattHourRate},
    };

    fn model() -> DpArbitrageModel {
        let parameters = Parameters::builder()
            .energy_capacity(KilowattHours(10.0))
            .power_rating(Kilowatts(5.0))
            .extra([("Round_trip_efficiency".to_string(), 1.0)].into())
            .build();
        DpArbitrageModel::new(&Storage::try_from(&parameters).unwrap())
    }

    fn window<'a>(
        energy_price: &'a [KilowattHourRate],
        regulation_price: &'a [KilowattHourRate],
    ) -> MarketWindow<'a> {
        MarketWindow {
            start: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            energy_price,
            regulation_up_price: regulation_price,
            regulation_down_price: regulation_price,
        }
    }

    #[test]
    fn test_arbitrage() {
        let prices = [KilowattHourRate(0.1), KilowattHourRate(0.5)];
        let regulation = [KilowattHourRate(0.0); 2];
        let plan = model().solve(&window(&prices, &regulation)).unwrap();
        assert_abs_diff_eq!(plan.gross_revenue().0, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_regulation_in_idle_hours() {
        let prices = [KilowattHourRate(0.1); 3];
        let regulation = [KilowattHourRate(0.01); 3];
        let plan = model().solve(&window(&prices, &regulation)).unwrap();
        // 3 hours × 5 kWh × (0.01 + 0.01) $/kWh:
        assert_abs_diff_eq!(plan.gross_revenue().0, 0.3, epsilon = 1e-9);
    }

    #[test]
    fn test_reprocess() {
        let forecast = [KilowattHourRate(0.1), KilowattHourRate(0.5)];
        let actual = [KilowattHourRate(0.5), KilowattHourRate(0.1)];
        let regulation = [KilowattHourRate(0.0); 2];
        let plan = model().solve(&window(&forecast, &regulation)).unwrap();
        let realized = plan.reprocess(&window(&actual, &regulation)).unwrap();
        assert_abs_diff_eq!(realized.0, -2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_reprocess_misaligned() {
        let prices = [KilowattHourRate(0.1), KilowattHourRate(0.5)];
        let regulation = [KilowattHourRate(0.0); 2];
        let plan = model().solve(&window(&prices, &regulation)).unwrap();
        assert!(matches!(
            plan.reprocess(&window(&prices[..1], &regulation[..1])),
            Err(DispatchError::Misaligned { .. }),
        ));
    }

    #[test]
    fn test_persistent_not_above_perfect() {
        let actual = sample_market(Period::try_new(2019, 2).unwrap());
        let model = model();
        let harness = ForecastSimulationHarness::new(&model);
        for pair in Scenario::ALL.chunks(2) {
            let perfect = harness.run(pair[0], &actual).unwrap().unwrap();
            let persistent = harness.run(pair[1], &actual).unwrap().unwrap();
            assert!(persistent.total().0 <= perfect.total().0 + 1e-6);
        }
    }
}
