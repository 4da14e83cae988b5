use std::collections::BTreeMap;

use itertools::Itertools;
use rayon::prelude::*;

use crate::{
    core::{
        aggregate::Outcome,
        bill::PeriodBillRecord,
        dispatch::{BillModel, DispatchError},
        period::{Granularity, Window},
        reconciler::DemandChargeReconciler,
        runner::{BillingPeriod, DemandBilling, DispatchResult, DispatchRunner},
    },
    prelude::*,
};

/// The same month billed with the two dispatch horizons.
#[derive(Clone, Debug)]
pub struct MonthComparison {
    /// Single monthly window solved with the billed demand rates.
    pub direct: Outcome<PeriodBillRecord>,

    /// Independently solved days, reconciled into a monthly bill.
    pub decomposed: Outcome<PeriodBillRecord>,
}

#[instrument(skip_all, name = "Comparing dispatch horizons…", fields(period = ?inputs.period))]
pub fn compare_horizons<M: BillModel>(
    model: &M,
    inputs: &BillingPeriod<'_>,
) -> Result<MonthComparison> {
    let runner = DispatchRunner::new(model);
    let monthly = inputs.windows(Granularity::Monthly)?;
    let daily = inputs.windows(Granularity::Daily)?;
    let month_window = monthly.first().context("the slicer returned no monthly window")?;

    let (direct, decomposed) = rayon::join(
        || solve_direct(&runner, inputs, month_window),
        || solve_decomposed(&runner, inputs, &daily),
    );
    let comparison = MonthComparison { direct: direct?, decomposed: decomposed? };
    info!(
        period = ?inputs.period,
        direct = ?comparison.direct.as_ref().map(PeriodBillRecord::savings),
        decomposed = ?comparison.decomposed.as_ref().map(PeriodBillRecord::savings),
        "Compared savings",
    );
    Ok(comparison)
}

fn solve_direct<M: BillModel>(
    runner: &DispatchRunner<'_, M>,
    inputs: &BillingPeriod<'_>,
    window: &Window,
) -> Result<Outcome<PeriodBillRecord>> {
    match runner.run(inputs, window, DemandBilling::Billed) {
        Ok(result) => Ok(Ok(PeriodBillRecord::direct(&result))),
        Err(error) => error.into_failure().map(Err),
    }
}

fn solve_decomposed<M: BillModel>(
    runner: &DispatchRunner<'_, M>,
    inputs: &BillingPeriod<'_>,
    windows: &[Window],
) -> Result<Outcome<PeriodBillRecord>> {
    let windows: Vec<(u32, &Window)> = windows
        .iter()
        .map(|window| window.day.map(|day| (day, window)).context("expected a daily window"))
        .try_collect()?;
    let days: Result<BTreeMap<u32, DispatchResult>, DispatchError> = windows
        .into_par_iter()
        .map(|(day, window)| -> Result<_, DispatchError> {
            Ok((day, runner.run(inputs, window, DemandBilling::Deferred)?))
        })
        .collect();
    match days {
        Ok(days) => {
            DemandChargeReconciler::new(&inputs.demand_rates).reconcile(inputs.period, &days)
        }
        Err(error) => error.into_failure().map(Err),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{
        core::{
            dispatch::{BillOutcome, BillingWindow, Parameters},
            period::Period,
            runner::{
                PvProfile,
                tests::{IdleModel, flat_load},
            },
            series::TimeSeries,
        },
        quantity::{
            energy::KilowattHours,
            power::Kilowatts,
            rate::{KilowattHourRate, KilowattRate},
        },
        solver::{DpBillModel, Storage},
        tariff::{NetMetering, RateStructure, WeekSchedules, tests::sample_rate_structure},
    };

    /// 10 kWh, 5 kW storage with a coarse grid.
    fn dp_model() -> DpBillModel {
        let parameters = Parameters::builder()
            .energy_capacity(KilowattHours(10.0))
            .power_rating(Kilowatts(5.0))
            .extra(
                [("Energy_levels".to_string(), 20.0), ("Demand_cap_steps".to_string(), 5.0)]
                    .into(),
            )
            .build();
        DpBillModel::new(&Storage::try_from(&parameters).unwrap())
    }

    /// Expensive energy and a $5/kW demand charge for the 17:00 hour only, no flat charge.
    fn evening_peak_rates() -> RateStructure {
        let schedule = || -> Vec<Vec<usize>> {
            (0..12).map(|_| (0..24).map(|hour| usize::from(hour == 17)).collect()).collect()
        };
        RateStructure {
            energy_schedules: WeekSchedules::try_new(schedule(), schedule(), 2).unwrap(),
            energy_rates: vec![KilowattHourRate(0.10), KilowattHourRate(0.40)],
            demand_schedules: WeekSchedules::try_new(schedule(), schedule(), 2).unwrap(),
            time_of_use_demand_rates: vec![KilowattRate(0.0), KilowattRate(5.0)],
            flat_demand_rates: [KilowattRate(0.0); 12],
            net_metering: NetMetering::NettedAgainstBuyRate,
        }
    }

    /// Irregular load without any daily pattern.
    #[expect(clippy::cast_precision_loss)]
    fn varying_load(period: Period) -> TimeSeries<Kilowatts> {
        let values = (0..period.n_hours())
            .map(|hour| Kilowatts(20.0 + ((hour * 7) % 24) as f64 + (hour % 5) as f64))
            .collect();
        TimeSeries::new(period.start, values)
    }

    fn assert_absent_pv_equals_zero_pv<M: BillModel>(model: &M) {
        let rates = sample_rate_structure();
        let period = Period::try_new(2019, 3).unwrap();
        let load = varying_load(period);
        let absent =
            BillingPeriod::try_new(period, &rates, load.clone(), PvProfile::Absent).unwrap();
        let zero = BillingPeriod::try_new(
            period,
            &rates,
            load.clone(),
            PvProfile::Present(TimeSeries::zeros(load.start(), load.len())),
        )
        .unwrap();

        let runner = DispatchRunner::new(model);
        let window = &absent.windows(Granularity::Monthly).unwrap()[0];
        let absent_result = runner.run(&absent, window, DemandBilling::Billed).unwrap();
        let zero_result = runner.run(&zero, window, DemandBilling::Billed).unwrap();
        assert_eq!(absent_result.net_load_with_storage, zero_result.net_load_with_storage);

        let absent = compare_horizons(model, &absent).unwrap();
        let zero = compare_horizons(model, &zero).unwrap();
        assert_eq!(absent.direct.unwrap(), zero.direct.unwrap());
        assert_eq!(absent.decomposed.unwrap(), zero.decomposed.unwrap());
    }

    #[test]
    fn test_absent_pv_equals_zero_pv() {
        assert_absent_pv_equals_zero_pv(&IdleModel::default());
    }

    #[test]
    fn test_absent_pv_equals_zero_pv_with_storage() {
        assert_absent_pv_equals_zero_pv(&dp_model());
    }

    #[test]
    fn test_small_load_is_billable_on_both_horizons() {
        let rates = evening_peak_rates();
        let period = Period::try_new(2019, 2).unwrap();
        let inputs =
            BillingPeriod::try_new(period, &rates, flat_load(period, 1.0), PvProfile::Absent)
                .unwrap();
        let comparison = compare_horizons(&dp_model(), &inputs).unwrap();
        for record in [comparison.direct.unwrap(), comparison.decomposed.unwrap()] {
            assert!(record.with_storage.demand.time_of_use.0 >= 0.0);
            assert!(record.with_storage.total() < record.without_storage.total());
        }
    }

    #[test]
    fn test_decomposed_without_storage_equals_direct() {
        let rates = sample_rate_structure();
        let period = Period::try_new(2019, 2).unwrap();
        let pv = TimeSeries::new(
            period.start,
            (0..period.n_hours())
                .map(|hour| Kilowatts(if hour % 24 == 12 { 8.0 } else { 0.0 }))
                .collect(),
        );
        let inputs =
            BillingPeriod::try_new(period, &rates, varying_load(period), PvProfile::Present(pv))
                .unwrap();
        let comparison = compare_horizons(&IdleModel::default(), &inputs).unwrap();
        let direct = comparison.direct.unwrap().without_storage;
        let decomposed = comparison.decomposed.unwrap().without_storage;
        assert_abs_diff_eq!(direct.energy.0, decomposed.energy.0, epsilon = 1e-6);
        assert_abs_diff_eq!(direct.demand.flat.0, decomposed.demand.flat.0, epsilon = 1e-6);
        assert_abs_diff_eq!(
            direct.demand.time_of_use.0,
            decomposed.demand.time_of_use.0,
            epsilon = 1e-6,
        );
    }

    struct InfeasibleOnDay(u32);

    impl BillModel for InfeasibleOnDay {
        fn solve(&self, window: &BillingWindow<'_>) -> Result<BillOutcome, DispatchError> {
            if window.len() == 24 && chrono::Datelike::day(&window.start) == self.0 {
                Err(DispatchError::Infeasible { start: window.start })
            } else {
                IdleModel::default().solve(window)
            }
        }
    }

    #[test]
    fn test_infeasible_day_fails_only_the_decomposed_month() {
        let rates = sample_rate_structure();
        let period = Period::try_new(2019, 2).unwrap();
        let inputs =
            BillingPeriod::try_new(period, &rates, flat_load(period, 5.0), PvProfile::Absent)
                .unwrap();
        let comparison = compare_horizons(&InfeasibleOnDay(10), &inputs).unwrap();
        assert!(comparison.direct.is_ok());
        let failure = comparison.decomposed.unwrap_err();
        assert_eq!(failure.window_start, period.day_start(10));
    }
}
