use std::collections::BTreeMap;

use crate::{
    core::{
        aggregate::{Failure, Outcome},
        bill::{Bill, PeriodBillRecord},
        period::Period,
        runner::{DemandBilling, DispatchResult},
    },
    prelude::*,
    quantity::power::Kilowatts,
    tariff::{DemandRates, PeriodPeaks, TariffError},
};

/// Reconstructs the monthly demand charge from independently solved days.
///
/// Individual days cannot see the monthly peak, so they are solved with zero demand rates and
/// the true charge is computed here once: per-period maxima over all days for the time-of-use
/// part, and the overall maximum for the flat part.
///
/// An unbillable trajectory with storage fails the period. An unbillable trajectory without
/// storage is a rate structure error and aborts.
pub struct DemandChargeReconciler<'a> {
    rates: &'a DemandRates,
}

impl<'a> DemandChargeReconciler<'a> {
    pub const fn new(rates: &'a DemandRates) -> Self {
        Self { rates }
    }

    #[instrument(skip_all, name = "Reconciling…", fields(period = ?period))]
    pub fn reconcile(
        &self,
        period: Period,
        days: &BTreeMap<u32, DispatchResult>,
    ) -> Result<Outcome<PeriodBillRecord>> {
        Self::check_day_set(period, days)?;

        let without_storage = self
            .reconcile_trajectory(
                days,
                |result| &result.net_load_without_storage,
                |result| &result.without_storage,
            )
            .context("failed to reconcile the bill without storage")?;
        let with_storage = match self.reconcile_trajectory(
            days,
            |result| &result.net_load_with_storage,
            |result| &result.with_storage,
        ) {
            Ok(bill) => bill,
            Err(error) => {
                debug!(?period, %error, "Failed to reconcile the bill with storage");
                return Ok(Err(Failure { window_start: period.start, reason: error.to_string() }));
            }
        };

        debug!(
            with_storage = ?with_storage.total(),
            without_storage = ?without_storage.total(),
            "Reconciled",
        );
        Ok(Ok(PeriodBillRecord { month: period.month, with_storage, without_storage }))
    }

    /// Only the complete set of deferred days may be reconciled.
    fn check_day_set(period: Period, days: &BTreeMap<u32, DispatchResult>) -> Result {
        ensure!(!days.is_empty(), "there are no days to reconcile for {period:?}");
        ensure!(
            days.keys().copied().eq(1..=period.n_days),
            "incomplete day set for {period:?}: expected days 1..={}, got {:?}",
            period.n_days,
            days.keys().collect::<Vec<_>>(),
        );
        for (day, result) in days {
            ensure!(
                result.window.month == period.month && result.window.day == Some(*day),
                "result for day #{day} belongs to another window ({:?})",
                result.window,
            );
            ensure!(
                result.demand_billing == DemandBilling::Deferred,
                "day #{day} has already been billed for demand",
            );
        }
        Ok(())
    }

    fn reconcile_trajectory(
        &self,
        days: &BTreeMap<u32, DispatchResult>,
        net_load: impl Fn(&DispatchResult) -> &Vec<Kilowatts>,
        daily_bill: impl Fn(&DispatchResult) -> &Bill,
    ) -> Result<Bill, TariffError> {
        let n_periods = self.rates.time_of_use.len();
        let peaks: Vec<PeriodPeaks> = days
            .values()
            .map(|result| {
                PeriodPeaks::measure(net_load(result), &result.demand_periods, n_periods)
            })
            .collect();
        let demand = self.rates.charge(&PeriodPeaks::column_max(&peaks, n_periods))?;

        // Daily demand charges are zero because of the deferred billing, but sum them anyway.
        let daily_sum =
            days.values().fold(Bill::default(), |sum, result| sum + *daily_bill(result));
        Ok(Bill { energy: daily_sum.energy, demand: daily_sum.demand + demand })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{
        core::{
            period::{Granularity, Window},
            slicer::Slicer,
        },
        quantity::{currency::Dollars, rate::KilowattRate},
        tariff::{DemandCharge, TouPeriod},
    };

    fn demand_rates() -> DemandRates {
        DemandRates {
            time_of_use: vec![KilowattRate(5.0), KilowattRate(2.0)],
            flat: KilowattRate(10.0),
        }
    }

    fn windows(period: Period) -> Vec<Window> {
        let load = crate::core::runner::tests::flat_load(period, 0.0);
        Slicer::new(period, Granularity::Daily).try_windows(&[("load", &load)]).unwrap()
    }

    /// Morning hours in period #0, afternoon in period #1.
    fn day(window: Window, morning_peak: f64, energy: f64) -> DispatchResult {
        let net_load: Vec<Kilowatts> = (0..24)
            .map(|hour| match hour {
                9 => Kilowatts(morning_peak),
                0..12 => Kilowatts(10.0),
                _ => Kilowatts(0.0),
            })
            .collect();
        let demand_periods = (0..24).map(|hour| TouPeriod(usize::from(hour >= 12))).collect();
        let bill = Bill { energy: Dollars(energy), demand: DemandCharge::default() };
        DispatchResult {
            window,
            demand_billing: DemandBilling::Deferred,
            with_storage: bill,
            without_storage: bill,
            net_load_with_storage: net_load.clone(),
            net_load_without_storage: net_load,
            demand_periods,
        }
    }

    /// Days 1-3 peak at 100 kW, day 4 at 150 kW, the rest at 50 kW, all afternoons at zero.
    fn february() -> (Period, BTreeMap<u32, DispatchResult>) {
        let period = Period::try_new(2019, 2).unwrap();
        let days = windows(period)
            .into_iter()
            .map(|window| {
                let day_number = window.day.unwrap();
                let peak = match day_number {
                    1..=3 => 100.0,
                    4 => 150.0,
                    _ => 50.0,
                };
                (day_number, day(window, peak, 10.0))
            })
            .collect();
        (period, days)
    }

    /// Demand charge as if every day were billed on its own.
    fn summed_daily<'a>(
        rates: &DemandRates,
        days: impl IntoIterator<Item = &'a DispatchResult>,
    ) -> DemandCharge {
        let n_periods = rates.time_of_use.len();
        days.into_iter()
            .map(|result| {
                let peaks = PeriodPeaks::measure(
                    &result.net_load_with_storage,
                    &result.demand_periods,
                    n_periods,
                );
                rates.charge(&peaks).unwrap()
            })
            .fold(DemandCharge::default(), |sum, charge| sum + charge)
    }

    fn reconciled(
        rates: &DemandRates,
        period: Period,
        days: &BTreeMap<u32, DispatchResult>,
    ) -> PeriodBillRecord {
        DemandChargeReconciler::new(rates).reconcile(period, days).unwrap().unwrap()
    }

    #[test]
    fn test_february() {
        let rates = demand_rates();
        let (period, days) = february();
        let record = reconciled(&rates, period, &days);
        assert_eq!(record.month, 2);
        assert_abs_diff_eq!(record.with_storage.demand.time_of_use.0, 750.0);
        assert_abs_diff_eq!(record.with_storage.demand.flat.0, 1500.0);
        assert_abs_diff_eq!(record.with_storage.total().0, 280.0 + 750.0 + 1500.0);
    }

    #[test]
    fn test_energy_charges_are_additive() {
        let rates = demand_rates();
        let (period, days) = february();
        let record = reconciled(&rates, period, &days);
        let summed: Dollars = days.values().map(|result| result.with_storage.energy).sum();
        assert_eq!(record.with_storage.energy, summed);
        assert_eq!(record.without_storage.energy, summed);
    }

    #[test]
    fn test_reconciled_below_daily_sum() {
        let rates = demand_rates();
        let (period, days) = february();
        let record = reconciled(&rates, period, &days);
        let summed_daily = summed_daily(&rates, days.values());
        assert!(summed_daily.time_of_use > record.with_storage.demand.time_of_use);
        assert!(summed_daily.flat > record.with_storage.demand.flat);
    }

    #[test]
    fn test_incomplete_day_set() {
        let rates = demand_rates();
        let (period, mut days) = february();
        days.remove(&14);
        assert!(DemandChargeReconciler::new(&rates).reconcile(period, &days).is_err());
        assert!(DemandChargeReconciler::new(&rates).reconcile(period, &BTreeMap::new()).is_err());
    }

    #[test]
    fn test_billed_day_rejected() {
        let rates = demand_rates();
        let (period, mut days) = february();
        days.get_mut(&1).unwrap().demand_billing = DemandBilling::Billed;
        assert!(DemandChargeReconciler::new(&rates).reconcile(period, &days).is_err());
    }

    /// Sets the afternoon net load of every day to -1 kW.
    fn export_in_afternoons(
        days: &mut BTreeMap<u32, DispatchResult>,
        net_load: impl Fn(&mut DispatchResult) -> &mut Vec<Kilowatts>,
    ) {
        for result in days.values_mut() {
            let periods = result.demand_periods.clone();
            for (net_load, demand_period) in net_load(result).iter_mut().zip(periods) {
                if demand_period == TouPeriod(1) {
                    *net_load = Kilowatts(-1.0);
                }
            }
        }
    }

    #[test]
    fn test_negative_peak_with_storage_fails_the_period() {
        let rates = demand_rates();
        let (period, mut days) = february();
        export_in_afternoons(&mut days, |result| &mut result.net_load_with_storage);
        let failure = DemandChargeReconciler::new(&rates)
            .reconcile(period, &days)
            .unwrap()
            .unwrap_err();
        assert_eq!(failure.window_start, period.start);
    }

    #[test]
    fn test_negative_peak_without_storage_is_fatal() {
        let rates = demand_rates();
        let (period, mut days) = february();
        export_in_afternoons(&mut days, |result| &mut result.net_load_without_storage);
        assert!(DemandChargeReconciler::new(&rates).reconcile(period, &days).is_err());
    }
}
