use crate::{
    core::{
        bill::Bill,
        dispatch::{BillModel, BillingWindow, DispatchError},
        period::{Granularity, Period, Window},
        series::TimeSeries,
        slicer::Slicer,
    },
    prelude::*,
    quantity::power::Kilowatts,
    tariff::{DemandRates, RateStructure, TouPeriod},
};

/// Whether the window itself is billed for demand, or the demand charge is reconciled later.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DemandBilling {
    Billed,

    /// The window is solved with zero demand rates, and the demand charge is reconstructed for
    /// the whole period afterwards.
    Deferred,
}

#[derive(Clone, Debug)]
pub enum PvProfile {
    Absent,
    Present(TimeSeries<Kilowatts>),
}

impl PvProfile {
    /// Absent PV is a zero series aligned with the load.
    pub fn into_series(self, load: &TimeSeries<Kilowatts>) -> TimeSeries<Kilowatts> {
        match self {
            Self::Absent => TimeSeries::zeros(load.start(), load.len()),
            Self::Present(series) => series,
        }
    }
}

/// Everything needed to bill one calendar month.
#[derive(Clone, Debug)]
pub struct BillingPeriod<'a> {
    pub period: Period,
    pub rates: &'a RateStructure,

    /// Demand rates actually billed in this month.
    pub demand_rates: DemandRates,

    pub load: TimeSeries<Kilowatts>,
    pub pv: TimeSeries<Kilowatts>,
    pub energy_periods: TimeSeries<TouPeriod>,
    pub demand_periods: TimeSeries<TouPeriod>,
}

impl<'a> BillingPeriod<'a> {
    pub fn try_new(
        period: Period,
        rates: &'a RateStructure,
        load: TimeSeries<Kilowatts>,
        pv: PvProfile,
    ) -> Result<Self> {
        let pv = pv.into_series(&load);
        Ok(Self {
            period,
            rates,
            demand_rates: rates.demand_rates(period.month)?,
            energy_periods: rates.energy_schedules.expand(period),
            demand_periods: rates.demand_schedules.expand(period),
            load,
            pv,
        })
    }

    /// Validate the inputs and split the month.
    pub fn windows(&self, granularity: Granularity) -> Result<Vec<Window>> {
        Slicer::new(self.period, granularity)
            .try_windows(&[
                ("load", &self.load),
                ("pv", &self.pv),
                ("energy periods", &self.energy_periods),
                ("demand periods", &self.demand_periods),
            ])
            .with_context(|| format!("failed to slice {:?}", self.period))
    }
}

/// Outcome of a single window.
#[must_use]
#[derive(Clone, Debug)]
pub struct DispatchResult {
    pub window: Window,
    pub demand_billing: DemandBilling,
    pub with_storage: Bill,
    pub without_storage: Bill,
    pub net_load_with_storage: Vec<Kilowatts>,
    pub net_load_without_storage: Vec<Kilowatts>,
    pub demand_periods: Vec<TouPeriod>,
}

/// Hands every window to the bill model with the right slices and rates.
#[derive(Copy, Clone)]
pub struct DispatchRunner<'m, M> {
    model: &'m M,
}

impl<'m, M: BillModel> DispatchRunner<'m, M> {
    pub const fn new(model: &'m M) -> Self {
        Self { model }
    }

    #[instrument(
        skip_all,
        name = "Dispatching…",
        fields(month = window.month, day = ?window.day, billing = ?billing),
    )]
    pub fn run(
        &self,
        inputs: &BillingPeriod<'_>,
        window: &Window,
        billing: DemandBilling,
    ) -> Result<DispatchResult, DispatchError> {
        let demand_rates = match billing {
            DemandBilling::Billed => inputs.demand_rates.clone(),
            DemandBilling::Deferred => inputs.demand_rates.zeroed(),
        };
        let billing_window = BillingWindow {
            start: window.start,
            load: inputs.load.window(window),
            pv: inputs.pv.window(window),
            energy_periods: inputs.energy_periods.window(window),
            demand_periods: inputs.demand_periods.window(window),
            energy_rates: &inputs.rates.energy_rates,
            demand_rates: &demand_rates,
            net_metering: inputs.rates.net_metering,
        };
        let outcome = self.model.solve(&billing_window)?;
        if outcome.net_load_with_storage.len() != window.len() {
            return Err(DispatchError::Misaligned {
                expected: window.len(),
                actual: outcome.net_load_with_storage.len(),
            });
        }
        debug!(
            with_storage = ?outcome.with_storage.total(),
            without_storage = ?outcome.without_storage.total(),
            "Solved",
        );
        Ok(DispatchResult {
            window: window.clone(),
            demand_billing: billing,
            with_storage: outcome.with_storage,
            without_storage: outcome.without_storage,
            net_load_with_storage: outcome.net_load_with_storage,
            net_load_without_storage: billing_window.baseline(),
            demand_periods: billing_window.demand_periods.to_vec(),
        })
    }
}

#[cfg(test)]
pub mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        core::dispatch::BillOutcome,
        quantity::Zero,
        tariff::{PeriodPeaks, energy_charge, tests::sample_rate_structure},
    };

    /// Model that never uses the storage and records the demand rates it is handed.
    #[derive(Default)]
    pub struct IdleModel {
        pub seen_demand_rates: Mutex<Vec<DemandRates>>,
    }

    impl BillModel for IdleModel {
        fn solve(&self, window: &BillingWindow<'_>) -> Result<BillOutcome, DispatchError> {
            self.seen_demand_rates.lock().unwrap().push(window.demand_rates.clone());
            let net_load = window.baseline();
            let peaks = PeriodPeaks::measure(
                &net_load,
                window.demand_periods,
                window.demand_rates.time_of_use.len(),
            );
            let bill = Bill {
                energy: energy_charge(
                    &net_load,
                    window.energy_periods,
                    window.energy_rates,
                    window.net_metering,
                ),
                demand: window.demand_rates.charge(&peaks)?,
            };
            Ok(BillOutcome {
                with_storage: bill,
                without_storage: bill,
                net_load_with_storage: net_load,
            })
        }
    }

    pub fn flat_load(period: Period, value: f64) -> TimeSeries<Kilowatts> {
        TimeSeries::new(period.start, vec![Kilowatts(value); period.n_hours()])
    }

    #[test]
    fn test_deferred_zeroes_demand_rates() {
        let rates = sample_rate_structure();
        let period = Period::try_new(2019, 2).unwrap();
        let inputs =
            BillingPeriod::try_new(period, &rates, flat_load(period, 5.0), PvProfile::Absent)
                .unwrap();
        let model = IdleModel::default();
        let runner = DispatchRunner::new(&model);
        let windows = inputs.windows(Granularity::Daily).unwrap();

        let deferred = runner.run(&inputs, &windows[0], DemandBilling::Deferred).unwrap();
        assert_eq!(deferred.with_storage.demand.total(), crate::quantity::currency::Dollars::ZERO);

        let billed = runner.run(&inputs, &windows[0], DemandBilling::Billed).unwrap();
        assert!(billed.with_storage.demand.total() > crate::quantity::currency::Dollars::ZERO);
        let seen = model.seen_demand_rates.lock().unwrap();
        assert!(seen[0].is_zero());
        assert!(!seen[1].is_zero());
    }

    #[test]
    fn test_result_carries_window_slices() {
        let rates = sample_rate_structure();
        let period = Period::try_new(2019, 2).unwrap();
        let inputs =
            BillingPeriod::try_new(period, &rates, flat_load(period, 5.0), PvProfile::Absent)
                .unwrap();
        let model = IdleModel::default();
        let window = &inputs.windows(Granularity::Daily).unwrap()[3];
        let result =
            DispatchRunner::new(&model).run(&inputs, window, DemandBilling::Deferred).unwrap();
        assert_eq!(result.window.day, Some(4));
        assert_eq!(result.demand_periods, inputs.demand_periods.window(window));
        assert_eq!(result.net_load_without_storage, vec![Kilowatts(5.0); 24]);
    }

    #[test]
    fn test_misaligned_pv_rejected() {
        let rates = sample_rate_structure();
        let period = Period::try_new(2019, 2).unwrap();
        let load = flat_load(period, 5.0);
        let pv = TimeSeries::new(period.start, vec![Kilowatts(1.0); 24]);
        let inputs = BillingPeriod::try_new(period, &rates, load, PvProfile::Present(pv)).unwrap();
        assert!(inputs.windows(Granularity::Daily).is_err());
    }
}
