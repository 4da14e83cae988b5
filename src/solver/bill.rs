use rayon::prelude::*;

use crate::{
    core::{
        bill::Bill,
        dispatch::{BillModel, BillOutcome, BillingWindow, DispatchError},
    },
    prelude::*,
    quantity::{Zero, power::Kilowatts},
    solver::{EnergyGrid, Storage, solve},
    tariff::{PeriodPeaks, TariffError, energy_charge, hourly_energy_charge},
};

/// Behind-the-meter bill minimization.
///
/// The dynamic programming only sees the hourly energy charge. Demand charges are handled by
/// re-solving under a series of net load caps below the baseline peak, and picking the cheapest
/// total bill.
pub struct DpBillModel {
    grid: EnergyGrid,
    power_rating: Kilowatts,
    n_demand_cap_steps: usize,
}

impl DpBillModel {
    const TOLERANCE: f64 = 1e-9;

    pub fn new(storage: &Storage) -> Self {
        Self {
            grid: EnergyGrid::new(storage),
            power_rating: storage.power_rating,
            n_demand_cap_steps: storage.n_demand_cap_steps,
        }
    }

    /// Candidate net load caps, [`None`] being uncapped.
    #[expect(clippy::cast_precision_loss)]
    fn demand_caps(
        &self,
        window: &BillingWindow<'_>,
        baseline: &[Kilowatts],
    ) -> Vec<Option<Kilowatts>> {
        let mut caps = vec![None];
        let Some(peak) = baseline.iter().copied().max() else {
            return caps;
        };
        if window.demand_rates.is_zero() || self.n_demand_cap_steps == 0 {
            return caps;
        }
        let step = self.power_rating / self.n_demand_cap_steps as f64;
        caps.extend(
            (1..=self.n_demand_cap_steps)
                .map(|index| peak - step * index as f64)
                .filter(|cap| *cap >= Kilowatts::ZERO)
                .map(Some),
        );
        caps
    }

    fn bill(window: &BillingWindow<'_>, net_load: &[Kilowatts]) -> Result<Bill, TariffError> {
        let peaks = PeriodPeaks::measure(
            net_load,
            window.demand_periods,
            window.demand_rates.time_of_use.len(),
        );
        let energy = energy_charge(
            net_load,
            window.energy_periods,
            window.energy_rates,
            window.net_metering,
        );
        Ok(Bill { energy, demand: window.demand_rates.charge(&peaks)? })
    }

    /// Solve under the net load cap and return the net load and bill.
    ///
    /// The storage only offsets the site's own consumption: the net load never drops below the
    /// baseline or zero, whichever is lower. Hence, a billed period that peaks at or above zero
    /// without storage still does so with storage.
    fn solve_capped(
        &self,
        window: &BillingWindow<'_>,
        baseline: &[Kilowatts],
        cap: Option<Kilowatts>,
    ) -> Option<(Vec<Kilowatts>, Bill)> {
        let plan = solve(&self.grid, baseline.len(), |hour, flow| {
            let net_load = baseline[hour] + Kilowatts::from(flow);
            if cap.is_some_and(|cap| net_load.0 > cap.0 + Self::TOLERANCE) {
                return None;
            }
            if net_load.0 < baseline[hour].min(Kilowatts::ZERO).0 - Self::TOLERANCE {
                return None;
            }
            let rate = window.energy_rates[window.energy_periods[hour].0];
            Some((hourly_energy_charge(net_load, rate, window.net_metering), ()))
        })?;
        let net_load: Vec<Kilowatts> = baseline
            .iter()
            .zip(&plan.flows)
            .map(|(baseline, flow)| *baseline + Kilowatts::from(*flow))
            .collect();
        match Self::bill(window, &net_load) {
            Ok(bill) => Some((net_load, bill)),
            Err(error) => {
                trace!(?cap, %error, "Discarded the candidate");
                None
            }
        }
    }
}

impl BillModel for DpBillModel {
    fn solve(&self, window: &BillingWindow<'_>) -> Result<BillOutcome, DispatchError> {
        let n_hours = window.len();
        for len in [window.pv.len(), window.energy_periods.len(), window.demand_periods.len()] {
            if len != n_hours {
                return Err(DispatchError::Misaligned { expected: n_hours, actual: len });
            }
        }

        let baseline = window.baseline();
        let without_storage = Self::bill(window, &baseline)?;
        let caps = self.demand_caps(window, &baseline);
        trace!(n_caps = caps.len(), "Searching for the best demand cap…");

        let (net_load_with_storage, with_storage) = caps
            .into_par_iter()
            .filter_map(|cap| self.solve_capped(window, &baseline, cap))
            .min_by_key(|(_, bill)| bill.total())
            .ok_or(DispatchError::Infeasible { start: window.start })?;

        Ok(BillOutcome { with_storage, without_storage, net_load_with_storage })
    }
}
