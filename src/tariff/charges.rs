use derive_more::{Add, AddAssign};

use crate::{
    quantity::{
        Zero,
        currency::Dollars,
        power::Kilowatts,
        rate::{KilowattHourRate, KilowattRate},
        time::Hours,
    },
    tariff::{NetMetering, TouPeriod},
};

#[derive(Debug, thiserror::Error)]
pub enum TariffError {
    #[error("negative billed peak {peak} in demand period #{period}")]
    NegativePeak { period: usize, peak: Kilowatts },

    #[error("negative billed flat demand peak {0}")]
    NegativeFlatPeak(Kilowatts),

    #[error("there is no net load to bill")]
    Empty,
}

/// Energy charge of one hour of net load.
pub fn hourly_energy_charge(
    net_load: Kilowatts,
    rate: KilowattHourRate,
    net_metering: NetMetering,
) -> Dollars {
    let energy = net_load * Hours::ONE;
    match net_metering {
        NetMetering::FixedSellPrice(sell_price) if net_load < Kilowatts::ZERO => {
            energy * sell_price
        }
        _ => energy * rate,
    }
}

/// Energy charge of an hourly net load trajectory.
///
/// Period ids must be valid indices into `rates`, which the rate structure guarantees.
pub fn energy_charge(
    net_load: &[Kilowatts],
    periods: &[TouPeriod],
    rates: &[KilowattHourRate],
    net_metering: NetMetering,
) -> Dollars {
    net_load
        .iter()
        .zip(periods)
        .map(|(net_load, period)| hourly_energy_charge(*net_load, rates[period.0], net_metering))
        .sum()
}

/// Maximum net load per demand period, [`None`] for periods without any hour.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeriodPeaks(Vec<Option<Kilowatts>>);

impl PeriodPeaks {
    pub fn measure(net_load: &[Kilowatts], periods: &[TouPeriod], n_periods: usize) -> Self {
        let mut peaks = vec![None; n_periods];
        for (net_load, period) in net_load.iter().zip(periods) {
            let peak: &mut Option<Kilowatts> = &mut peaks[period.0];
            *peak = Some(peak.map_or(*net_load, |peak| peak.max(*net_load)));
        }
        Self(peaks)
    }

    /// Per-period maximum over several measurements of the same schedule.
    pub fn column_max<'a>(rows: impl IntoIterator<Item = &'a Self>, n_periods: usize) -> Self {
        let mut peaks = vec![None; n_periods];
        for row in rows {
            for (peak, candidate) in peaks.iter_mut().zip(&row.0) {
                *peak = match (*peak, *candidate) {
                    (Some(lhs), Some(rhs)) => Some(Kilowatts::max(lhs, rhs)),
                    (lhs, rhs) => lhs.or(rhs),
                };
            }
        }
        Self(peaks)
    }

    pub fn get(&self, period: TouPeriod) -> Option<Kilowatts> {
        self.0.get(period.0).copied().flatten()
    }

    pub fn overall(&self) -> Option<Kilowatts> {
        self.0.iter().flatten().copied().max()
    }
}

/// Demand charge rates applicable to a single billing period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DemandRates {
    pub time_of_use: Vec<KilowattRate>,
    pub flat: KilowattRate,
}

impl DemandRates {
    /// Same shape, all rates set to zero.
    #[must_use]
    pub fn zeroed(&self) -> Self {
        Self {
            time_of_use: vec![KilowattRate::ZERO; self.time_of_use.len()],
            flat: KilowattRate::ZERO,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.flat == KilowattRate::ZERO
            && self.time_of_use.iter().all(|rate| *rate == KilowattRate::ZERO)
    }

    /// Bill the peaks: time-of-use rates per period plus the flat rate on the overall peak.
    ///
    /// A negative peak is only an error when it is actually billed at a nonzero rate.
    pub fn charge(&self, peaks: &PeriodPeaks) -> Result<DemandCharge, TariffError> {
        let mut time_of_use = Dollars::ZERO;
        for (period, rate) in self.time_of_use.iter().enumerate() {
            let Some(peak) = peaks.get(TouPeriod(period)) else { continue };
            if *rate == KilowattRate::ZERO {
                continue;
            }
            if peak < Kilowatts::ZERO {
                return Err(TariffError::NegativePeak { period, peak });
            }
            time_of_use += *rate * peak;
        }
        let overall = peaks.overall().ok_or(TariffError::Empty)?;
        let flat = if self.flat == KilowattRate::ZERO {
            Dollars::ZERO
        } else if overall < Kilowatts::ZERO {
            return Err(TariffError::NegativeFlatPeak(overall));
        } else {
            self.flat * overall
        };
        Ok(DemandCharge { flat, time_of_use })
    }
}

#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Add, AddAssign)]
pub struct DemandCharge {
    pub flat: Dollars,
    pub time_of_use: Dollars,
}

impl DemandCharge {
    pub fn total(self) -> Dollars {
        self.flat + self.time_of_use
    }
}
