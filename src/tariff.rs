mod charges;
mod document;
mod schedule;

use itertools::Itertools;

pub use self::{
    charges::{
        DemandCharge, DemandRates, PeriodPeaks, TariffError, energy_charge, hourly_energy_charge,
    },
    document::RateDocument,
    schedule::{TouPeriod, WeekSchedules},
};
use self::document::{DemandDocument, EnergyDocument, NetMeteringDocument};
use crate::{
    core::period::{MONTH_ABBREVIATIONS, month_abbreviation},
    prelude::*,
    quantity::rate::{KilowattHourRate, KilowattRate},
};

/// Treatment of energy exported back to the grid.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NetMetering {
    /// Type 1: exports are credited at a fixed sell price.
    FixedSellPrice(KilowattHourRate),

    /// Type 2: exports are netted against the time-of-use buy rate.
    NettedAgainstBuyRate,
}

/// Validated utility tariff, read-only once loaded.
#[must_use]
#[derive(Clone, Debug)]
pub struct RateStructure {
    pub energy_schedules: WeekSchedules,
    pub energy_rates: Vec<KilowattHourRate>,
    pub demand_schedules: WeekSchedules,
    pub time_of_use_demand_rates: Vec<KilowattRate>,

    /// Indexed by zero-based calendar month.
    pub flat_demand_rates: [KilowattRate; 12],

    pub net_metering: NetMetering,
}

impl RateStructure {
    /// Demand rates billed in the one-based calendar month.
    pub fn demand_rates(&self, month: u32) -> Result<DemandRates> {
        let flat = month
            .checked_sub(1)
            .and_then(|index| self.flat_demand_rates.get(index as usize))
            .with_context(|| format!("no flat demand rate for month #{month}"))?;
        Ok(DemandRates { time_of_use: self.time_of_use_demand_rates.clone(), flat: *flat })
    }
}

impl TryFrom<RateDocument> for RateStructure {
    type Error = Error;

    fn try_from(document: RateDocument) -> Result<Self> {
        let (energy_schedules, energy_rates) =
            convert_energy(document.energy).context("invalid energy rate structure")?;
        let (demand_schedules, time_of_use_demand_rates, flat_demand_rates) =
            convert_demand(document.demand).context("invalid demand rate structure")?;
        let net_metering = convert_net_metering(document.net_metering)?;
        Ok(Self {
            energy_schedules,
            energy_rates,
            demand_schedules,
            time_of_use_demand_rates,
            flat_demand_rates,
            net_metering,
        })
    }
}

fn convert_energy(document: EnergyDocument) -> Result<(WeekSchedules, Vec<KilowattHourRate>)> {
    let rates = dense_rates(document.rates).context("invalid energy rates")?;
    let schedules = WeekSchedules::try_new(document.weekday, document.weekend, rates.len())?;
    Ok((schedules, rates))
}

fn convert_demand(
    document: DemandDocument,
) -> Result<(WeekSchedules, Vec<KilowattRate>, [KilowattRate; 12])> {
    let rates = dense_rates(document.time_of_use_rates).context("invalid time-of-use rates")?;
    let schedules = WeekSchedules::try_new(document.weekday, document.weekend, rates.len())?;
    if let Some(unknown) =
        document.flat_rates.keys().find(|key| !MONTH_ABBREVIATIONS.contains(&key.as_str()))
    {
        bail!("unknown month `{unknown}` in the flat demand rates");
    }
    let mut flat_rates = [KilowattRate::default(); 12];
    for (month, rate) in (1..=12).zip(&mut flat_rates) {
        let abbreviation = month_abbreviation(month);
        *rate = *document
            .flat_rates
            .get(abbreviation)
            .with_context(|| format!("missing flat demand rate for `{abbreviation}`"))?;
    }
    Ok((schedules, rates, flat_rates))
}

fn convert_net_metering(document: NetMeteringDocument) -> Result<NetMetering> {
    if document.is_netted {
        if let Some(sell_price) = document.sell_price {
            warn!(
                ?sell_price,
                "the sell price is ignored when exports are netted against the buy rate",
            );
        }
        Ok(NetMetering::NettedAgainstBuyRate)
    } else {
        let sell_price = document
            .sell_price
            .context("fixed sell price net metering requires `energy sell price`")?;
        Ok(NetMetering::FixedSellPrice(sell_price))
    }
}

/// Turn a `period id → rate` map into a vector, requiring the ids to be `0..n`.
fn dense_rates<T>(rates: std::collections::BTreeMap<usize, T>) -> Result<Vec<T>> {
    ensure!(!rates.is_empty(), "at least one period is required");
    if let Some((expected, actual)) =
        rates.keys().enumerate().find(|(expected, actual)| expected != *actual)
    {
        bail!("period ids must be consecutive from zero: expected #{expected}, found #{actual}");
    }
    Ok(rates.into_values().collect_vec())
}
