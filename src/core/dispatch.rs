//! Narrow contract between the decomposition engine and a dispatch model.
//!
//! The engine never performs dispatch math itself: it slices inputs into windows, hands every
//! window to a model implementing [`ArbitrageModel`] or [`BillModel`], and post-processes the
//! outcome.

use std::collections::BTreeMap;

use bon::Builder;
use chrono::NaiveDateTime;

use crate::{
    core::{aggregate::Failure, bill::Bill},
    prelude::*,
    quantity::{
        currency::Dollars,
        energy::KilowattHours,
        power::Kilowatts,
        rate::KilowattHourRate,
    },
    tariff::{DemandRates, NetMetering, TariffError, TouPeriod},
};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no feasible dispatch for the window starting at {start}")]
    Infeasible { start: NaiveDateTime },

    #[error("the window is misaligned: expected {expected} samples, got {actual}")]
    Misaligned { expected: usize, actual: usize },

    #[error(transparent)]
    Tariff(#[from] TariffError),
}

impl DispatchError {
    /// Infeasibility only fails the owning month, everything else aborts the run.
    pub fn into_failure(self) -> Result<Failure> {
        match self {
            Self::Infeasible { start } => {
                Ok(Failure { window_start: start, reason: self.to_string() })
            }
            _ => Err(self.into()),
        }
    }
}

/// Storage sizing and any additional named model parameters.
#[derive(Clone, Debug, Builder)]
pub struct Parameters {
    pub energy_capacity: KilowattHours,
    pub power_rating: Kilowatts,

    #[builder(default)]
    pub extra: BTreeMap<String, f64>,
}

/// Market prices over a single window.
#[derive(Copy, Clone, Debug)]
pub struct MarketWindow<'a> {
    pub start: NaiveDateTime,
    pub energy_price: &'a [KilowattHourRate],
    pub regulation_up_price: &'a [KilowattHourRate],
    pub regulation_down_price: &'a [KilowattHourRate],
}

impl MarketWindow<'_> {
    pub const fn len(&self) -> usize {
        self.energy_price.len()
    }

    pub fn check_len(&self, expected: usize) -> Result<(), DispatchError> {
        let actual = self.len();
        if actual == expected
            && self.regulation_up_price.len() == expected
            && self.regulation_down_price.len() == expected
        {
            Ok(())
        } else {
            Err(DispatchError::Misaligned { expected, actual })
        }
    }
}

/// Wholesale arbitrage model.
pub trait ArbitrageModel: Sync {
    type Schedule: MarketSchedule;

    fn solve(&self, window: &MarketWindow<'_>) -> Result<Self::Schedule, DispatchError>;
}

/// Solved market dispatch schedule.
///
/// Only a solved schedule can be re-scored, so there is no way to reprocess before solving.
pub trait MarketSchedule: Send {
    /// Revenue against the prices the schedule was solved on.
    fn gross_revenue(&self) -> Dollars;

    /// Revenue of the same fixed schedule against other prices, without re-optimizing.
    fn reprocess(&self, actual: &MarketWindow<'_>) -> Result<Dollars, DispatchError>;
}

/// Behind-the-meter inputs of a single window.
#[derive(Copy, Clone, Debug)]
pub struct BillingWindow<'a> {
    pub start: NaiveDateTime,
    pub load: &'a [Kilowatts],
    pub pv: &'a [Kilowatts],
    pub energy_periods: &'a [TouPeriod],
    pub demand_periods: &'a [TouPeriod],
    pub energy_rates: &'a [KilowattHourRate],

    /// Zeroed when the demand charge is billed later for the whole period.
    pub demand_rates: &'a DemandRates,

    pub net_metering: NetMetering,
}

impl BillingWindow<'_> {
    pub const fn len(&self) -> usize {
        self.load.len()
    }

    /// Net load without storage.
    pub fn baseline(&self) -> Vec<Kilowatts> {
        self.load.iter().zip(self.pv).map(|(load, pv)| *load - *pv).collect()
    }
}

#[derive(Clone, Debug)]
pub struct BillOutcome {
    pub with_storage: Bill,
    pub without_storage: Bill,
    pub net_load_with_storage: Vec<Kilowatts>,
}

/// Behind-the-meter bill minimization model.
pub trait BillModel: Sync {
    fn solve(&self, window: &BillingWindow<'_>) -> Result<BillOutcome, DispatchError>;
}
