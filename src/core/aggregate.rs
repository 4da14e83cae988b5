use std::collections::{BTreeMap, btree_map::Entry};

use chrono::NaiveDateTime;

use crate::{
    core::{bill::PeriodBillRecord, harness::MonthRevenue, harness::Scenario},
    prelude::*,
};

/// Reason why a month could not be valued.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub window_start: NaiveDateTime,
    pub reason: String,
}

pub type Outcome<T> = Result<T, Failure>;

/// Results indexed by one-based calendar month, in calendar order.
#[must_use]
#[derive(Clone, Debug)]
pub struct MonthlySeries<T>(BTreeMap<u32, Outcome<T>>);

impl<T> Default for MonthlySeries<T> {
    fn default() -> Self {
        Self(BTreeMap::new())
    }
}

impl<T> MonthlySeries<T> {
    pub fn insert(&mut self, month: u32, outcome: Outcome<T>) -> Result {
        ensure!((1..=12).contains(&month), "month #{month} is out of range");
        match self.0.entry(month) {
            Entry::Vacant(entry) => {
                entry.insert(outcome);
                Ok(())
            }
            Entry::Occupied(_) => bail!("month #{month} is already recorded"),
        }
    }

    pub fn try_from_iter(outcomes: impl IntoIterator<Item = (u32, Outcome<T>)>) -> Result<Self> {
        let mut series = Self::default();
        for (month, outcome) in outcomes {
            series.insert(month, outcome)?;
        }
        Ok(series)
    }

    pub fn get(&self, month: u32) -> Option<&Outcome<T>> {
        self.0.get(&month)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Outcome<T>)> {
        self.0.iter().map(|(month, outcome)| (*month, outcome))
    }

    pub fn months(&self) -> impl Iterator<Item = u32> {
        self.0.keys().copied()
    }

    pub fn n_failures(&self) -> usize {
        self.0.values().filter(|outcome| outcome.is_err()).count()
    }
}

/// Monthly-direct and daily-reconciled bills side by side.
#[must_use]
#[derive(Clone, Debug, Default)]
pub struct BtmReport {
    pub monthly: MonthlySeries<PeriodBillRecord>,
    pub daily: MonthlySeries<PeriodBillRecord>,
}

#[must_use]
#[derive(Clone, Debug, Default)]
pub struct ValuationReport {
    pub scenarios: BTreeMap<Scenario, MonthlySeries<MonthRevenue>>,
}

impl ValuationReport {
    /// Union of the months present in any scenario.
    pub fn months(&self) -> Vec<u32> {
        let mut months: Vec<u32> =
            self.scenarios.values().flat_map(MonthlySeries::months).collect();
        months.sort_unstable();
        months.dedup();
        months
    }
}
