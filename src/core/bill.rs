use derive_more::{Add, AddAssign};

use crate::{core::runner::DispatchResult, quantity::currency::Dollars, tariff::DemandCharge};

#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Add, AddAssign)]
pub struct Bill {
    pub energy: Dollars,
    pub demand: DemandCharge,
}

impl Bill {
    pub fn total(self) -> Dollars {
        self.energy + self.demand.total()
    }
}

/// Monthly bill with and without storage.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PeriodBillRecord {
    pub month: u32,
    pub with_storage: Bill,
    pub without_storage: Bill,
}

impl PeriodBillRecord {
    /// Record of a month solved directly as a single window with billed demand rates.
    pub const fn direct(result: &DispatchResult) -> Self {
        Self {
            month: result.window.month,
            with_storage: result.with_storage,
            without_storage: result.without_storage,
        }
    }

    pub fn savings(&self) -> Dollars {
        self.without_storage.total() - self.with_storage.total()
    }
}
