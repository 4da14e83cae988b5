use clap::Parser;

use crate::{core::period::Period, prelude::*};

#[must_use]
#[derive(Parser)]
pub struct CalendarArgs {
    /// Calendar year of the input profiles and prices.
    #[clap(long, env = "YEAR")]
    pub year: i32,

    /// Only value these months (one-based), all twelve by default.
    #[clap(long = "months", value_delimiter = ',', num_args = 1..)]
    pub months: Vec<u32>,
}

impl CalendarArgs {
    pub fn periods(&self) -> Result<Vec<Period>> {
        if self.months.is_empty() {
            return Period::year(self.year);
        }
        let mut months = self.months.clone();
        months.sort_unstable();
        months.dedup();
        months.into_iter().map(|month| Period::try_new(self.year, month)).collect()
    }
}
