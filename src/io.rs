//! File inputs and outputs.

pub mod export;
mod hourly;
pub mod parameters;
pub mod prices;
pub mod profile;

use std::{fs::File, io::BufReader, path::Path};

use crate::{
    prelude::*,
    tariff::{RateDocument, RateStructure},
};

#[instrument(skip_all, name = "Reading the rate structure…", fields(path = %path.display()))]
pub fn read_rate_structure(path: &Path) -> Result<RateStructure> {
    let file = File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
    let document: RateDocument = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse `{}`", path.display()))?;
    let rates = RateStructure::try_from(document)
        .with_context(|| format!("invalid rate structure in `{}`", path.display()))?;
    info!(
        n_energy_periods = rates.energy_rates.len(),
        n_demand_periods = rates.time_of_use_demand_rates.len(),
        net_metering = ?rates.net_metering,
        "Loaded the rate structure",
    );
    Ok(rates)
}
