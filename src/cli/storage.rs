//! Storage sizing and model parameters.

use std::{collections::BTreeMap, path::PathBuf};

use clap::Parser;

use crate::{
    core::dispatch::Parameters,
    io::parameters::{ENERGY_CAPACITY, POWER_RATING, into_parameters, parse_assignment, read_file},
    prelude::*,
    solver::Storage,
};

#[must_use]
#[derive(Parser)]
pub struct StorageArgs {
    /// Energy capacity in kilowatt-hours, overrides `Energy_capacity`.
    #[clap(long = "energy-capacity-kwh", env = "ENERGY_CAPACITY_KWH")]
    pub energy_capacity: Option<f64>,

    /// Power rating in kilowatts, overrides `Power_rating`.
    #[clap(long = "power-rating-kw", env = "POWER_RATING_KW")]
    pub power_rating: Option<f64>,

    /// TOML file with named model parameters.
    #[clap(long = "parameters-file", env = "PARAMETERS_FILE")]
    pub parameters_file: Option<PathBuf>,

    /// Model parameter, overrides the file.
    #[clap(long = "parameter", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub parameters: Vec<(String, f64)>,
}

impl StorageArgs {
    /// Merge the file, `--parameter` and the dedicated sizing options, in increasing priority.
    pub fn parameters(&self) -> Result<Parameters> {
        let mut named = match &self.parameters_file {
            Some(path) => read_file(path)?,
            None => BTreeMap::new(),
        };
        named.extend(self.parameters.iter().cloned());
        if let Some(energy_capacity) = self.energy_capacity {
            named.insert(ENERGY_CAPACITY.to_string(), energy_capacity);
        }
        if let Some(power_rating) = self.power_rating {
            named.insert(POWER_RATING.to_string(), power_rating);
        }
        let parameters = into_parameters(named)?;
        info!(
            energy_capacity = %parameters.energy_capacity,
            power_rating = %parameters.power_rating,
            extra = ?parameters.extra,
            "Model parameters",
        );
        Ok(parameters)
    }

    pub fn storage(&self) -> Result<Storage> {
        Storage::try_from(&self.parameters()?)
    }
}
