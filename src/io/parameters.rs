//! Named model parameters: `Energy_capacity`, `Power_rating` and anything the model understands.

use std::{collections::BTreeMap, fs, path::Path};

use crate::{
    core::dispatch::Parameters,
    prelude::*,
    quantity::{energy::KilowattHours, power::Kilowatts},
};

pub const ENERGY_CAPACITY: &str = "Energy_capacity";
pub const POWER_RATING: &str = "Power_rating";

/// Read a flat TOML table of named numbers.
pub fn read_file(path: &Path) -> Result<BTreeMap<String, f64>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read `{}`", path.display()))?;
    parse_table(&text).with_context(|| format!("invalid parameters in `{}`", path.display()))
}

fn parse_table(text: &str) -> Result<BTreeMap<String, f64>> {
    let table: toml::Table = toml::from_str(text)?;
    table
        .into_iter()
        .map(|(name, value)| -> Result<(String, f64)> {
            #[expect(clippy::cast_precision_loss)]
            let value = match value {
                toml::Value::Float(value) => value,
                toml::Value::Integer(value) => value as f64,
                other => bail!("`{name}` must be a number, got {}", other.type_str()),
            };
            Ok((name, value))
        })
        .collect()
}

/// Parse a `NAME=VALUE` command-line assignment.
pub fn parse_assignment(assignment: &str) -> Result<(String, f64)> {
    let (name, value) = assignment
        .split_once('=')
        .with_context(|| format!("expected `NAME=VALUE`, got `{assignment}`"))?;
    let name = name.trim();
    ensure!(!name.is_empty(), "the parameter name is empty in `{assignment}`");
    let value = value
        .trim()
        .parse()
        .with_context(|| format!("`{name}` must be a number, got `{value}`"))?;
    Ok((name.to_string(), value))
}

/// Split the sizing out of the named parameters.
pub fn into_parameters(mut named: BTreeMap<String, f64>) -> Result<Parameters> {
    let energy_capacity =
        named.remove(ENERGY_CAPACITY).with_context(|| format!("`{ENERGY_CAPACITY}` is required"))?;
    let power_rating =
        named.remove(POWER_RATING).with_context(|| format!("`{POWER_RATING}` is required"))?;
    Ok(Parameters::builder()
        .energy_capacity(KilowattHours(energy_capacity))
        .power_rating(Kilowatts(power_rating))
        .extra(named)
        .build())
}
