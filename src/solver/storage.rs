use std::ops::RangeInclusive;

use crate::{
    core::dispatch::Parameters,
    prelude::*,
    quantity::{energy::KilowattHours, power::Kilowatts},
};

/// Physical storage model of the reference solver.
#[derive(Clone, Debug)]
pub struct Storage {
    pub capacity: KilowattHours,
    pub power_rating: Kilowatts,
    pub round_trip_efficiency: f64,

    /// State-of-charge limits and the initial state as fractions of the capacity.
    pub min_state_of_charge: f64,
    pub max_state_of_charge: f64,
    pub initial_state_of_charge: f64,

    /// Number of intervals the capacity is quantized into.
    pub n_energy_levels: usize,

    /// Number of demand caps tried below the peak when minimizing a bill.
    pub n_demand_cap_steps: usize,
}

impl Storage {
    const ROUND_TRIP_EFFICIENCY: &'static str = "Round_trip_efficiency";
    const STATE_OF_CHARGE_INIT: &'static str = "State_of_charge_init";
    const STATE_OF_CHARGE_MIN: &'static str = "State_of_charge_min";
    const STATE_OF_CHARGE_MAX: &'static str = "State_of_charge_max";
    const ENERGY_LEVELS: &'static str = "Energy_levels";
    const DEMAND_CAP_STEPS: &'static str = "Demand_cap_steps";

    const KNOWN: [&'static str; 6] = [
        Self::ROUND_TRIP_EFFICIENCY,
        Self::STATE_OF_CHARGE_INIT,
        Self::STATE_OF_CHARGE_MIN,
        Self::STATE_OF_CHARGE_MAX,
        Self::ENERGY_LEVELS,
        Self::DEMAND_CAP_STEPS,
    ];

    const TOLERANCE: f64 = 1e-9;

    /// Quantized energy levels within the state-of-charge limits, out of [`Self::n_energy_levels`].
    #[expect(clippy::cast_precision_loss)]
    #[expect(clippy::cast_possible_truncation)]
    #[expect(clippy::cast_sign_loss)]
    pub fn energy_levels(&self) -> RangeInclusive<usize> {
        let n_levels = self.n_energy_levels as f64;
        let min_level = (self.min_state_of_charge * n_levels - Self::TOLERANCE).ceil() as usize;
        let max_level = (self.max_state_of_charge * n_levels + Self::TOLERANCE).floor() as usize;
        min_level..=max_level
    }

    /// Initial state of charge rounded to the nearest allowed level.
    #[expect(clippy::cast_precision_loss)]
    #[expect(clippy::cast_possible_truncation)]
    #[expect(clippy::cast_sign_loss)]
    pub fn initial_energy_level(&self) -> usize {
        let levels = self.energy_levels();
        ((self.initial_state_of_charge * self.n_energy_levels as f64).round() as usize)
            .clamp(*levels.start(), *levels.end())
    }
}

impl TryFrom<&Parameters> for Storage {
    type Error = Error;

    fn try_from(parameters: &Parameters) -> Result<Self> {
        if let Some(unknown) =
            parameters.extra.keys().find(|name| !Self::KNOWN.contains(&name.as_str()))
        {
            bail!("unknown model parameter `{unknown}`, expected one of {:?}", Self::KNOWN);
        }
        let get =
            |name: &str, default: f64| parameters.extra.get(name).copied().unwrap_or(default);

        let this = Self {
            capacity: parameters.energy_capacity,
            power_rating: parameters.power_rating,
            round_trip_efficiency: get(Self::ROUND_TRIP_EFFICIENCY, 0.85),
            min_state_of_charge: get(Self::STATE_OF_CHARGE_MIN, 0.0),
            max_state_of_charge: get(Self::STATE_OF_CHARGE_MAX, 1.0),
            initial_state_of_charge: get(Self::STATE_OF_CHARGE_INIT, 0.5),
            n_energy_levels: count(Self::ENERGY_LEVELS, get(Self::ENERGY_LEVELS, 100.0))?,
            n_demand_cap_steps: count(
                Self::DEMAND_CAP_STEPS,
                get(Self::DEMAND_CAP_STEPS, 20.0),
            )?,
        };

        ensure!(
            this.capacity.0 > 0.0,
            "the energy capacity must be positive, got {}",
            this.capacity,
        );
        ensure!(
            this.power_rating.0 >= 0.0,
            "the power rating must not be negative, got {}",
            this.power_rating,
        );
        ensure!(
            this.round_trip_efficiency > 0.0 && this.round_trip_efficiency <= 1.0,
            "the round-trip efficiency must be in (0, 1], got {}",
            this.round_trip_efficiency,
        );
        ensure!(
            0.0 <= this.min_state_of_charge
                && this.min_state_of_charge <= this.initial_state_of_charge
                && this.initial_state_of_charge <= this.max_state_of_charge
                && this.max_state_of_charge <= 1.0,
            "the states of charge must satisfy 0 ≤ min ({}) ≤ init ({}) ≤ max ({}) ≤ 1",
            this.min_state_of_charge,
            this.initial_state_of_charge,
            this.max_state_of_charge,
        );
        ensure!(this.n_energy_levels != 0, "at least one energy level is required");
        ensure!(
            !this.energy_levels().is_empty(),
            "no energy level out of {} fits between the states of charge {} and {}",
            this.n_energy_levels,
            this.min_state_of_charge,
            this.max_state_of_charge,
        );
        Ok(this)
    }
}

#[expect(clippy::cast_possible_truncation)]
#[expect(clippy::cast_sign_loss)]
fn count(name: &str, value: f64) -> Result<usize> {
    ensure!(
        value >= 0.0 && value.fract() == 0.0 && value <= 1e6,
        "`{name}` must be a non-negative integer, got {value}",
    );
    Ok(value as usize)
}
