use std::ops::RangeInclusive;

use crate::{
    quantity::{energy::KilowattHours, time::Hours},
    solver::Storage,
};

/// Quantized stored energy, the state space of the solver.
///
/// Level `i` holds `i × quantum` of energy. Transitions are limited to one hour at the rated
/// power, measured at the grid side.
#[derive(Clone, Debug)]
pub struct EnergyGrid {
    quantum: KilowattHours,
    n_states: usize,
    levels: RangeInclusive<usize>,
    initial_level: usize,

    /// One-way efficiency, the square root of the round-trip one.
    efficiency: f64,

    max_charge_steps: usize,
    max_discharge_steps: usize,
}

impl EnergyGrid {
    const TOLERANCE: f64 = 1e-9;

    #[expect(clippy::cast_precision_loss)]
    #[expect(clippy::cast_possible_truncation)]
    #[expect(clippy::cast_sign_loss)]
    pub fn new(storage: &Storage) -> Self {
        let quantum = storage.capacity / storage.n_energy_levels as f64;
        let efficiency = storage.round_trip_efficiency.sqrt();
        let max_grid_energy = storage.power_rating * Hours::ONE;

        Self {
            quantum,
            n_states: storage.n_energy_levels + 1,
            levels: storage.energy_levels(),
            initial_level: storage.initial_energy_level(),
            efficiency,
            max_charge_steps: (max_grid_energy * efficiency / quantum + Self::TOLERANCE).floor()
                as usize,
            max_discharge_steps: (max_grid_energy / efficiency / quantum + Self::TOLERANCE).floor()
                as usize,
        }
    }

    pub const fn n_states(&self) -> usize {
        self.n_states
    }

    pub const fn initial_level(&self) -> usize {
        self.initial_level
    }

    /// Allowed levels within the state-of-charge limits.
    pub fn levels(&self) -> RangeInclusive<usize> {
        self.levels.clone()
    }

    /// Allowed level changes within one hour.
    #[expect(clippy::cast_possible_wrap)]
    pub const fn deltas(&self) -> RangeInclusive<isize> {
        -(self.max_discharge_steps as isize)..=(self.max_charge_steps as isize)
    }

    /// Energy drawn from the grid to change the level by `delta` (negative when supplying).
    #[expect(clippy::cast_precision_loss)]
    pub fn grid_flow(&self, delta: isize) -> KilowattHours {
        let stored = self.quantum * delta as f64;
        if delta >= 0 { stored / self.efficiency } else { stored * self.efficiency }
    }
}
