//! Reference dispatch models: backward dynamic programming over quantized storage energy levels.

mod arbitrage;
mod bill;
mod grid;
mod storage;

pub use self::{arbitrage::DpArbitrageModel, bill::DpBillModel, storage::Storage};
use self::grid::EnergyGrid;
use crate::quantity::{currency::Dollars, energy::KilowattHours};

/// Optimal trajectory found by [`solve`].
struct Plan<A> {
    /// Energy flowing from the grid into the storage, per hour (negative is discharging).
    flows: Vec<KilowattHours>,

    actions: Vec<A>,

    cost: Dollars,
}

/// Find the cheapest sequence of storage flows.
///
/// `step_cost` returns the cost of the hour given the grid flow, and an arbitrary action attached
/// to the step, or [`None`] when the flow is not allowed in that hour. The storage must end at
/// least as full as it started.
///
/// Returns [`None`] when no allowed trajectory exists.
fn solve<A: Copy>(
    grid: &EnergyGrid,
    n_hours: usize,
    step_cost: impl Fn(usize, KilowattHours) -> Option<(Dollars, A)>,
) -> Option<Plan<A>> {
    let deltas: Vec<isize> = grid.deltas().collect();
    let levels = grid.levels();

    let mut future_costs: Vec<Option<Dollars>> = (0..grid.n_states())
        .map(|level| {
            (levels.contains(&level) && level >= grid.initial_level()).then_some(Dollars(0.0))
        })
        .collect();
    let mut backtracks = Vec::with_capacity(n_hours);

    for hour in (0..n_hours).rev() {
        // The step cost only depends on the flow, so compute it once per hour:
        let steps: Vec<Option<(Dollars, A)>> =
            deltas.iter().map(|delta| step_cost(hour, grid.grid_flow(*delta))).collect();

        let mut costs = vec![None; grid.n_states()];
        let mut hour_backtracks = vec![None; grid.n_states()];

        for level in levels.clone() {
            let best = deltas
                .iter()
                .zip(&steps)
                .filter_map(|(delta, step)| {
                    let (cost, action) = (*step)?;
                    let next_level =
                        level.checked_add_signed(*delta).filter(|next| levels.contains(next))?;
                    Some((cost + future_costs[next_level]?, next_level, *delta, action))
                })
                .min_by_key(|(cost, ..)| *cost);
            if let Some((cost, next_level, delta, action)) = best {
                costs[level] = Some(cost);
                hour_backtracks[level] = Some((next_level, delta, action));
            }
        }

        future_costs = costs;
        backtracks.push(hour_backtracks);
    }

    let mut level = grid.initial_level();
    let cost = future_costs[level]?;
    let mut flows = Vec::with_capacity(n_hours);
    let mut actions = Vec::with_capacity(n_hours);
    for hour_backtracks in backtracks.into_iter().rev() {
        let (next_level, delta, action) = hour_backtracks[level]?;
        flows.push(grid.grid_flow(delta));
        actions.push(action);
        level = next_level;
    }
    Some(Plan { flows, actions, cost })
}
