//! Handing the optimisation problem to HiGHS and reading back the solution.
use super::optimisation::constraints::ConstraintKeys;
use super::optimisation::{ComponentRole, Side, VariableMap};
use crate::asset::AssetID;
use crate::bus::BusID;
use crate::error::SimulationError;
use crate::units::Money;
use anyhow::Result;
use highs::{HighsModelStatus, SolvedModel};
use log::debug;

/// Solve the model, returning an error unless an optimal solution was found
pub fn solve_optimal(model: highs::Model) -> Result<SolvedModel> {
    let solved = model
        .try_solve()
        .map_err(|status| SimulationError::LpSolverError(format!("{status:?}")))?;

    match solved.status() {
        HighsModelStatus::Optimal => Ok(solved),
        HighsModelStatus::Infeasible => Err(SimulationError::LpInfeasible.into()),
        HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
            Err(SimulationError::LpUnbounded.into())
        }
        status => Err(SimulationError::LpSolverError(format!("{status:?}")).into()),
    }
}

/// The solution to the optimisation problem
pub struct Solution {
    columns: Vec<f64>,
    duals: Vec<f64>,
    objective_value: Money,
    variables: VariableMap,
    constraint_keys: ConstraintKeys,
}

impl Solution {
    /// Read the primal and dual values from a solved model
    pub fn new(
        solved: &SolvedModel,
        variables: VariableMap,
        constraint_keys: ConstraintKeys,
    ) -> Self {
        let solution = solved.get_solution();
        let objective_value = Money(solved.objective_value());
        debug!(
            "Optimal solution found with {} flow and {} investment variables (objective: {})",
            variables.num_flow_vars(),
            variables.num_invest_vars(),
            objective_value.value()
        );

        Self {
            columns: solution.columns().to_vec(),
            duals: solution.dual_rows().to_vec(),
            objective_value,
            variables,
            constraint_keys,
        }
    }

    /// The value of the objective function
    pub fn objective_value(&self) -> Money {
        self.objective_value
    }

    /// The flow of a port in every time step
    pub fn flow(&self, asset: AssetID, side: Side, port: usize) -> Vec<f64> {
        self.variables
            .flows(asset, side, port)
            .iter()
            .map(|var| var.value(&self.columns))
            .collect()
    }

    /// The capacity added to a component by the optimiser (zero if its capacity is fixed)
    pub fn added_capacity(&self, asset: AssetID, role: ComponentRole) -> f64 {
        self.variables
            .invest(asset, role)
            .map_or(0.0, |var| var.value(&self.columns))
    }

    /// The content of a storage at the end of every time step
    pub fn storage_content(&self, asset: AssetID) -> Option<Vec<f64>> {
        let vars = self.variables.storage(asset)?;
        Some(
            vars.content
                .iter()
                .map(|var| var.value(&self.columns))
                .collect(),
        )
    }

    /// Iterate over the shadow price of each bus balance
    pub fn iter_bus_prices(&self) -> impl Iterator<Item = (&BusID, usize, f64)> {
        self.constraint_keys
            .bus_balance_keys
            .zip_duals(&self.duals)
            .map(|((bus_id, t), price)| (bus_id, *t, price))
    }
}
