//! Functionality for running the energy system simulation.
use crate::kpi::{KpiResults, evaluate};
use crate::model::Model;
use crate::output::write_outputs;
use crate::units::Money;
use anyhow::{Context, Result};
use log::info;
use std::path::Path;

pub mod optimisation;
use optimisation::perform_optimisation;
pub mod results;
use results::{SimulationResults, extract_results};
pub mod side_constraints;
pub mod solver;

/// Everything produced by a simulation
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    /// Value of the objective function of the optimisation
    pub objective_value: Money,
    /// Flows and capacities
    pub results: SimulationResults,
    /// Evaluation of the results
    pub kpi: KpiResults,
}

/// Optimise the model and evaluate the results.
///
/// # Arguments:
///
/// * `model` - The processed model
pub fn simulate(model: &Model) -> Result<SimulationOutcome> {
    info!(
        "Optimising {} assets on {} buses over {} time steps",
        model.assets.len(),
        model.buses.len(),
        model.periods()
    );
    let solution = perform_optimisation(model)?;
    let objective_value = solution.objective_value();
    info!("Objective value: {objective_value}");

    let results = extract_results(model, &solution);
    let kpi = evaluate(model, &results).context("Could not evaluate the results")?;

    Ok(SimulationOutcome {
        objective_value,
        results,
        kpi,
    })
}

/// Run the simulation and write the results.
///
/// # Arguments:
///
/// * `model` - The model to run
/// * `output_path` - The folder to which output files will be written
/// * `debug_model` - Whether to write additional information (e.g. duals) to output files
pub fn run(model: &Model, output_path: &Path, debug_model: bool) -> Result<()> {
    let outcome = simulate(model)?;
    write_outputs(output_path, model, &outcome, debug_model)?;

    Ok(())
}
