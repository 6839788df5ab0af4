//! Economic and technical key performance indicators of a simulated energy system.
use crate::carrier::EnergyVector;
use crate::model::Model;
use crate::simulation::results::SimulationResults;
use crate::units::Capacity;
use anyhow::Result;
use indexmap::IndexMap;
use log::info;
use serde::Serialize;

pub mod costs;
use costs::{CostMatrix, calculate_cost_matrix};
pub mod system;
use system::{CarrierKpis, SystemKpis, calculate_system_kpis};

/// A row of the scalar matrix: the flow summary and capacities of one asset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalarRow {
    /// The asset's label
    pub label: String,
    /// Capacity installed before the simulation
    #[serde(rename = "installedCap")]
    pub installed_cap: Capacity,
    /// Capacity added by the optimiser
    #[serde(rename = "optimizedAddCap")]
    pub optimized_add_cap: Capacity,
    /// Total flow over the simulated period
    pub total_flow: f64,
    /// Total flow scaled to a year
    pub annual_total_flow: f64,
    /// Largest flow in a time step
    pub peak_flow: f64,
    /// Mean flow
    pub average_flow: f64,
}

/// All KPIs of a simulation
#[derive(Debug, Clone, PartialEq)]
pub struct KpiResults {
    /// Cost rows of every asset, provider and fixed cost
    pub cost_matrix: CostMatrix,
    /// Flow summaries of every asset
    pub scalar_matrix: Vec<ScalarRow>,
    /// KPIs of the whole system
    pub scalars: SystemKpis,
    /// KPIs of each carrier
    pub scalars_per_carrier: IndexMap<EnergyVector, CarrierKpis>,
}

/// Evaluate the results of a simulation
pub fn evaluate(model: &Model, results: &SimulationResults) -> Result<KpiResults> {
    let cost_matrix = calculate_cost_matrix(model, results)?;
    let scalar_matrix = model
        .assets
        .iter()
        .map(|asset| {
            let asset_results = results.get(asset.id);
            ScalarRow {
                label: asset.label.to_string(),
                installed_cap: asset.main_component().installed_cap,
                optimized_add_cap: asset_results.optimized_add_cap,
                total_flow: asset_results.summary.total_flow,
                annual_total_flow: asset_results.summary.annual_total_flow,
                peak_flow: asset_results.summary.peak_flow,
                average_flow: asset_results.summary.average_flow,
            }
        })
        .collect();

    let (scalars, scalars_per_carrier) =
        calculate_system_kpis(model, results, cost_matrix.totals());
    info!(
        "Total costs: {:.2} {} (annuity {:.2} {})",
        scalars.costs.cost_total.value(),
        model.economic_data.currency,
        scalars.costs.annuity_total.value(),
        model.economic_data.currency
    );

    Ok(KpiResults {
        cost_matrix,
        scalar_matrix,
        scalars,
        scalars_per_carrier,
    })
}
