//! Extracting per-asset and per-bus results from the solution of the optimisation.
use super::optimisation::{ComponentRole, Side};
use super::solver::Solution;
use crate::asset::{Asset, AssetID, AssetKind, AssetLabel, Storage};
use crate::bus::BusID;
use crate::finance::DAYS_PER_YEAR;
use crate::model::Model;
use crate::quantity::TimeSeries;
use crate::units::Capacity;
use indexmap::IndexMap;
use serde::Serialize;

/// A flow along with its summary statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowSummary {
    /// The flow in every time step
    pub flow: TimeSeries,
    /// Sum of the flow over the simulated period
    pub total_flow: f64,
    /// Total flow scaled to a year
    pub annual_total_flow: f64,
    /// Largest flow in a time step
    pub peak_flow: f64,
    /// Mean flow
    pub average_flow: f64,
}

impl FlowSummary {
    /// Summarise a flow over a horizon of `days` days
    pub fn new(flow: TimeSeries, days: u32) -> Self {
        let total_flow = flow.sum();
        Self {
            annual_total_flow: total_flow * DAYS_PER_YEAR / f64::from(days),
            peak_flow: flow.max(),
            average_flow: flow.mean(),
            total_flow,
            flow,
        }
    }
}

/// Results for a power sub-asset of a storage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoragePowerResults {
    /// Flow into (charging) or out of (discharging) the storage
    #[serde(flatten)]
    pub summary: FlowSummary,
    /// Capacity added by the optimiser
    #[serde(rename = "optimizedAddCap")]
    pub optimized_add_cap: Capacity,
}

/// Results for the energy capacity of a storage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageCapacityResults {
    /// Content at the end of every time step
    pub storage_content: TimeSeries,
    /// Content relative to the total capacity
    pub timeseries_soc: TimeSeries,
    /// Capacity added by the optimiser
    #[serde(rename = "optimizedAddCap")]
    pub optimized_add_cap: Capacity,
}

/// Results for the sub-assets of a storage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageResults {
    /// Charging power
    pub input_power: StoragePowerResults,
    /// Discharging power
    pub output_power: StoragePowerResults,
    /// Energy capacity
    pub storage_capacity: StorageCapacityResults,
}

/// The results for one asset
#[derive(Debug, Clone, PartialEq)]
pub struct AssetResults {
    /// The asset
    pub asset: AssetID,
    /// Flow from each input bus
    pub input_flows: Vec<TimeSeries>,
    /// Flow into each output bus
    pub output_flows: Vec<TimeSeries>,
    /// Summary of the flow which characterises the asset
    pub summary: FlowSummary,
    /// Capacity added by the optimiser to the main component
    pub optimized_add_cap: Capacity,
    /// Sub-asset results of a storage
    pub storage: Option<StorageResults>,
}

impl AssetResults {
    /// The total flow from all input buses
    pub fn total_input(&self) -> f64 {
        self.input_flows.iter().map(TimeSeries::sum).sum()
    }

    /// The total flow into all output buses
    pub fn total_output(&self) -> f64 {
        self.output_flows.iter().map(TimeSeries::sum).sum()
    }
}

/// The results of a simulation
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResults {
    /// Results per asset, in the order of the asset pool
    pub assets: IndexMap<AssetID, AssetResults>,
    /// Flow of every asset into each bus (negative when the asset draws from the bus)
    pub bus_flows: IndexMap<BusID, IndexMap<AssetLabel, TimeSeries>>,
    /// Shadow price of each bus balance in every time step
    pub bus_prices: IndexMap<BusID, Vec<f64>>,
}

impl SimulationResults {
    /// Get the results of an asset
    pub fn get(&self, id: AssetID) -> &AssetResults {
        &self.assets[&id]
    }
}

/// Sum the flows of several ports element-wise
fn sum_flows(flows: &[TimeSeries], periods: usize) -> TimeSeries {
    flows
        .iter()
        .fold(TimeSeries::constant(0.0, periods), |acc, flow| acc.plus(flow))
}

/// Extract the results of a storage's sub-assets
fn storage_results(
    solution: &Solution,
    asset: &Asset,
    storage: &Storage,
    input_flows: &[TimeSeries],
    output_flows: &[TimeSeries],
    days: u32,
) -> StorageResults {
    let add_cap = solution.added_capacity(asset.id, ComponentRole::Capacity);
    let content = TimeSeries(solution.storage_content(asset.id).unwrap_or_default());
    let total_cap = storage.capacity.installed_cap.value() + add_cap;
    let soc = if total_cap > 0.0 {
        content.scale(1.0 / total_cap)
    } else {
        TimeSeries::constant(0.0, content.len())
    };

    StorageResults {
        input_power: StoragePowerResults {
            summary: FlowSummary::new(input_flows[0].clone(), days),
            optimized_add_cap: Capacity(
                solution.added_capacity(asset.id, ComponentRole::InputPower),
            ),
        },
        output_power: StoragePowerResults {
            summary: FlowSummary::new(output_flows[0].clone(), days),
            optimized_add_cap: Capacity(
                solution.added_capacity(asset.id, ComponentRole::OutputPower),
            ),
        },
        storage_capacity: StorageCapacityResults {
            storage_content: content,
            timeseries_soc: soc,
            optimized_add_cap: Capacity(add_cap),
        },
    }
}

/// Extract the results of a single asset.
///
/// The flow which characterises an asset is the sum of its inputs for sinks, the sum of its
/// outputs for sources, the first output for transformers and the discharge for storages.
fn asset_results(solution: &Solution, asset: &Asset, periods: usize, days: u32) -> AssetResults {
    let input_flows: Vec<_> = (0..asset.inputs.len())
        .map(|port| TimeSeries(solution.flow(asset.id, Side::Input, port)))
        .collect();
    let output_flows: Vec<_> = (0..asset.outputs.len())
        .map(|port| TimeSeries(solution.flow(asset.id, Side::Output, port)))
        .collect();

    let defining_flow = match &asset.kind {
        AssetKind::Sink(_) => sum_flows(&input_flows, periods),
        AssetKind::Source(_) => sum_flows(&output_flows, periods),
        AssetKind::Transformer(_) | AssetKind::Storage(_) => {
            output_flows.first().cloned().unwrap_or_default()
        }
    };

    let storage = asset.as_storage().map(|storage| {
        storage_results(solution, asset, storage, &input_flows, &output_flows, days)
    });

    AssetResults {
        asset: asset.id,
        summary: FlowSummary::new(defining_flow, days),
        optimized_add_cap: Capacity(solution.added_capacity(asset.id, ComponentRole::Capacity)),
        storage,
        input_flows,
        output_flows,
    }
}

/// Extract the results of every asset and bus from the solution
pub fn extract_results(model: &Model, solution: &Solution) -> SimulationResults {
    let periods = model.periods();
    let assets: IndexMap<_, _> = model
        .assets
        .iter()
        .map(|asset| {
            let results = asset_results(solution, asset, periods, model.days());
            (asset.id, results)
        })
        .collect();

    let mut bus_flows: IndexMap<BusID, IndexMap<AssetLabel, TimeSeries>> = model
        .buses
        .keys()
        .map(|bus_id| (bus_id.clone(), IndexMap::new()))
        .collect();
    for asset in model.assets.iter() {
        let results = &assets[&asset.id];
        let signed_flows = asset
            .outputs
            .iter()
            .zip(results.output_flows.iter().cloned())
            .chain(
                asset
                    .inputs
                    .iter()
                    .zip(results.input_flows.iter().map(|flow| flow.scale(-1.0))),
            );
        for (bus_id, flow) in signed_flows {
            if let Some(flows) = bus_flows.get_mut(bus_id) {
                let entry = flows
                    .entry(asset.label.clone())
                    .or_insert_with(|| TimeSeries::constant(0.0, periods));
                *entry = entry.plus(&flow);
            }
        }
    }

    let mut bus_prices: IndexMap<BusID, Vec<f64>> = IndexMap::new();
    for (bus_id, _t, price) in solution.iter_bus_prices() {
        bus_prices.entry(bus_id.clone()).or_default().push(price);
    }

    SimulationResults {
        assets,
        bus_flows,
        bus_prices,
    }
}
