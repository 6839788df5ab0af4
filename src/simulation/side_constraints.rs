//! System-wide constraints which are added on top of the energy system.
//!
//! Each constraint is only added when it is active in the model's constraint settings. All flows
//! are weighted with the electricity equivalent of their carrier.
use super::optimisation::{Side, Variable, VariableMap};
use crate::asset::{Asset, AssetGroup, AssetKind};
use crate::model::Model;
use highs::RowProblem as Problem;
use log::{info, warn};

/// Add all active side constraints to the problem
pub fn add_side_constraints(problem: &mut Problem, variables: &VariableMap, model: &Model) {
    let constraints = &model.constraints;
    if constraints.minimal_renewable_share > 0.0 {
        add_renewable_share_constraint(problem, variables, model);
    }
    if let Some(cap) = constraints.maximum_emissions {
        add_emission_constraint(problem, variables, model, cap);
    }
    if constraints.minimal_degree_of_autonomy > 0.0 {
        add_degree_of_autonomy_constraint(problem, variables, model);
    }
    if constraints.net_zero_energy {
        add_net_zero_energy_constraint(problem, variables, model);
    }
}

/// Whether the asset generates energy for the system: local producers and provider consumption
fn is_generation(asset: &Asset) -> bool {
    matches!(
        asset.group,
        AssetGroup::Production | AssetGroup::ProviderConsumption(_)
    ) && matches!(asset.kind, AssetKind::Source(_))
}

/// All flow variables on one side of an asset, one entry per port and time step
fn side_flows<'a>(
    variables: &'a VariableMap,
    asset: &Asset,
    side: Side,
) -> impl Iterator<Item = Variable> + 'a {
    let ports = match side {
        Side::Input => asset.inputs.len(),
        Side::Output => asset.outputs.len(),
    };
    let id = asset.id;
    (0..ports).flat_map(move |port| variables.flows(id, side, port).iter().copied())
}

/// Add the minimal renewable share constraint.
///
/// The renewable generation must be at least the given share of the total generation:
/// `Σ w·(re − s*)·f ≥ 0`.
fn add_renewable_share_constraint(problem: &mut Problem, variables: &VariableMap, model: &Model) {
    let share = model.constraints.minimal_renewable_share;
    let mut row = Vec::new();
    for (asset, source) in model.assets.iter_sources() {
        if !is_generation(asset) {
            continue;
        }
        let coeff = asset.energy_vector.weight().value() * (source.renewable_share.value() - share);
        row.extend(side_flows(variables, asset, Side::Output).map(|var| (var.col(), coeff)));
    }

    info!("Adding constraint: minimal renewable share of {share}");
    problem.add_row(0.0.., row);
}

/// Add the maximum emissions constraint over the simulated period
fn add_emission_constraint(
    problem: &mut Problem,
    variables: &VariableMap,
    model: &Model,
    cap: f64,
) {
    let has_clean_alternative = model.assets.iter_sources().any(|(asset, source)| {
        is_generation(asset)
            && source.emission_factor <= 0.0
            && source.capacity.optimize_cap
            && source.capacity.maximum_cap.is_none()
    });
    if !has_clean_alternative {
        warn!(
            "The maximum emissions constraint may be infeasible: there is no emission-free asset \
            whose capacity is optimised without a maximum capacity"
        );
    }

    let mut row = Vec::new();
    for (asset, source) in model.assets.iter_sources() {
        if source.emission_factor > 0.0 {
            row.extend(
                side_flows(variables, asset, Side::Output)
                    .map(|var| (var.col(), source.emission_factor)),
            );
        }
    }

    info!("Adding constraint: maximum emissions of {cap}");
    problem.add_row(..=cap, row);
}

/// Add the minimal degree of autonomy constraint.
///
/// The energy consumed from providers may be at most `1 − doa*` times the demand:
/// `Σ w·cons − (1 − doa*)·Σ w·flexible_demand ≤ (1 − doa*)·fixed_demand`.
fn add_degree_of_autonomy_constraint(
    problem: &mut Problem,
    variables: &VariableMap,
    model: &Model,
) {
    let doa = model.constraints.minimal_degree_of_autonomy;
    let allowance = 1.0 - doa;

    let mut row = Vec::new();
    let mut fixed_demand = 0.0;
    for asset in model.assets.iter() {
        let weight = asset.energy_vector.weight().value();
        match (&asset.group, &asset.kind) {
            (AssetGroup::ProviderConsumption(_), _) => {
                row.extend(
                    side_flows(variables, asset, Side::Output).map(|var| (var.col(), weight)),
                );
            }
            (AssetGroup::Consumption, AssetKind::Sink(sink)) => match &sink.timeseries {
                Some(stats) if !sink.dispatchable => fixed_demand += weight * stats.total,
                _ => row.extend(
                    side_flows(variables, asset, Side::Input)
                        .map(|var| (var.col(), -allowance * weight)),
                ),
            },
            _ => {}
        }
    }

    info!("Adding constraint: minimal degree of autonomy of {doa}");
    problem.add_row(..=allowance * fixed_demand, row);
}

/// Add the net zero energy constraint: the feed-in is at least the consumption from providers
fn add_net_zero_energy_constraint(problem: &mut Problem, variables: &VariableMap, model: &Model) {
    let mut row = Vec::new();
    for asset in model.assets.iter() {
        let weight = asset.energy_vector.weight().value();
        match asset.group {
            AssetGroup::ProviderFeedin(_) => row.extend(
                side_flows(variables, asset, Side::Input).map(|var| (var.col(), weight)),
            ),
            AssetGroup::ProviderConsumption(_) => row.extend(
                side_flows(variables, asset, Side::Output).map(|var| (var.col(), -weight)),
            ),
            _ => {}
        }
    }

    info!("Adding constraint: net zero energy");
    problem.add_row(0.0.., row);
}
