//! Code for building the capacity and dispatch optimisation problem.
//!
//! Every asset port gets one flow variable per time step, in the units of power of its bus. Assets
//! whose capacity is optimised get an investment variable per component, costed at the
//! component's simulation annuity. Storages additionally get a content variable per time step and
//! one for the initial content.
use crate::asset::{Asset, AssetID, AssetKind, Component};
use crate::model::Model;
use anyhow::Result;
use highs::{RowProblem as Problem, Sense};
use indexmap::IndexMap;
use log::warn;
use std::ops::{Range, RangeBounds};

pub mod constraints;
use constraints::{ConstraintKeys, add_model_constraints};

use super::side_constraints::add_side_constraints;
use super::solver::{Solution, solve_optimal};

/// A decision variable in the optimisation, along with its column index.
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
#[derive(Debug, Clone, Copy)]
pub struct Variable {
    col: highs::Col,
    index: usize,
}

impl Variable {
    /// The column of the problem
    pub fn col(self) -> highs::Col {
        self.col
    }

    /// The value of the variable in a solution
    pub fn value(self, columns: &[f64]) -> f64 {
        columns[self.index]
    }
}

/// Add a column to the problem
fn add_variable<B: RangeBounds<f64>>(problem: &mut Problem, cost: f64, bounds: B) -> Variable {
    let index = problem.num_cols();
    let col = problem.add_column(cost, bounds);
    Variable { col, index }
}

/// Whether a port draws from or supplies a bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The asset draws from the bus
    Input,
    /// The asset supplies the bus
    Output,
}

/// A port of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    /// The asset
    pub asset: AssetID,
    /// Which side of the asset the port is on
    pub side: Side,
    /// Index of the port on its side
    pub port: usize,
}

/// The capacity-bearing part of an asset an investment variable belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentRole {
    /// The main capacity (energy capacity for storages)
    Capacity,
    /// The charging power of a storage
    InputPower,
    /// The discharging power of a storage
    OutputPower,
}

/// The content variables of a storage
#[derive(Debug, Clone)]
pub struct StorageVariables {
    /// Content at the end of each time step
    pub content: Vec<Variable>,
    /// Content before the first time step
    pub initial: Variable,
}

/// A map for easy lookup of variables in the problem.
///
/// The entries are ordered (see [`IndexMap`]).
///
/// We use this data structure for two things:
///
/// 1. In order define constraints for the optimisation
/// 2. To keep track of the combination of parameters that each variable corresponds to, for when we
///    are reading the results of the optimisation.
#[derive(Default)]
pub struct VariableMap {
    flow_vars: IndexMap<FlowKey, Vec<Variable>>,
    flow_var_idx: Range<usize>,
    invest_vars: IndexMap<(AssetID, ComponentRole), Variable>,
    invest_var_idx: Range<usize>,
    storage_vars: IndexMap<AssetID, StorageVariables>,
}

impl VariableMap {
    /// Get the flow variables of a port, one per time step
    pub fn flows(&self, asset: AssetID, side: Side, port: usize) -> &[Variable] {
        let key = FlowKey { asset, side, port };
        self.flow_vars
            .get(&key)
            .expect("No flow variables found for given port")
    }

    /// Iterate over the flow variables of every port
    pub fn iter_flows(&self) -> impl Iterator<Item = (&FlowKey, &[Variable])> {
        self.flow_vars.iter().map(|(key, vars)| (key, vars.as_slice()))
    }

    /// Get the investment variable of a component, if its capacity is optimised
    pub fn invest(&self, asset: AssetID, role: ComponentRole) -> Option<Variable> {
        self.invest_vars.get(&(asset, role)).copied()
    }

    /// Iterate over the investment variables
    pub fn iter_invest(&self) -> impl Iterator<Item = (&(AssetID, ComponentRole), Variable)> {
        self.invest_vars.iter().map(|(key, var)| (key, *var))
    }

    /// Get the content variables of a storage
    pub fn storage(&self, asset: AssetID) -> Option<&StorageVariables> {
        self.storage_vars.get(&asset)
    }

    /// Number of flow variables
    pub fn num_flow_vars(&self) -> usize {
        self.flow_var_idx.len()
    }

    /// Number of investment variables
    pub fn num_invest_vars(&self) -> usize {
        self.invest_var_idx.len()
    }
}

/// The dispatch price of a port at time step `t`
fn port_price(component: &Component, port: usize, t: usize) -> f64 {
    component.costs.dispatch_price.for_port(port).at(t)
}

/// Bounds of the flow variables of a port at time step `t` which do not involve other variables
fn flow_bounds(asset: &Asset, side: Side, port: usize, t: usize) -> (f64, f64) {
    match &asset.kind {
        AssetKind::Source(source) => {
            let installed = source.capacity.installed_cap.value();
            let optimised = source.capacity.optimize_cap;
            match (&source.timeseries, source.dispatchable) {
                (Some(stats), false) if !optimised || stats.peak <= 0.0 => {
                    let fixed = stats.series.get(t) * installed;
                    (fixed, fixed)
                }
                (_, false) => (0.0, f64::INFINITY),
                (_, true) if optimised => (0.0, f64::INFINITY),
                (_, true) => (0.0, installed * source.availability(t)),
            }
        }
        AssetKind::Sink(sink) => match (&sink.timeseries, sink.dispatchable) {
            (Some(stats), false) => (stats.series.get(t), stats.series.get(t)),
            _ => (0.0, f64::INFINITY),
        },
        AssetKind::Transformer(transformer) => {
            let capacity = &transformer.capacity;
            if side == Side::Output && port == 0 && !capacity.optimize_cap {
                (0.0, capacity.installed_cap.value())
            } else {
                (0.0, f64::INFINITY)
            }
        }
        AssetKind::Storage(storage) => {
            let power = match side {
                Side::Input => &storage.input_power.component,
                Side::Output => &storage.output_power.component,
            };
            if power.optimize_cap {
                (0.0, f64::INFINITY)
            } else {
                (0.0, power.installed_cap.value())
            }
        }
    }
}

/// The cost coefficient of a flow variable.
///
/// Transformers carry their dispatch price on the side with several ports, or on the output if
/// there is only one port on either side.
fn flow_cost(asset: &Asset, side: Side, port: usize, t: usize) -> f64 {
    match &asset.kind {
        AssetKind::Source(source) => port_price(&source.capacity, port, t),
        AssetKind::Sink(sink) => port_price(&sink.capacity, port, t),
        AssetKind::Transformer(transformer) => {
            let priced_side = if asset.inputs.len() > 1 {
                Side::Input
            } else {
                Side::Output
            };
            if side == priced_side {
                port_price(&transformer.capacity, port, t)
            } else {
                0.0
            }
        }
        AssetKind::Storage(storage) => {
            let power = match side {
                Side::Input => &storage.input_power.component,
                Side::Output => &storage.output_power.component,
            };
            port_price(power, 0, t)
        }
    }
}

/// Add flow variables for every port of every asset
fn add_flow_variables(problem: &mut Problem, variables: &mut VariableMap, model: &Model) {
    // This line **must** come before we add more variables
    let start = problem.num_cols();

    for asset in model.assets.iter() {
        let ports = (0..asset.inputs.len())
            .map(|port| (Side::Input, port))
            .chain((0..asset.outputs.len()).map(|port| (Side::Output, port)));
        for (side, port) in ports {
            let vars = (0..model.periods())
                .map(|t| {
                    let (lower, upper) = flow_bounds(asset, side, port, t);
                    add_variable(problem, flow_cost(asset, side, port, t), lower..=upper)
                })
                .collect();
            let key = FlowKey {
                asset: asset.id,
                side,
                port,
            };
            let existing = variables.flow_vars.insert(key, vars).is_some();
            assert!(!existing, "Duplicate entry for var");
        }
    }

    variables.flow_var_idx = start..problem.num_cols();
}

/// Add an investment variable for a component if its capacity is optimised
fn add_invest_variable(
    problem: &mut Problem,
    variables: &mut VariableMap,
    asset: AssetID,
    role: ComponentRole,
    component: &Component,
) -> Result<()> {
    if !component.optimize_cap {
        return Ok(());
    }

    let cost = component.lifetime_costs()?.simulation_annuity.value();
    let upper = component
        .max_additional()
        .map_or(f64::INFINITY, |cap| cap.value());
    let var = add_variable(problem, cost, 0.0..=upper);
    let existing = variables.invest_vars.insert((asset, role), var).is_some();
    assert!(!existing, "Duplicate entry for var");

    Ok(())
}

/// Add investment variables for every optimised component
fn add_invest_variables(
    problem: &mut Problem,
    variables: &mut VariableMap,
    model: &Model,
) -> Result<()> {
    // This line **must** come before we add more variables
    let start = problem.num_cols();

    for asset in model.assets.iter() {
        match &asset.kind {
            AssetKind::Source(source) => {
                let profile_peak = source.timeseries.as_ref().map(|stats| stats.peak);
                if !source.dispatchable
                    && source.capacity.optimize_cap
                    && profile_peak.is_none_or(|peak| peak <= 0.0)
                {
                    warn!(
                        "Asset {}: the timeseries has no positive value, so its capacity is not \
                        optimised",
                        asset.label
                    );
                    continue;
                }
                add_invest_variable(
                    problem,
                    variables,
                    asset.id,
                    ComponentRole::Capacity,
                    &source.capacity,
                )?;
            }
            AssetKind::Transformer(transformer) => add_invest_variable(
                problem,
                variables,
                asset.id,
                ComponentRole::Capacity,
                &transformer.capacity,
            )?,
            AssetKind::Storage(storage) => {
                add_invest_variable(
                    problem,
                    variables,
                    asset.id,
                    ComponentRole::Capacity,
                    &storage.capacity,
                )?;
                add_invest_variable(
                    problem,
                    variables,
                    asset.id,
                    ComponentRole::InputPower,
                    &storage.input_power.component,
                )?;
                add_invest_variable(
                    problem,
                    variables,
                    asset.id,
                    ComponentRole::OutputPower,
                    &storage.output_power.component,
                )?;
            }
            AssetKind::Sink(_) => {}
        }
    }

    variables.invest_var_idx = start..problem.num_cols();

    Ok(())
}

/// Add content variables for every storage.
///
/// With a fixed capacity, the state of charge bounds are column bounds. Otherwise they depend on
/// the investment and are added as constraints.
fn add_storage_variables(problem: &mut Problem, variables: &mut VariableMap, model: &Model) {
    for asset in model.assets.iter() {
        let AssetKind::Storage(storage) = &asset.kind else {
            continue;
        };

        let capacity = &storage.capacity;
        let (lower, upper) = if capacity.optimize_cap {
            (0.0, f64::INFINITY)
        } else {
            let installed = capacity.installed_cap.value();
            (storage.soc_min * installed, storage.soc_max * installed)
        };

        let content = (0..model.periods())
            .map(|t| {
                let cost = port_price(capacity, 0, t);
                add_variable(problem, cost, lower..=upper)
            })
            .collect();
        let initial = add_variable(problem, 0.0, lower..=upper);
        variables
            .storage_vars
            .insert(asset.id, StorageVariables { content, initial });
    }
}

/// Build the optimisation problem for the model.
///
/// # Returns
///
/// The problem, its variables and the keys of constraints whose duals are reported.
pub fn build_problem(model: &Model) -> Result<(Problem, VariableMap, ConstraintKeys)> {
    let mut problem = Problem::default();
    let mut variables = VariableMap::default();
    add_flow_variables(&mut problem, &mut variables, model);
    add_invest_variables(&mut problem, &mut variables, model)?;
    add_storage_variables(&mut problem, &mut variables, model);

    let constraint_keys = add_model_constraints(&mut problem, &variables, model);
    add_side_constraints(&mut problem, &variables, model);

    Ok((problem, variables, constraint_keys))
}

/// Build the problem for the model, solve it and return the solution
pub fn perform_optimisation(model: &Model) -> Result<Solution> {
    let (problem, variables, constraint_keys) = build_problem(model)?;
    let mut highs_model = problem.optimise(Sense::Minimise);
    enable_highs_logging(&mut highs_model);

    let solved = solve_optimal(highs_model)?;
    Ok(Solution::new(&solved, variables, constraint_keys))
}

/// Enable the console output of the HiGHS solver at debug level and above
fn enable_highs_logging(model: &mut highs::Model) {
    let enabled = log::log_enabled!(log::Level::Debug);
    model.set_option("output_flag", enabled);
    model.set_option("log_to_console", enabled);
}
