//! Code for adding the bus balances and asset constraints to the optimisation problem.
use super::{ComponentRole, Side, Variable, VariableMap};
use crate::asset::{Asset, AssetKind, Source, Storage, Transformer};
use crate::bus::BusID;
use crate::model::Model;
use highs::RowProblem as Problem;
use indexmap::IndexMap;

/// Corresponding variables for a constraint along with the row offset in the solution
pub struct KeysWithOffset<T> {
    offset: usize,
    keys: Vec<T>,
}

impl<T> KeysWithOffset<T> {
    /// Zip the keys with the corresponding dual values in the solution, accounting for the offset
    pub fn zip_duals<'a>(&'a self, duals: &'a [f64]) -> impl Iterator<Item = (&'a T, f64)> {
        assert!(
            self.offset + self.keys.len() <= duals.len(),
            "Bad constraint keys: dual rows out of range"
        );

        self.keys.iter().zip(duals[self.offset..].iter().copied())
    }
}

/// Indicates the bus and time step covered by each bus balance constraint
pub type BusBalanceKeys = KeysWithOffset<(BusID, usize)>;

/// The keys for constraints whose dual values are read back
pub struct ConstraintKeys {
    /// Keys for bus balance constraints
    pub bus_balance_keys: BusBalanceKeys,
}

/// Add the bus balances and asset constraints.
///
/// Note: the bus balances are added first, as their dual values are read back from the solution
/// using the row offset.
pub fn add_model_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    model: &Model,
) -> ConstraintKeys {
    let bus_balance_keys = add_bus_balance_constraints(problem, variables, model);

    for asset in model.assets.iter() {
        match &asset.kind {
            AssetKind::Source(source) => add_source_constraints(problem, variables, asset, source),
            AssetKind::Sink(_) => {}
            AssetKind::Transformer(transformer) => {
                add_transformer_constraints(problem, variables, asset, transformer);
            }
            AssetKind::Storage(storage) => {
                add_storage_constraints(problem, variables, asset, storage);
            }
        }
    }

    ConstraintKeys { bus_balance_keys }
}

/// Add one balance per bus and time step: everything flowing into a bus flows out of it again.
///
/// Flows from assets into the bus have a coefficient of 1 and flows from the bus into assets a
/// coefficient of -1.
fn add_bus_balance_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    model: &Model,
) -> BusBalanceKeys {
    // Row offset in problem. This line **must** come before we add more constraints.
    let offset = problem.num_rows();

    let mut terms_by_bus: IndexMap<&BusID, Vec<(&[Variable], f64)>> =
        model.buses.keys().map(|bus_id| (bus_id, Vec::new())).collect();
    for asset in model.assets.iter() {
        for (port, bus_id) in asset.outputs.iter().enumerate() {
            if let Some(terms) = terms_by_bus.get_mut(bus_id) {
                terms.push((variables.flows(asset.id, Side::Output, port), 1.0));
            }
        }
        for (port, bus_id) in asset.inputs.iter().enumerate() {
            if let Some(terms) = terms_by_bus.get_mut(bus_id) {
                terms.push((variables.flows(asset.id, Side::Input, port), -1.0));
            }
        }
    }

    let mut keys = Vec::new();
    for (bus_id, terms) in terms_by_bus {
        for t in 0..model.periods() {
            let row = terms.iter().map(|(vars, coeff)| (vars[t].col(), *coeff));
            problem.add_row(0.0..=0.0, row);
            keys.push((bus_id.clone(), t));
        }
    }

    BusBalanceKeys { offset, keys }
}

/// Add the capacity constraints of a source with an investment variable.
///
/// A non-dispatchable source follows its profile scaled by the total capacity. The output of a
/// dispatchable source is limited by its available total capacity on every port.
fn add_source_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    asset: &Asset,
    source: &Source,
) {
    let Some(invest) = variables.invest(asset.id, ComponentRole::Capacity) else {
        return;
    };
    let installed = source.capacity.installed_cap.value();

    for port in 0..asset.outputs.len() {
        for (t, flow) in variables.flows(asset.id, Side::Output, port).iter().enumerate() {
            if source.dispatchable {
                let available = source.availability(t);
                problem.add_row(
                    ..=available * installed,
                    [(flow.col(), 1.0), (invest.col(), -available)],
                );
            } else {
                let profile = source
                    .timeseries
                    .as_ref()
                    .map_or(0.0, |stats| stats.series.get(t));
                let fixed = profile * installed;
                problem.add_row(
                    fixed..=fixed,
                    [(flow.col(), 1.0), (invest.col(), -profile)],
                );
            }
        }
    }
}

/// Add the conversion and capacity constraints of a transformer.
///
/// With a single input, each output is the input times the output's efficiency. With several
/// inputs, each input is the output times the input's efficiency.
fn add_transformer_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    asset: &Asset,
    transformer: &Transformer,
) {
    let (inputs, outputs) = (asset.inputs.len(), asset.outputs.len());
    for t in 0..variables.flows(asset.id, Side::Output, 0).len() {
        let (input_factors, output_factors) = transformer.conversion_factors(inputs, outputs, t);
        if inputs > 1 {
            let out = variables.flows(asset.id, Side::Output, 0)[t];
            for (port, factor) in input_factors.iter().enumerate() {
                let flow_in = variables.flows(asset.id, Side::Input, port)[t];
                problem.add_row(0.0..=0.0, [(flow_in.col(), 1.0), (out.col(), -factor)]);
            }
        } else {
            let flow_in = variables.flows(asset.id, Side::Input, 0)[t];
            for (port, factor) in output_factors.iter().enumerate() {
                let out = variables.flows(asset.id, Side::Output, port)[t];
                problem.add_row(0.0..=0.0, [(out.col(), 1.0), (flow_in.col(), -factor)]);
            }
        }
    }

    if let Some(invest) = variables.invest(asset.id, ComponentRole::Capacity) {
        let installed = transformer.capacity.installed_cap.value();
        for flow in variables.flows(asset.id, Side::Output, 0) {
            problem.add_row(..=installed, [(flow.col(), 1.0), (invest.col(), -1.0)]);
        }
    }
}

/// Add the content balance, state of charge, power and C-rate constraints of a storage
fn add_storage_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    asset: &Asset,
    storage: &Storage,
) {
    let Some(content) = variables.storage(asset.id) else {
        return;
    };
    let invest_cap = variables.invest(asset.id, ComponentRole::Capacity);
    let installed = storage.capacity.installed_cap.value();
    let charge = variables.flows(asset.id, Side::Input, 0);
    let discharge = variables.flows(asset.id, Side::Output, 0);

    // Content balance
    let mut previous = content.initial;
    for (t, current) in content.content.iter().enumerate() {
        let relative = storage.fixed_losses_relative.at(t);
        let absolute = storage.fixed_losses_absolute.at(t);
        let efficiency_in = storage.input_power.efficiency.at(t);
        let efficiency_out = storage.output_power.efficiency.at(t);

        let mut row = vec![
            (current.col(), 1.0),
            (previous.col(), storage.loss_rate - 1.0),
            (charge[t].col(), -efficiency_in),
            (discharge[t].col(), 1.0 / efficiency_out),
        ];
        if let Some(invest) = invest_cap {
            row.push((invest.col(), relative));
        }
        let rhs = -relative * installed - absolute;
        problem.add_row(rhs..=rhs, row);
        previous = *current;
    }

    match storage.soc_initial {
        Some(soc) => {
            let mut row = vec![(content.initial.col(), 1.0)];
            if let Some(invest) = invest_cap {
                row.push((invest.col(), -soc));
            }
            let rhs = soc * installed;
            problem.add_row(rhs..=rhs, row);
        }
        None => {
            if let Some(last) = content.content.last() {
                problem.add_row(
                    0.0..=0.0,
                    [(last.col(), 1.0), (content.initial.col(), -1.0)],
                );
            }
        }
    }

    // State of charge bounds depending on the invested capacity
    if let Some(invest) = invest_cap {
        for var in content.content.iter().chain(std::iter::once(&content.initial)) {
            problem.add_row(
                ..=storage.soc_max * installed,
                [(var.col(), 1.0), (invest.col(), -storage.soc_max)],
            );
            problem.add_row(
                storage.soc_min * installed..,
                [(var.col(), 1.0), (invest.col(), -storage.soc_min)],
            );
        }
    }

    // Power limits and C-rate relations
    let powers = [
        (ComponentRole::InputPower, &storage.input_power, charge),
        (ComponentRole::OutputPower, &storage.output_power, discharge),
    ];
    for (role, power, flows) in powers {
        let Some(invest_power) = variables.invest(asset.id, role) else {
            continue;
        };
        let installed_power = power.component.installed_cap.value();
        for flow in flows {
            problem.add_row(
                ..=installed_power,
                [(flow.col(), 1.0), (invest_power.col(), -1.0)],
            );
        }
        if let Some(invest) = invest_cap {
            problem.add_row(
                0.0..=0.0,
                [(invest_power.col(), 1.0), (invest.col(), -power.c_rate)],
            );
        }
    }
}
