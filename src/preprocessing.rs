//! Pre-processing turns the raw input bundle into a processed [`Model`].
//!
//! Defaults are filled in, time series are loaded, providers are expanded into plain sources and
//! sinks, buses and excess sinks are created and the cost coefficients used by the optimisation
//! are calculated. Everything downstream only ever sees the processed model.
use crate::asset::{
    Asset, AssetGroup, AssetID, AssetKind, AssetPool, Component, Costs, Ports, Sink, Source,
    Storage, StoragePower, TimeSeriesStats, Transformer,
};
use crate::bus::{Bus, BusMap, bus_id_for, excess_label};
use crate::carrier::EnergyVector;
use crate::error::SimulationError;
use crate::input::asset::{
    AssetRaw, CapacityRaw, Direction, FixCostRaw, InputBundle, StorageComponentRaw, StorageRaw,
    TypeOemof,
};
use crate::input::positive_whole;
use crate::input::time_series::resolve_param_value;
use crate::model::{
    ConstraintSettings, EconomicData, FixCost, Model, ProjectData, SimulationSettings,
};
use crate::quantity::{Param, ParamValue, TimeSeries};
use crate::units::{Capacity, Dimensionless, Money, MoneyPerCapacity};
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexSet;
use itertools::Itertools;
use log::{error, warn};
use std::path::Path;

pub mod costs;
pub mod providers;

/// Information needed while building assets from their raw input
pub struct BuildContext<'a> {
    /// Folder containing the model
    pub model_dir: &'a Path,
    /// Number of simulated time steps
    pub periods: usize,
    /// Default lifetime of assets
    pub project_duration: u32,
}

impl BuildContext<'_> {
    /// Resolve an optional parameter, loading any time series it refers to
    fn resolve(&self, param: Option<&Param<ParamValue>>, default: f64) -> Result<ParamValue> {
        match param {
            None => Ok(ParamValue::Scalar(default)),
            Some(param) => resolve_param_value(param.value.clone(), self.model_dir, self.periods),
        }
    }

    /// Resolve a parameter into a series with one value per time step.
    ///
    /// A plain list of numbers is read as an inline series.
    fn resolve_series(&self, param: &Param<ParamValue>) -> Result<TimeSeries> {
        let value = match &param.value {
            ParamValue::List(values) if values.iter().all(|v| matches!(v, ParamValue::Scalar(_))) => {
                ParamValue::Series(param.value.iter_numbers().collect())
            }
            value => value.clone(),
        };
        match resolve_param_value(value, self.model_dir, self.periods)? {
            ParamValue::Scalar(value) => Ok(TimeSeries::constant(value, self.periods)),
            ParamValue::Series(series) => Ok(series),
            _ => bail!("Expected a single time series"),
        }
    }
}

/// Build the processed model from the raw input bundle.
///
/// # Arguments
///
/// * `bundle` - The raw input bundle
/// * `model_dir` - Folder containing the model, used to resolve time series files
pub fn process(bundle: InputBundle, model_dir: &Path) -> Result<Model> {
    // Carriers are checked first so every unknown one is reported
    let energy_vectors = register_energy_vectors(&bundle)?;

    let simulation_settings = SimulationSettings::from_raw(bundle.simulation_settings)
        .context("Invalid simulation_settings")?;
    let economic_data =
        EconomicData::from_raw(bundle.economic_data).context("Invalid economic_data")?;
    let constraints =
        ConstraintSettings::from_raw(bundle.constraints).context("Invalid constraints")?;

    let ctx = BuildContext {
        model_dir,
        periods: simulation_settings.periods,
        project_duration: economic_data.project_duration,
    };

    let mut assets = AssetPool::new();
    for (key, raw) in bundle.energy_production {
        let asset = build_source(&ctx, &key, raw)
            .with_context(|| format!("Invalid energyProduction asset {key}"))?;
        assets.insert(asset)?;
    }
    for (key, raw) in bundle.energy_consumption {
        let asset = build_sink(&ctx, &key, raw)
            .with_context(|| format!("Invalid energyConsumption asset {key}"))?;
        assets.insert(asset)?;
    }
    for (key, raw) in bundle.energy_conversion {
        let asset = build_transformer(&ctx, &key, raw)
            .with_context(|| format!("Invalid energyConversion asset {key}"))?;
        assets.insert(asset)?;
    }
    for (key, raw) in bundle.energy_storage {
        let asset = build_storage(&ctx, &key, raw)
            .with_context(|| format!("Invalid energyStorage asset {key}"))?;
        assets.insert(asset)?;
    }

    let providers = providers::expand_providers(
        &ctx,
        &simulation_settings,
        bundle.energy_providers,
        &mut assets,
    )?;

    let mut fixcosts = bundle
        .fixcost
        .into_iter()
        .map(|(key, raw)| {
            build_fixcost(&ctx, &key, raw).with_context(|| format!("Invalid fixcost item {key}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut buses = build_buses(&assets, &energy_vectors);
    add_excess_sinks(&ctx, &mut assets, &mut buses)?;

    costs::lift_costs(
        &mut assets,
        &mut fixcosts,
        &economic_data,
        simulation_settings.evaluated_period,
    )?;
    providers::check_feedin_tariffs(&assets, &providers, &simulation_settings)?;

    Ok(Model {
        model_dir: model_dir.to_path_buf(),
        project_data: ProjectData::from(bundle.project_data),
        simulation_settings,
        economic_data,
        constraints,
        energy_vectors,
        assets,
        buses,
        providers,
        fixcosts,
    })
}

/// Check that every asset's energy carrier is known, returning the set of carriers in use.
///
/// Every unknown carrier is logged before the first one is returned as an error.
fn register_energy_vectors(bundle: &InputBundle) -> Result<IndexSet<EnergyVector>> {
    let assets = bundle
        .energy_production
        .iter()
        .chain(&bundle.energy_consumption)
        .chain(&bundle.energy_conversion)
        .map(|(key, raw)| (key, &raw.energy_vector));
    let storages = bundle
        .energy_storage
        .iter()
        .map(|(key, raw)| (key, &raw.energy_vector));
    let providers = bundle
        .energy_providers
        .iter()
        .map(|(key, raw)| (key, &raw.energy_vector));

    let mut energy_vectors = IndexSet::new();
    let mut unknown = Vec::new();
    for (label, name) in assets.chain(storages).chain(providers) {
        match EnergyVector::from_name(name) {
            Ok(energy_vector) => {
                energy_vectors.insert(energy_vector);
            }
            Err(err) => {
                error!("Asset {label}: {err}");
                unknown.push(err);
            }
        }
    }

    if let Some(err) = unknown.into_iter().next() {
        Err(err)?;
    }

    Ok(energy_vectors)
}

/// Check the `type_oemof` given for an asset (if any) matches its group
fn check_type(given: Option<TypeOemof>, expected: TypeOemof) -> Result<()> {
    if let Some(given) = given {
        ensure!(
            given == expected,
            "type_oemof is {given:?} but assets in this group must be {expected:?}"
        );
    }

    Ok(())
}

/// Convert a direction into ports
fn ports(direction: Option<&Direction>, name: &str) -> Result<Ports> {
    let direction = direction.with_context(|| format!("Missing {name}"))?;
    let buses = direction.names().into_iter().map(bus_id_for).collect_vec();
    ensure!(!buses.is_empty(), "{name} is empty");
    ensure!(
        buses.iter().all_unique(),
        "{name} lists the same bus more than once"
    );

    Ok(Ports {
        buses,
        is_list: direction.is_list(),
    })
}

/// Get the value of an optional parameter, or a default
fn value_or<T: Copy>(param: Option<&Param<T>>, default: T) -> T {
    param.map_or(default, |p| p.value)
}

/// Build the capacity and costs of an asset, filling in defaults
fn build_component(ctx: &BuildContext, label: &str, raw: &CapacityRaw) -> Result<Component> {
    let installed_cap = value_or(raw.installed_cap.as_ref(), 0.0);
    ensure!(
        installed_cap.is_finite() && installed_cap >= 0.0,
        "installedCap cannot be negative"
    );

    let maximum_cap = match raw.maximum_cap.as_ref().and_then(|p| p.value) {
        None => None,
        Some(max) if !max.is_finite() || max <= 0.0 => {
            Err(SimulationError::MaximumCapViolated(format!(
                "maximumCap of {label} must be positive (got {max})"
            )))?
        }
        Some(max) if max < installed_cap => {
            warn!(
                "Asset {label}: maximumCap ({max}) is below installedCap ({installed_cap}); \
                ignoring maximumCap"
            );
            None
        }
        Some(max) => Some(Capacity(max)),
    };

    let specific_costs = value_or(raw.specific_costs.as_ref(), 0.0);
    let specific_costs_om = value_or(raw.specific_costs_om.as_ref(), 0.0);
    let development_costs = value_or(raw.development_costs.as_ref(), 0.0);
    ensure!(
        specific_costs >= 0.0 && specific_costs_om >= 0.0 && development_costs >= 0.0,
        "Costs cannot be negative"
    );

    let lifetime = match raw.lifetime.as_ref() {
        Some(lifetime) => positive_whole(lifetime.value, "lifetime")?,
        None => ctx.project_duration,
    };

    Ok(Component {
        label: label.to_string(),
        optimize_cap: value_or(raw.optimize_cap.as_ref(), false),
        installed_cap: Capacity(installed_cap),
        maximum_cap,
        costs: Costs {
            specific_costs: MoneyPerCapacity(specific_costs),
            specific_costs_om: MoneyPerCapacity(specific_costs_om),
            development_costs: Money(development_costs),
            dispatch_price: ctx.resolve(raw.dispatch_price.as_ref(), 0.0)?,
            lifetime,
        },
        lifetime_costs: None,
    })
}

/// Build a production asset
fn build_source(ctx: &BuildContext, key: &str, raw: AssetRaw) -> Result<Asset> {
    check_type(raw.type_oemof, TypeOemof::Source)?;
    let label = raw.label.unwrap_or_else(|| key.to_string());
    let outputs = ports(raw.outflow_direction.as_ref(), "outflow_direction")?;
    ensure!(
        raw.inflow_direction.is_none(),
        "Sources cannot have an inflow_direction"
    );

    let capacity = build_component(ctx, &label, &raw.capacity)?;
    capacity
        .costs
        .dispatch_price
        .check_ports(outputs.len())
        .context("Invalid dispatch_price")?;

    let series = raw
        .timeseries
        .as_ref()
        .map(|ts| ctx.resolve_series(ts))
        .transpose()
        .context("Invalid timeseries")?;
    let dispatchable = value_or(raw.dispatchable.as_ref(), series.is_none());
    if let Some(series) = &series {
        ensure!(
            series.min() >= 0.0,
            "timeseries contains negative values, which are not supported"
        );
    } else {
        ensure!(dispatchable, "Non-dispatchable sources require a timeseries");
    }

    let emission_factor = value_or(raw.emission_factor.as_ref(), 0.0);
    ensure!(emission_factor >= 0.0, "emission_factor cannot be negative");
    let renewable_share = if value_or(raw.renewable_asset.as_ref(), false) {
        Dimensionless(1.0)
    } else {
        Dimensionless(0.0)
    };

    Ok(Asset {
        id: AssetID(0),
        label: label.into(),
        group: AssetGroup::Production,
        energy_vector: EnergyVector::from_name(&raw.energy_vector)?,
        inputs: Ports::default(),
        outputs,
        kind: AssetKind::Source(Source {
            capacity,
            dispatchable,
            timeseries: series.map(TimeSeriesStats::new),
            renewable_share,
            emission_factor,
        }),
    })
}

/// Build a consumption asset
fn build_sink(ctx: &BuildContext, key: &str, raw: AssetRaw) -> Result<Asset> {
    check_type(raw.type_oemof, TypeOemof::Sink)?;
    let label = raw.label.unwrap_or_else(|| key.to_string());
    let inputs = ports(raw.inflow_direction.as_ref(), "inflow_direction")?;
    ensure!(
        raw.outflow_direction.is_none(),
        "Sinks cannot have an outflow_direction"
    );

    let capacity = build_component(ctx, &label, &raw.capacity)?;
    capacity
        .costs
        .dispatch_price
        .check_ports(inputs.len())
        .context("Invalid dispatch_price")?;

    let dispatchable = value_or(raw.dispatchable.as_ref(), false);
    let timeseries = if dispatchable {
        None
    } else {
        ensure!(
            inputs.len() == 1,
            "Non-dispatchable sinks must have a single inflow_direction"
        );
        let ts = raw
            .timeseries
            .as_ref()
            .context("Non-dispatchable sinks require a timeseries")?;
        let series = ctx.resolve_series(ts).context("Invalid timeseries")?;
        ensure!(
            series.min() >= 0.0,
            "Demand timeseries cannot contain negative values"
        );
        Some(TimeSeriesStats::new(series))
    };

    Ok(Asset {
        id: AssetID(0),
        label: label.into(),
        group: AssetGroup::Consumption,
        energy_vector: EnergyVector::from_name(&raw.energy_vector)?,
        inputs,
        outputs: Ports::default(),
        kind: AssetKind::Sink(Sink {
            capacity,
            dispatchable,
            timeseries,
        }),
    })
}

/// Build a conversion asset
fn build_transformer(ctx: &BuildContext, key: &str, raw: AssetRaw) -> Result<Asset> {
    check_type(raw.type_oemof, TypeOemof::Transformer)?;
    let label = raw.label.unwrap_or_else(|| key.to_string());
    let inputs = ports(raw.inflow_direction.as_ref(), "inflow_direction")?;
    let outputs = ports(raw.outflow_direction.as_ref(), "outflow_direction")?;
    ensure!(
        inputs.len() == 1 || outputs.len() == 1,
        "Transformers cannot have several inputs and several outputs"
    );

    // Per-port parameters belong to the side with several ports
    let list_ports = inputs.len().max(outputs.len());

    let capacity = build_component(ctx, &label, &raw.capacity)?;
    capacity
        .costs
        .dispatch_price
        .check_ports(list_ports)
        .context("Invalid dispatch_price")?;

    let efficiency = ctx
        .resolve(raw.efficiency.as_ref(), 1.0)
        .context("Invalid efficiency")?;
    efficiency
        .check_ports(list_ports)
        .context("Invalid efficiency")?;
    ensure!(
        efficiency.iter_numbers().all(|eta| eta > 0.0),
        "efficiency must be positive"
    );

    Ok(Asset {
        id: AssetID(0),
        label: label.into(),
        group: AssetGroup::Conversion,
        energy_vector: EnergyVector::from_name(&raw.energy_vector)?,
        inputs,
        outputs,
        kind: AssetKind::Transformer(Transformer {
            capacity,
            efficiency,
        }),
    })
}

/// Resolve a storage parameter which must be a scalar or a series
fn single_value(
    ctx: &BuildContext,
    param: Option<&Param<ParamValue>>,
    default: f64,
) -> Result<ParamValue> {
    let value = ctx.resolve(param, default)?;
    ensure!(
        value.list_len().is_none(),
        "Storage parameters cannot be given per port"
    );

    Ok(value)
}

/// Build one of the power sub-assets of a storage
fn build_storage_power(
    ctx: &BuildContext,
    label: &str,
    raw: &StorageComponentRaw,
    optimize_cap: bool,
) -> Result<StoragePower> {
    let mut component = build_component(ctx, label, &raw.capacity)?;
    component.optimize_cap = optimize_cap;
    component
        .costs
        .dispatch_price
        .check_ports(1)
        .with_context(|| format!("Invalid dispatch_price of {label}"))?;

    let efficiency = single_value(ctx, raw.efficiency.as_ref(), 1.0)?;
    ensure!(
        efficiency.iter_numbers().all(|eta| eta > 0.0 && eta <= 1.0),
        "efficiency of {label} must be in the range (0, 1]"
    );
    let c_rate = value_or(raw.c_rate.as_ref(), 1.0);
    ensure!(c_rate > 0.0, "crate of {label} must be positive");

    Ok(StoragePower {
        component,
        efficiency,
        c_rate,
    })
}

/// Build a storage asset with its three sub-assets
fn build_storage(ctx: &BuildContext, key: &str, raw: StorageRaw) -> Result<Asset> {
    check_type(raw.type_oemof, TypeOemof::Storage)?;
    let label = raw.label.unwrap_or_else(|| key.to_string());
    let inputs = ports(Some(&raw.inflow_direction), "inflow_direction")?;
    let outputs = ports(Some(&raw.outflow_direction), "outflow_direction")?;
    ensure!(
        inputs.len() == 1 && outputs.len() == 1,
        "Storages must have a single inflow_direction and outflow_direction"
    );
    let optimize_cap = value_or(raw.optimize_cap.as_ref(), false);

    let capacity_raw = &raw.storage_capacity;
    let mut capacity = build_component(
        ctx,
        &format!("{label} storage capacity"),
        &capacity_raw.capacity,
    )?;
    capacity.optimize_cap = optimize_cap;
    ensure!(
        capacity.costs.dispatch_price.list_len().is_none(),
        "Storage dispatch prices cannot be given per port"
    );

    let soc_min = value_or(capacity_raw.soc_min.as_ref(), 0.0);
    let soc_max = value_or(capacity_raw.soc_max.as_ref(), 1.0);
    ensure!(
        0.0 <= soc_min && soc_min <= soc_max && soc_max <= 1.0,
        "State of charge bounds must satisfy 0 <= soc_min <= soc_max <= 1 \
        (got soc_min = {soc_min}, soc_max = {soc_max})"
    );
    let soc_initial = capacity_raw.soc_initial.as_ref().and_then(|p| p.value);
    if let Some(soc_initial) = soc_initial {
        ensure!(
            (soc_min..=soc_max).contains(&soc_initial),
            "soc_initial ({soc_initial}) must be between soc_min and soc_max"
        );
    }

    let loss_rate = match single_value(ctx, capacity_raw.efficiency.as_ref(), 0.0)? {
        ParamValue::Scalar(loss_rate) => loss_rate,
        _ => bail!("The self-discharge (efficiency) of the storage capacity must be a scalar"),
    };
    ensure!(
        (0.0..1.0).contains(&loss_rate),
        "The self-discharge (efficiency) of the storage capacity must be in the range [0, 1)"
    );

    let fixed_losses_relative =
        single_value(ctx, capacity_raw.fixed_thermal_losses_relative.as_ref(), 0.0)
            .context("Invalid fixed_thermal_losses_relative")?;
    let fixed_losses_absolute =
        single_value(ctx, capacity_raw.fixed_thermal_losses_absolute.as_ref(), 0.0)
            .context("Invalid fixed_thermal_losses_absolute")?;
    ensure!(
        fixed_losses_relative
            .iter_numbers()
            .chain(fixed_losses_absolute.iter_numbers())
            .all(|loss| loss >= 0.0),
        "Fixed thermal losses cannot be negative"
    );

    let input_power = build_storage_power(
        ctx,
        &format!("{label} input power"),
        &raw.input_power,
        optimize_cap,
    )?;
    let output_power = build_storage_power(
        ctx,
        &format!("{label} output power"),
        &raw.output_power,
        optimize_cap,
    )?;

    Ok(Asset {
        id: AssetID(0),
        label: label.into(),
        group: AssetGroup::Storage,
        energy_vector: EnergyVector::from_name(&raw.energy_vector)?,
        inputs,
        outputs,
        kind: AssetKind::Storage(Storage {
            capacity,
            input_power,
            output_power,
            soc_min,
            soc_max,
            soc_initial,
            loss_rate,
            fixed_losses_relative,
            fixed_losses_absolute,
        }),
    })
}

/// Build a cost-only item
fn build_fixcost(ctx: &BuildContext, key: &str, raw: FixCostRaw) -> Result<FixCost> {
    let label = raw.label.unwrap_or_else(|| key.to_string());
    let capacity_raw = CapacityRaw {
        installed_cap: Some(Param::new(1.0, "unit")),
        specific_costs: raw.specific_costs,
        specific_costs_om: raw.specific_costs_om,
        development_costs: raw.development_costs,
        lifetime: raw.lifetime,
        ..CapacityRaw::default()
    };

    Ok(FixCost {
        component: build_component(ctx, &label, &capacity_raw)?,
    })
}

/// Create the buses and register every asset on the buses it is connected to.
///
/// One bus is seeded per carrier in use. Seeded buses which no asset references are dropped.
/// A bus created by an asset takes the asset's carrier. Transformers are registered last so that
/// the carrier of a bus comes from a source, sink or storage where there is one.
fn build_buses(assets: &AssetPool, energy_vectors: &IndexSet<EnergyVector>) -> BusMap {
    let mut buses = BusMap::new();
    for energy_vector in energy_vectors {
        let id = bus_id_for(energy_vector.name());
        buses.insert(id.clone(), Bus::new(id, *energy_vector));
    }

    let is_transformer = |asset: &&Asset| matches!(asset.kind, AssetKind::Transformer(_));
    let ordered = assets
        .iter()
        .filter(|asset| !is_transformer(asset))
        .chain(assets.iter().filter(is_transformer));
    for asset in ordered {
        for bus_id in asset.inputs.iter().chain(asset.outputs.iter()) {
            buses
                .entry(bus_id.clone())
                .or_insert_with(|| Bus::new(bus_id.clone(), asset.energy_vector))
                .assets
                .insert(asset.id);
        }
    }

    buses.retain(|_, bus| !bus.assets.is_empty());
    for bus in buses.values_mut() {
        bus.assets.sort_unstable();
    }

    buses
}

/// Attach a free, zero-cost excess sink to every bus
fn add_excess_sinks(ctx: &BuildContext, assets: &mut AssetPool, buses: &mut BusMap) -> Result<()> {
    for bus in buses.values_mut() {
        let label = excess_label(&bus.id);
        let sink = Asset {
            id: AssetID(0),
            label: label.as_str().into(),
            group: AssetGroup::Excess,
            energy_vector: bus.energy_vector,
            inputs: Ports::single(bus.id.clone()),
            outputs: Ports::default(),
            kind: AssetKind::Sink(Sink {
                capacity: Component::new(&label, ctx.project_duration),
                dispatchable: true,
                timeseries: None,
            }),
        };
        let id = assets.insert(sink)?;
        bus.assets.insert(id);
    }

    Ok(())
}

/// The largest output an asset can reach, or `None` if it is unbounded
fn peak_potential(asset: &Asset) -> Option<f64> {
    let component = asset.main_component();
    let capacity = if component.optimize_cap {
        component.maximum_cap?
    } else {
        component.installed_cap
    };

    let potential = match &asset.kind {
        AssetKind::Source(source) if !source.dispatchable => {
            let peak = source.timeseries.as_ref().map_or(0.0, |ts| ts.peak);
            peak * capacity.value()
        }
        AssetKind::Source(_) | AssetKind::Transformer(_) => capacity.value(),
        AssetKind::Storage(storage) => {
            let power = &storage.output_power.component;
            if power.optimize_cap {
                power.maximum_cap?.value()
            } else {
                power.installed_cap.value()
            }
        }
        AssetKind::Sink(_) => 0.0,
    };

    Some(potential)
}

/// Warn if the peak demand of a carrier exceeds the capacity available to supply it.
///
/// Providers and optimised assets without a maximum capacity are unbounded, so carriers with any
/// of these are not checked.
pub fn check_capacity_feasibility(model: &Model) {
    for energy_vector in &model.energy_vectors {
        let demand = model
            .iter_demands()
            .filter(|asset| asset.energy_vector == *energy_vector)
            .filter_map(|asset| match &asset.kind {
                AssetKind::Sink(sink) => sink.timeseries.as_ref(),
                _ => None,
            })
            .fold(TimeSeries::constant(0.0, model.periods()), |total, ts| {
                total.plus(&ts.series)
            });
        let peak_demand = demand.max();
        if peak_demand <= 0.0 {
            continue;
        }

        let potential: Option<f64> = model
            .assets
            .iter()
            .filter(|asset| asset.energy_vector == *energy_vector && !asset.outputs.is_empty())
            .map(|asset| {
                if asset.group.provider().is_some() {
                    None
                } else {
                    peak_potential(asset)
                }
            })
            .sum();
        let Some(potential) = potential else {
            continue;
        };

        if potential < peak_demand {
            warn!(
                "The peak demand of {energy_vector} ({peak_demand}) exceeds the capacity \
                available to supply it ({potential}); the optimisation may be infeasible"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, minimal_input, write_model_dir};
    use crate::input::read_input_bundle;
    use rstest::rstest;
    use serde_json::json;
    use tempfile::tempdir;

    fn process_json(input: &serde_json::Value) -> Result<Model> {
        let dir = tempdir().unwrap();
        write_model_dir(dir.path(), input);
        process(read_input_bundle(dir.path()).unwrap(), dir.path())
    }

    #[rstest]
    fn test_process_minimal(minimal_input: serde_json::Value) {
        let model = process_json(&minimal_input).unwrap();
        assert_eq!(model.periods(), 24);
        assert_eq!(model.buses.len(), 1);
        let bus = &model.buses["Electricity bus"];
        let labels = bus
            .assets
            .iter()
            .map(|id| model.assets.get(*id).label.to_string())
            .collect_vec();
        assert_eq!(
            labels,
            ["diesel", "demand", "dso_consumption", "dso_feedin", "Electricity_excess"]
        );
        for asset in model.assets.iter() {
            for component in asset.components() {
                assert!(component.lifetime_costs.is_some());
            }
        }
    }

    #[rstest]
    fn test_process_unknown_energy_vector(mut minimal_input: serde_json::Value) {
        minimal_input["energyProduction"]["diesel"]["energyVector"] = json!("Diesel");
        let err = process_json(&minimal_input).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SimulationError>(),
            Some(&SimulationError::UnknownEnergyVector("Diesel".into()))
        );
    }

    #[rstest]
    fn test_process_duplicate_label(mut minimal_input: serde_json::Value) {
        minimal_input["energyConsumption"]["demand"]["label"] = json!("diesel");
        let err = process_json(&minimal_input).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SimulationError>(),
            Some(&SimulationError::DuplicateLabel("diesel".into()))
        );
    }

    #[rstest]
    fn test_process_conflicting_type(mut minimal_input: serde_json::Value) {
        minimal_input["energyProduction"]["diesel"]["type_oemof"] = json!("sink");
        assert_error!(
            process_json(&minimal_input),
            "Invalid energyProduction asset diesel"
        );
    }

    #[rstest]
    fn test_maximum_cap_below_installed_is_dropped(mut minimal_input: serde_json::Value) {
        let diesel = &mut minimal_input["energyProduction"]["diesel"];
        diesel["installedCap"] = json!({"value": 10.0, "unit": "kW"});
        diesel["maximumCap"] = json!({"value": 5.0, "unit": "kW"});
        let model = process_json(&minimal_input).unwrap();
        let diesel = model.assets.get_by_label("diesel").unwrap();
        assert_eq!(diesel.main_component().maximum_cap, None);
    }

    #[rstest]
    fn test_maximum_cap_zero_is_fatal(mut minimal_input: serde_json::Value) {
        minimal_input["energyProduction"]["diesel"]["maximumCap"] = json!({"value": 0.0});
        let err = process_json(&minimal_input).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SimulationError>(),
            Some(SimulationError::MaximumCapViolated(_))
        ));
    }

    #[rstest]
    fn test_unused_seeded_bus_removed(mut minimal_input: serde_json::Value) {
        minimal_input["energyConversion"] = json!({
            "electrolyser": {
                "energyVector": "H2",
                "inflow_direction": "Electricity",
                "outflow_direction": "H2",
                "efficiency": {"value": 0.6}
            }
        });
        let model = process_json(&minimal_input).unwrap();
        assert!(model.buses.contains_key("H2 bus"));
        assert_eq!(model.buses["H2 bus"].energy_vector, EnergyVector::H2);
        assert!(model.assets.get_by_label("H2_excess").is_some());

        minimal_input["energyConversion"]["electrolyser"]["outflow_direction"] = json!("Gas");
        let model = process_json(&minimal_input).unwrap();
        assert!(!model.buses.contains_key("H2 bus"));
        assert!(model.buses.contains_key("Gas bus"));
    }

    #[rstest]
    fn test_transformer_many_to_many_rejected(mut minimal_input: serde_json::Value) {
        minimal_input["energyConversion"] = json!({
            "chp": {
                "energyVector": "Heat",
                "inflow_direction": ["Electricity", "Heat"],
                "outflow_direction": ["Electricity", "Heat"]
            }
        });
        assert_error!(
            process_json(&minimal_input),
            "Invalid energyConversion asset chp"
        );
    }

    #[rstest]
    #[case(json!([]))]
    #[case(json!([0.1, 0.2]))]
    fn test_storage_power_price_per_port_rejected(
        mut minimal_input: serde_json::Value,
        #[case] price: serde_json::Value,
    ) {
        minimal_input["energyStorage"] = json!({
            "battery": {
                "energyVector": "Electricity",
                "inflow_direction": "Electricity",
                "outflow_direction": "Electricity",
                "storage_capacity": {"installedCap": {"value": 10.0}},
                "input_power": {
                    "installedCap": {"value": 5.0},
                    "dispatch_price": {"value": price}
                },
                "output_power": {"installedCap": {"value": 5.0}}
            }
        });
        let err = process_json(&minimal_input).unwrap_err();
        assert_eq!(
            err.chain().nth(1).unwrap().to_string(),
            "Invalid dispatch_price of battery input power"
        );

        // A single-entry list is the same as a scalar
        minimal_input["energyStorage"]["battery"]["input_power"]["dispatch_price"] =
            json!({"value": [0.1]});
        assert!(process_json(&minimal_input).is_ok());
    }

    #[rstest]
    fn test_storage_soc_bounds(mut minimal_input: serde_json::Value) {
        minimal_input["energyStorage"] = json!({
            "battery": {
                "energyVector": "Electricity",
                "inflow_direction": "Electricity",
                "outflow_direction": "Electricity",
                "optimizeCap": {"value": true},
                "storage_capacity": {"soc_min": {"value": 0.8}, "soc_max": {"value": 0.2}},
                "input_power": {},
                "output_power": {}
            }
        });
        assert!(process_json(&minimal_input).is_err());

        minimal_input["energyStorage"]["battery"]["storage_capacity"] =
            json!({"soc_min": {"value": 0.1}, "soc_initial": {"value": null}});
        let model = process_json(&minimal_input).unwrap();
        let storage = model
            .assets
            .get_by_label("battery")
            .unwrap()
            .as_storage()
            .unwrap();
        assert_eq!(storage.soc_min, 0.1);
        assert_eq!(storage.soc_initial, None);
        assert!(storage.input_power.component.optimize_cap);
        assert_eq!(storage.capacity.label, "battery storage capacity");
    }

    #[rstest]
    fn test_fixcost(mut minimal_input: serde_json::Value) {
        minimal_input["fixcost"] = json!({
            "grid": {"specific_costs": {"value": 100.0}, "lifetime": {"value": 10}}
        });
        let model = process_json(&minimal_input).unwrap();
        let component = &model.fixcosts[0].component;
        assert_eq!(component.label, "grid");
        assert_eq!(component.installed_cap, Capacity(1.0));
        assert_eq!(component.costs.lifetime, 10);
    }
}
