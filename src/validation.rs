//! Checks on the processed model which are run before it is optimised.
//!
//! The checks are run as a batch: every problem is logged and the first one is returned, so that a
//! single run reports as many issues as possible.
use crate::asset::{Asset, AssetKind};
use crate::error::SimulationError;
use crate::graph::{buses_without_demand, create_energy_system_graph, validate_bus_fan_out};
use crate::model::Model;
use anyhow::{Context, Result, ensure};
use log::{error, warn};

/// The self-discharge per time step above which a storage is reported as implausible
const PLAUSIBLE_LOSS_RATE: f64 = 0.2;

/// Validate the processed model.
///
/// Errors are logged as they are found. If there are any, the first is returned.
pub fn validate_model(model: &Model) -> Result<()> {
    let mut errors = Vec::new();
    let mut check = |result: Result<()>| {
        if let Err(err) = result {
            error!("{err:#}");
            errors.push(err);
        }
    };

    check(check_bus_closure(model));
    let graph = create_energy_system_graph(&model.assets, &model.buses);
    check(validate_bus_fan_out(&graph, &model.assets));
    for bus_id in buses_without_demand(&graph, &model.assets) {
        warn!("No demand can be supplied from {bus_id}");
    }

    for asset in model.assets.iter() {
        check(
            validate_asset(asset)
                .with_context(|| format!("Invalid asset {}", asset.label)),
        );
    }

    let count = errors.len();
    match errors.into_iter().next() {
        None => Ok(()),
        Some(first) => Err(first.context(format!("Validation failed with {count} errors"))),
    }
}

/// Check that every bus named by an asset exists and lists the asset.
///
/// Every offending connection is reported in a single error.
fn check_bus_closure(model: &Model) -> Result<()> {
    let mut problems = Vec::new();
    for asset in model.assets.iter() {
        for bus_id in asset.inputs.iter().chain(asset.outputs.iter()) {
            match model.buses.get(bus_id) {
                None => problems.push(format!("{} refers to unknown bus {bus_id}", asset.label)),
                Some(bus) if !bus.assets.contains(&asset.id) => {
                    problems.push(format!("{bus_id} does not list asset {}", asset.label));
                }
                Some(_) => {}
            }
        }
    }
    ensure!(
        problems.is_empty(),
        "Buses are not closed: {}",
        problems.join("; ")
    );

    Ok(())
}

/// Check a single asset, logging warnings for suspicious values
fn validate_asset(asset: &Asset) -> Result<()> {
    match &asset.kind {
        AssetKind::Source(source) => {
            let Some(stats) = &source.timeseries else {
                return Ok(());
            };
            if !source.dispatchable
                && stats.series.iter().any(|v| !(0.0..=1.0).contains(&v))
            {
                Err(SimulationError::InvalidInputValue(format!(
                    "the timeseries of non-dispatchable source {} must be a specific profile \
                    with values in [0, 1] (found values from {} to {})",
                    asset.label,
                    stats.series.min(),
                    stats.peak
                )))?;
            }
            if source.capacity.optimize_cap && stats.peak <= 0.0 {
                warn!(
                    "Asset {}: the timeseries is zero everywhere, so no capacity will be added",
                    asset.label
                );
            }
        }
        AssetKind::Sink(sink) => {
            if let Some(stats) = &sink.timeseries
                && stats.total <= 0.0
            {
                warn!("Asset {}: the demand is zero in every time step", asset.label);
            }
        }
        AssetKind::Transformer(transformer) => {
            ensure!(
                !asset.outputs.is_empty() && !asset.inputs.is_empty(),
                "Transformers need at least one input and one output"
            );
            let ports = asset.inputs.len().max(asset.outputs.len());
            transformer.efficiency.check_ports(ports)?;
        }
        AssetKind::Storage(storage) => {
            if storage.loss_rate >= PLAUSIBLE_LOSS_RATE {
                warn!(
                    "Asset {}: the storage loses {}% of its content every time step; the \
                    efficiency of the storage capacity is the self-discharge, not the round-trip \
                    efficiency",
                    asset.label,
                    storage.loss_rate * 100.0
                );
            }
            if !storage.capacity.optimize_cap
                && storage.capacity.installed_cap.value() <= 0.0
                && (storage.input_power.component.installed_cap.value() > 0.0
                    || storage.output_power.component.installed_cap.value() > 0.0)
            {
                warn!(
                    "Asset {}: the storage has power but no energy capacity",
                    asset.label
                );
            }
        }
    }

    Ok(())
}
