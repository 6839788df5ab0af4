//! The module responsible for writing output data to disk.
use crate::asset::{Asset, AssetGroup, AssetKind};
use crate::input::{INPUT_FILE_NAME, read_json};
use crate::kpi::costs::CostRow;
use crate::model::Model;
use crate::simulation::SimulationOutcome;
use crate::simulation::results::AssetResults;
use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub mod metadata;
use metadata::write_metadata;

/// The root folder in which model-specific output folders will be created
pub const OUTPUT_DIRECTORY_ROOT: &str = "mves_results";

/// The output file name for the enriched input bundle
const RESULTS_FILE_NAME: &str = "results.json";

/// The output file name for the cost matrix
const COST_MATRIX_FILE_NAME: &str = "cost_matrix.csv";

/// The output file name for the scalar matrix
const SCALAR_MATRIX_FILE_NAME: &str = "scalar_matrix.csv";

/// The output file name for the system KPIs
const KPI_SCALARS_FILE_NAME: &str = "kpi_scalars.csv";

/// The output file name for the KPIs of each carrier
const KPI_SCALARS_PER_CARRIER_FILE_NAME: &str = "kpi_scalars_per_carrier.csv";

/// The output file name for the flows on each bus
const OPTIMIZED_FLOWS_FILE_NAME: &str = "optimized_flows.csv";

/// The output file name for the shadow prices of the bus balances
const BUS_PRICES_FILE_NAME: &str = "debug_bus_prices.csv";

/// The format of time stamps in output files
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Get the output folder for the model in the specified directory
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model, optionally overwriting an existing one.
///
/// # Returns
///
/// Whether an existing, non-empty folder is being overwritten.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if output_dir.is_dir() {
        if output_dir.read_dir()?.next().is_none() {
            // Empty folder
            return Ok(false);
        }
        if !allow_overwrite {
            bail!(
                "Output folder already exists and is not empty. Use --overwrite to replace its \
                contents."
            );
        }

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Write every output file for a simulation
pub fn write_outputs(
    output_path: &Path,
    model: &Model,
    outcome: &SimulationOutcome,
    debug_model: bool,
) -> Result<()> {
    write_metadata(output_path, model)?;
    write_results_json(output_path, model, outcome)?;

    let kpi = &outcome.kpi;
    write_csv(
        &output_path.join(COST_MATRIX_FILE_NAME),
        &kpi.cost_matrix.rows,
    )?;
    write_csv(
        &output_path.join(SCALAR_MATRIX_FILE_NAME),
        &kpi.scalar_matrix,
    )?;
    write_kpi_scalars(output_path, outcome)?;
    write_optimized_flows(output_path, model, outcome)?;
    if debug_model {
        write_bus_prices(output_path, model, outcome)?;
    }

    Ok(())
}

/// Write a sequence of rows to a CSV file
fn write_csv<T: Serialize>(file_path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(file_path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// A row of a key-value CSV file
#[derive(Serialize)]
struct KpiRow<'a> {
    kpi: &'a str,
    value: Option<f64>,
}

/// A row of the per-carrier KPI file
#[derive(Serialize)]
struct CarrierScalarRow<'a> {
    energy_vector: &'a str,
    kpi: &'a str,
    value: Option<f64>,
}

/// Flatten a serialisable struct of numbers into (key, value) pairs
fn to_scalars<T: Serialize>(value: &T) -> Result<Vec<(String, Option<f64>)>> {
    let Value::Object(map) = serde_json::to_value(value)? else {
        bail!("Expected a map of KPIs");
    };

    Ok(map
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => Some((key, None)),
            Value::Number(number) => Some((key, number.as_f64())),
            _ => None,
        })
        .collect())
}

/// Write the system KPIs and the KPIs of each carrier
fn write_kpi_scalars(output_path: &Path, outcome: &SimulationOutcome) -> Result<()> {
    let kpi = &outcome.kpi;
    let mut writer = csv::Writer::from_path(output_path.join(KPI_SCALARS_FILE_NAME))?;
    for (key, value) in to_scalars(&kpi.scalars)? {
        writer.serialize(KpiRow { kpi: &key, value })?;
    }
    writer.flush()?;

    let mut writer =
        csv::Writer::from_path(output_path.join(KPI_SCALARS_PER_CARRIER_FILE_NAME))?;
    for (energy_vector, carrier) in &kpi.scalars_per_carrier {
        let mut scalars = to_scalars(carrier)?;
        let eleq = to_scalars(&carrier.totals_eleq)?
            .into_iter()
            .map(|(key, value)| (format!("{key}_electricity_equivalent"), value));
        scalars.extend(eleq);
        for (key, value) in scalars {
            writer.serialize(CarrierScalarRow {
                energy_vector: energy_vector.name(),
                kpi: &key,
                value,
            })?;
        }
    }
    writer.flush()?;

    Ok(())
}

/// A row of the optimised flows file
#[derive(Serialize)]
struct FlowRow<'a> {
    bus: &'a str,
    asset: &'a str,
    time: String,
    flow: f64,
}

/// Write the flow of every asset into each bus in long format
fn write_optimized_flows(
    output_path: &Path,
    model: &Model,
    outcome: &SimulationOutcome,
) -> Result<()> {
    let time_index = &model.simulation_settings.time_index;
    let mut writer = csv::Writer::from_path(output_path.join(OPTIMIZED_FLOWS_FILE_NAME))?;
    for (bus_id, flows) in &outcome.results.bus_flows {
        for (label, flow) in flows {
            for (time, value) in time_index.iter().zip(flow.iter()) {
                writer.serialize(FlowRow {
                    bus: bus_id.as_str(),
                    asset: label.as_str(),
                    time: time.format(TIME_FORMAT).to_string(),
                    flow: value,
                })?;
            }
        }
    }
    writer.flush()?;

    Ok(())
}

/// A row of the bus prices file
#[derive(Serialize)]
struct BusPriceRow<'a> {
    bus: &'a str,
    time: String,
    price: f64,
}

/// Write the shadow prices of the bus balances
fn write_bus_prices(output_path: &Path, model: &Model, outcome: &SimulationOutcome) -> Result<()> {
    let time_index = &model.simulation_settings.time_index;
    let mut writer = csv::Writer::from_path(output_path.join(BUS_PRICES_FILE_NAME))?;
    for (bus_id, prices) in &outcome.results.bus_prices {
        for (time, price) in time_index.iter().zip(prices) {
            writer.serialize(BusPriceRow {
                bus: bus_id.as_str(),
                time: time.format(TIME_FORMAT).to_string(),
                price: *price,
            })?;
        }
    }
    writer.flush()?;

    Ok(())
}

/// Insert every entry of `extra` into `target`, which must be an object
fn merge_into(target: &mut Value, extra: Value) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let (Value::Object(target), Value::Object(extra)) = (target, extra) {
        target.extend(extra);
    }
}

/// The cost row as a JSON object without its label
fn cost_json(row: &CostRow) -> Result<Value> {
    let mut value = serde_json::to_value(row)?;
    if let Value::Object(map) = &mut value {
        map.remove("label");
    }
    Ok(value)
}

/// The results of an asset as they appear in the output bundle
fn asset_json(
    asset: &Asset,
    results: &AssetResults,
    cost_rows: &HashMap<&str, &CostRow>,
) -> Result<Value> {
    let mut value = serde_json::to_value(&results.summary)?;
    merge_into(
        &mut value,
        json!({"optimizedAddCap": results.optimized_add_cap}),
    );
    if let Some(row) = cost_rows.get(asset.label.as_str()) {
        merge_into(&mut value, cost_json(row)?);
    }

    if let (AssetKind::Storage(storage), Some(storage_results)) = (&asset.kind, &results.storage) {
        let sub_assets = [
            (
                "input_power",
                &storage.input_power.component.label,
                serde_json::to_value(&storage_results.input_power)?,
            ),
            (
                "output_power",
                &storage.output_power.component.label,
                serde_json::to_value(&storage_results.output_power)?,
            ),
            (
                "storage_capacity",
                &storage.capacity.label,
                serde_json::to_value(&storage_results.storage_capacity)?,
            ),
        ];
        for (key, label, mut sub_value) in sub_assets {
            if let Some(row) = cost_rows.get(label.as_str()) {
                merge_into(&mut sub_value, cost_json(row)?);
            }
            merge_into(&mut value, json!({ key: sub_value }));
        }
    }

    Ok(value)
}

/// Write the input bundle enriched with the results of every asset, the bus flows and the KPIs
fn write_results_json(output_path: &Path, model: &Model, outcome: &SimulationOutcome) -> Result<()> {
    let mut bundle: Value = read_json(&model.model_dir.join(INPUT_FILE_NAME))?;
    let kpi = &outcome.kpi;
    let cost_rows: HashMap<&str, &CostRow> = kpi
        .cost_matrix
        .asset_rows
        .iter()
        .chain(&kpi.cost_matrix.rows)
        .map(|row| (row.label.as_str(), row))
        .collect();

    for asset in model.assets.iter() {
        let results = outcome.results.get(asset.id);
        let group = match asset.group {
            AssetGroup::Excess => "excess",
            _ => asset.group.name(),
        };
        let value = asset_json(asset, results, &cost_rows)?;
        merge_into(&mut bundle[group][asset.label.as_str()], value);
    }
    for label in model.providers.keys() {
        if let Some(row) = cost_rows.get(label.as_str()) {
            merge_into(&mut bundle["energyProviders"][label.as_str()], cost_json(row)?);
        }
    }

    let time_index: Vec<_> = model
        .simulation_settings
        .time_index
        .iter()
        .map(|time| time.format(TIME_FORMAT).to_string())
        .collect();
    let mut optimized_flows = Map::new();
    for (bus_id, flows) in &outcome.results.bus_flows {
        let mut bus = Map::new();
        bus.insert("time_index".into(), json!(time_index));
        for (label, flow) in flows {
            bus.insert(label.to_string(), serde_json::to_value(flow)?);
        }
        optimized_flows.insert(bus_id.to_string(), Value::Object(bus));
    }

    merge_into(
        &mut bundle,
        json!({
            "objective_value": outcome.objective_value,
            "optimizedFlows": optimized_flows,
            "kpi": {
                "cost_matrix": kpi.cost_matrix.rows,
                "scalar_matrix": kpi.scalar_matrix,
                "scalars_dict": kpi.scalars,
                "scalars_uncoupled_dict": kpi.scalars_per_carrier,
            }
        }),
    );

    let file_path = output_path.join(RESULTS_FILE_NAME);
    let json = serde_json::to_string_pretty(&bundle)?;
    fs::write(&file_path, json)
        .with_context(|| format!("Could not write {}", file_path.display()))?;

    Ok(())
}
