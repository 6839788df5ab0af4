//! Raw structures for the input bundle, as read from `input.json`.
//!
//! These mirror the JSON layout closely. Defaults are applied and values checked when the
//! processed model is built (see [`crate::preprocessing`]).
#![allow(missing_docs)]
use super::MaybeParam;
use crate::quantity::{Param, ParamValue};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// The kind of optimisation node an asset is translated into
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, DeserializeLabeledStringEnum, SerializeLabeledStringEnum,
)]
pub enum TypeOemof {
    /// Injects energy into a bus
    #[string = "source"]
    Source,
    /// Draws energy from a bus
    #[string = "sink"]
    Sink,
    /// Converts energy between buses
    #[string = "transformer"]
    Transformer,
    /// Stores energy
    #[string = "storage"]
    Storage,
}

/// A bus name or an ordered list of bus names
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Direction {
    /// A single bus
    Single(String),
    /// Several buses, one port each
    List(Vec<String>),
}

impl Direction {
    /// The bus names in port order
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Single(name) => vec![name.as_str()],
            Self::List(names) => names.iter().map(String::as_str).collect(),
        }
    }

    /// Whether the direction was given as a list
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }
}

/// The root of the input bundle
#[derive(Debug, Deserialize)]
pub struct InputBundle {
    /// Descriptive information about the project
    #[serde(default)]
    pub project_data: ProjectDataRaw,
    /// Time horizon of the simulation
    pub simulation_settings: SimulationSettingsRaw,
    /// Economic parameters
    pub economic_data: EconomicDataRaw,
    /// Optional side constraints
    #[serde(default)]
    pub constraints: ConstraintsRaw,
    /// Demands
    #[serde(rename = "energyConsumption", default)]
    pub energy_consumption: IndexMap<String, AssetRaw>,
    /// Conversion devices
    #[serde(rename = "energyConversion", default)]
    pub energy_conversion: IndexMap<String, AssetRaw>,
    /// Producers
    #[serde(rename = "energyProduction", default)]
    pub energy_production: IndexMap<String, AssetRaw>,
    /// Grid providers
    #[serde(rename = "energyProviders", default)]
    pub energy_providers: IndexMap<String, ProviderRaw>,
    /// Storages
    #[serde(rename = "energyStorage", default)]
    pub energy_storage: IndexMap<String, StorageRaw>,
    /// Cost-only project items
    #[serde(default)]
    pub fixcost: IndexMap<String, FixCostRaw>,
}

/// Descriptive project information, carried through to the output
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectDataRaw {
    #[serde(default)]
    pub project_id: MaybeParam<String>,
    #[serde(default)]
    pub project_name: MaybeParam<String>,
    #[serde(default)]
    pub scenario_id: MaybeParam<String>,
    #[serde(default)]
    pub scenario_name: MaybeParam<String>,
    #[serde(default)]
    pub country: MaybeParam<String>,
    #[serde(default)]
    pub latitude: MaybeParam<Option<f64>>,
    #[serde(default)]
    pub longitude: MaybeParam<Option<f64>>,
}

/// The raw simulation settings
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSettingsRaw {
    pub start_date: MaybeParam<String>,
    pub evaluated_period: MaybeParam<f64>,
    pub timestep: MaybeParam<f64>,
}

/// The raw economic data
#[derive(Debug, Clone, Deserialize)]
pub struct EconomicDataRaw {
    #[serde(default)]
    pub currency: MaybeParam<String>,
    pub discount_factor: MaybeParam<f64>,
    pub project_duration: MaybeParam<f64>,
    #[serde(default)]
    pub tax: MaybeParam<f64>,
}

/// The raw side-constraint settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConstraintsRaw {
    pub minimal_renewable_share: Option<MaybeParam<f64>>,
    pub maximum_emissions: Option<MaybeParam<Option<f64>>>,
    pub minimal_degree_of_autonomy: Option<MaybeParam<f64>>,
    pub net_zero_energy: Option<MaybeParam<bool>>,
}

/// Capacity and cost parameters shared by every asset and storage sub-asset
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CapacityRaw {
    #[serde(rename = "optimizeCap")]
    pub optimize_cap: Option<Param<bool>>,
    #[serde(rename = "installedCap")]
    pub installed_cap: Option<Param<f64>>,
    #[serde(rename = "maximumCap")]
    pub maximum_cap: Option<Param<Option<f64>>>,
    pub specific_costs: Option<Param<f64>>,
    pub specific_costs_om: Option<Param<f64>>,
    pub development_costs: Option<Param<f64>>,
    #[serde(alias = "opex_var", alias = "price")]
    pub dispatch_price: Option<Param<ParamValue>>,
    pub lifetime: Option<Param<f64>>,
}

/// A production, consumption or conversion asset
#[derive(Debug, Clone, Deserialize)]
pub struct AssetRaw {
    pub label: Option<String>,
    pub type_oemof: Option<TypeOemof>,
    #[serde(rename = "energyVector")]
    pub energy_vector: String,
    pub inflow_direction: Option<Direction>,
    pub outflow_direction: Option<Direction>,
    #[serde(flatten)]
    pub capacity: CapacityRaw,
    pub dispatchable: Option<Param<bool>>,
    pub timeseries: Option<Param<ParamValue>>,
    pub efficiency: Option<Param<ParamValue>>,
    #[serde(rename = "renewableAsset")]
    pub renewable_asset: Option<Param<bool>>,
    pub emission_factor: Option<Param<f64>>,
}

/// An energy provider (grid connection)
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderRaw {
    pub label: Option<String>,
    #[serde(rename = "energyVector")]
    pub energy_vector: String,
    pub inflow_direction: Direction,
    pub outflow_direction: Direction,
    pub energy_price: Param<ParamValue>,
    pub feedin_tariff: Param<ParamValue>,
    pub peak_demand_pricing: Option<Param<f64>>,
    pub peak_demand_pricing_period: Option<Param<f64>>,
    pub renewable_share: Option<Param<f64>>,
    pub emission_factor: Option<Param<f64>>,
}

/// A storage with its three sub-assets
#[derive(Debug, Clone, Deserialize)]
pub struct StorageRaw {
    pub label: Option<String>,
    pub type_oemof: Option<TypeOemof>,
    #[serde(rename = "energyVector")]
    pub energy_vector: String,
    pub inflow_direction: Direction,
    pub outflow_direction: Direction,
    #[serde(rename = "optimizeCap")]
    pub optimize_cap: Option<Param<bool>>,
    pub storage_capacity: StorageComponentRaw,
    pub input_power: StorageComponentRaw,
    pub output_power: StorageComponentRaw,
}

/// One of the sub-assets of a storage
#[derive(Debug, Clone, Deserialize)]
pub struct StorageComponentRaw {
    pub label: Option<String>,
    #[serde(flatten)]
    pub capacity: CapacityRaw,
    pub efficiency: Option<Param<ParamValue>>,
    pub soc_min: Option<Param<f64>>,
    pub soc_max: Option<Param<f64>>,
    pub soc_initial: Option<Param<Option<f64>>>,
    #[serde(rename = "crate")]
    pub c_rate: Option<Param<f64>>,
    pub fixed_thermal_losses_relative: Option<Param<ParamValue>>,
    pub fixed_thermal_losses_absolute: Option<Param<ParamValue>>,
}

/// A cost-only item of the project
#[derive(Debug, Clone, Deserialize)]
pub struct FixCostRaw {
    pub label: Option<String>,
    pub specific_costs: Option<Param<f64>>,
    pub specific_costs_om: Option<Param<f64>>,
    pub development_costs: Option<Param<f64>>,
    pub lifetime: Option<Param<f64>>,
}
