//! The processed model: everything needed to build and evaluate the optimisation problem.
use crate::asset::{AssetGroup, AssetID, AssetLabel, AssetPool, Component};
use crate::bus::BusMap;
use crate::carrier::EnergyVector;
use crate::input::asset::ProjectDataRaw;
use crate::input::read_input_bundle;
use crate::preprocessing;
use crate::quantity::ParamValue;
use crate::units::Dimensionless;
use crate::validation;
use anyhow::Result;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub mod constraints;
pub use constraints::ConstraintSettings;
pub mod economic_data;
pub use economic_data::EconomicData;
pub mod simulation_settings;
pub use simulation_settings::SimulationSettings;

/// Descriptive information about the project
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[allow(missing_docs)]
pub struct ProjectData {
    pub project_id: String,
    pub project_name: String,
    pub scenario_id: String,
    pub scenario_name: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl From<ProjectDataRaw> for ProjectData {
    fn from(raw: ProjectDataRaw) -> Self {
        Self {
            project_id: raw.project_id.into_inner(),
            project_name: raw.project_name.into_inner(),
            scenario_id: raw.scenario_id.into_inner(),
            scenario_name: raw.scenario_name.into_inner(),
            country: raw.country.into_inner(),
            latitude: raw.latitude.into_inner(),
            longitude: raw.longitude.into_inner(),
        }
    }
}

/// An energy provider, after it has been expanded into consumption sources and a feed-in sink
#[derive(Debug, Clone, PartialEq)]
pub struct Provider {
    /// The provider's label
    pub label: AssetLabel,
    /// The carrier supplied by the provider
    pub energy_vector: EnergyVector,
    /// Price per unit consumed
    pub energy_price: ParamValue,
    /// Remuneration per unit fed in
    pub feedin_tariff: ParamValue,
    /// Price per unit of peak power drawn in a pricing period
    pub peak_demand_pricing: f64,
    /// Number of pricing periods in a year
    pub peak_demand_pricing_period: u32,
    /// Share of the supplied energy which is renewable
    pub renewable_share: Dimensionless,
    /// Emissions per unit consumed
    pub emission_factor: f64,
    /// The generated consumption sources, one per pricing period
    pub consumption: Vec<AssetID>,
    /// The generated feed-in sink
    pub feedin: AssetID,
}

/// A cost-only item of the project, charged as one unit of capacity
#[derive(Debug, Clone, PartialEq)]
pub struct FixCost {
    /// Costs of the item (installed capacity of one)
    pub component: Component,
}

/// A processed model, ready to be simulated
#[derive(Debug)]
pub struct Model {
    /// Path to the model directory
    pub model_dir: PathBuf,
    /// Descriptive project information
    pub project_data: ProjectData,
    /// Time horizon
    pub simulation_settings: SimulationSettings,
    /// Economic parameters and derived factors
    pub economic_data: EconomicData,
    /// Active side constraints
    pub constraints: ConstraintSettings,
    /// Every carrier referenced by an asset
    pub energy_vectors: IndexSet<EnergyVector>,
    /// All assets, including those generated for providers and excess sinks
    pub assets: AssetPool,
    /// Buses in order of creation
    pub buses: BusMap,
    /// Energy providers by label
    pub providers: IndexMap<AssetLabel, Provider>,
    /// Cost-only items
    pub fixcosts: Vec<FixCost>,
}

impl Model {
    /// Read a model from the specified directory, pre-process and validate it.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing `input.json` and the `time_series` folder
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
        let model_dir = model_dir.as_ref();
        let bundle = read_input_bundle(model_dir)?;
        let model = preprocessing::process(bundle, model_dir)?;
        validation::validate_model(&model)?;
        preprocessing::check_capacity_feasibility(&model);

        Ok(model)
    }

    /// Number of simulated time steps
    pub fn periods(&self) -> usize {
        self.simulation_settings.periods
    }

    /// Number of simulated days
    pub fn days(&self) -> u32 {
        self.simulation_settings.evaluated_period
    }

    /// Iterate over the demands of the energy system
    pub fn iter_demands(&self) -> impl Iterator<Item = &crate::asset::Asset> {
        self.assets.iter_group(&AssetGroup::Consumption)
    }

    /// Look up the provider an asset was generated for
    pub fn provider_of(&self, id: AssetID) -> Option<&Provider> {
        self.assets
            .get(id)
            .group
            .provider()
            .and_then(|label| self.providers.get(label))
    }
}
