//! Assets are the nodes of the energy system: sources, sinks, transformers and storages.
//!
//! All assets live in an [`AssetPool`] and are referred to by their [`AssetID`] (an index into the
//! pool). Buses hold the IDs of the assets connected to them and assets hold the IDs of their
//! buses, so there is no shared ownership between the two.
use crate::bus::BusID;
use crate::carrier::EnergyVector;
use crate::error::SimulationError;
use crate::id::define_id_type;
use crate::input::asset::TypeOemof;
use crate::quantity::{ParamValue, TimeSeries};
use crate::units::{Capacity, Dimensionless, Money, MoneyPerCapacity};
use anyhow::Result;
use itertools::Itertools;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

define_id_type! {AssetLabel}

/// The index of an asset in the [`AssetPool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AssetID(pub usize);

impl fmt::Display for AssetID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an asset came from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetGroup {
    /// Local producers (`energyProduction`)
    Production,
    /// Demands (`energyConsumption`)
    Consumption,
    /// Conversion devices (`energyConversion`)
    Conversion,
    /// Storages (`energyStorage`)
    Storage,
    /// A consumption source generated for the given provider
    ProviderConsumption(AssetLabel),
    /// The feed-in sink generated for the given provider
    ProviderFeedin(AssetLabel),
    /// A generated excess sink
    Excess,
}

impl AssetGroup {
    /// The name of the group in the output bundle
    pub fn name(&self) -> &'static str {
        match self {
            Self::Production => "energyProduction",
            Self::Consumption => "energyConsumption",
            Self::Conversion => "energyConversion",
            Self::Storage => "energyStorage",
            Self::ProviderConsumption(_) | Self::ProviderFeedin(_) => "energyProviders",
            Self::Excess => "excess",
        }
    }

    /// The provider an asset was generated for, if any
    pub fn provider(&self) -> Option<&AssetLabel> {
        match self {
            Self::ProviderConsumption(provider) | Self::ProviderFeedin(provider) => Some(provider),
            _ => None,
        }
    }
}

/// Cost parameters of an asset, as given in the input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Costs {
    /// Specific investment cost at year 0
    pub specific_costs: MoneyPerCapacity,
    /// Specific fixed operation and maintenance costs per year
    pub specific_costs_om: MoneyPerCapacity,
    /// One-off costs of developing the asset
    pub development_costs: Money,
    /// Price per unit of energy dispatched (scalar, per-port list or series)
    pub dispatch_price: ParamValue,
    /// Lifetime in years
    pub lifetime: u32,
}

impl Costs {
    /// Costs which are all zero
    pub fn zero(lifetime: u32) -> Self {
        Self {
            specific_costs: MoneyPerCapacity(0.0),
            specific_costs_om: MoneyPerCapacity(0.0),
            development_costs: Money(0.0),
            dispatch_price: ParamValue::Scalar(0.0),
            lifetime,
        }
    }
}

/// Lifetime and annualised cost coefficients, derived from [`Costs`] during pre-processing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifetimeCosts {
    /// Specific investment cost over the project, including reinvestments
    pub lifetime_specific_cost: MoneyPerCapacity,
    /// Specific O&M cost over the project
    pub lifetime_specific_cost_om: MoneyPerCapacity,
    /// Dispatch price over the project
    pub lifetime_price_dispatch: ParamValue,
    /// Annuity of the investment plus yearly O&M
    pub annuity_specific_investment_and_om: MoneyPerCapacity,
    /// Annuity scaled to the simulated horizon, used as the cost of capacity in the LP
    pub simulation_annuity: MoneyPerCapacity,
}

/// A capacity-bearing part of an asset, with its costs.
///
/// Most assets have one of these. Storages have three: the energy capacity and the input and
/// output power.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Label used in the cost matrix
    pub label: String,
    /// Whether additional capacity is optimised
    pub optimize_cap: bool,
    /// Capacity already installed
    pub installed_cap: Capacity,
    /// Upper bound on the total capacity
    pub maximum_cap: Option<Capacity>,
    /// Cost parameters
    pub costs: Costs,
    /// Derived cost coefficients (absent until pre-processing has run)
    pub lifetime_costs: Option<LifetimeCosts>,
}

impl Component {
    /// Create a component with no capacity and zero costs
    pub fn new(label: &str, lifetime: u32) -> Self {
        Self {
            label: label.to_string(),
            optimize_cap: false,
            installed_cap: Capacity(0.0),
            maximum_cap: None,
            costs: Costs::zero(lifetime),
            lifetime_costs: None,
        }
    }

    /// The largest capacity which may be added by the optimiser
    pub fn max_additional(&self) -> Option<Capacity> {
        self.maximum_cap
            .map(|max| Capacity((max - self.installed_cap).value().max(0.0)))
    }

    /// Get the lifetime costs, failing if they have not been calculated
    pub fn lifetime_costs(&self) -> Result<&LifetimeCosts> {
        self.lifetime_costs.as_ref().ok_or_else(|| {
            SimulationError::MissingParametersForEconomicEvaluation {
                label: self.label.clone(),
                missing: vec![
                    "lifetime_specific_cost".into(),
                    "lifetime_specific_cost_om".into(),
                    "lifetime_price_dispatch".into(),
                    "annuity_specific_investment_and_om".into(),
                    "simulation_annuity".into(),
                ],
            }
            .into()
        })
    }
}

/// Statistics of a time series which scales with capacity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesStats {
    /// The series itself
    pub series: TimeSeries,
    /// Largest value
    pub peak: f64,
    /// Sum over all time steps
    pub total: f64,
    /// Mean value
    pub average: f64,
    /// The series divided by its peak (absent if the peak is not positive)
    pub normalized: Option<TimeSeries>,
}

impl TimeSeriesStats {
    /// Calculate the statistics for a series
    pub fn new(series: TimeSeries) -> Self {
        let peak = series.max();
        let normalized = (peak > 0.0).then(|| series.scale(1.0 / peak));
        Self {
            peak,
            total: series.sum(),
            average: series.mean(),
            normalized,
            series,
        }
    }
}

/// A producer or a provider's consumption source
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    /// Capacity and costs
    pub capacity: Component,
    /// Whether the output is free up to the capacity (true) or fixed by a profile (false)
    pub dispatchable: bool,
    /// Specific generation profile (non-dispatchable) or availability (dispatchable)
    pub timeseries: Option<TimeSeriesStats>,
    /// Share of the output which is renewable
    pub renewable_share: Dimensionless,
    /// Emissions per unit of output
    pub emission_factor: f64,
}

impl Source {
    /// The share of the capacity available at time step `t` for a dispatchable source
    pub fn availability(&self, t: usize) -> f64 {
        match &self.timeseries {
            None => 1.0,
            Some(stats) => stats.normalized.as_ref().map_or(0.0, |n| n.get(t)),
        }
    }
}

/// A demand, feed-in or excess sink
#[derive(Debug, Clone, PartialEq)]
pub struct Sink {
    /// Costs (sinks have no capacity)
    pub capacity: Component,
    /// Whether the inflow is free (true) or fixed by a demand profile (false)
    pub dispatchable: bool,
    /// The demand profile of a non-dispatchable sink
    pub timeseries: Option<TimeSeriesStats>,
}

/// A conversion device
#[derive(Debug, Clone, PartialEq)]
pub struct Transformer {
    /// Capacity (on the first output port) and costs
    pub capacity: Component,
    /// Efficiency of each port on the list side (scalar, list or series)
    pub efficiency: ParamValue,
}

impl Transformer {
    /// The conversion factors of the input and output ports at time step `t`.
    ///
    /// With a single input, the input factor is 1 and each output factor is its efficiency. With
    /// several inputs, each input factor is its efficiency and the output factor is 1.
    pub fn conversion_factors(&self, inputs: usize, outputs: usize, t: usize) -> (Vec<f64>, Vec<f64>) {
        if inputs > 1 {
            let input_factors = (0..inputs)
                .map(|i| self.efficiency.for_port(i).at(t))
                .collect();
            (input_factors, vec![1.0; outputs])
        } else {
            let output_factors = (0..outputs)
                .map(|o| self.efficiency.for_port(o).at(t))
                .collect();
            (vec![1.0; inputs], output_factors)
        }
    }
}

/// The input or output power of a storage
#[derive(Debug, Clone, PartialEq)]
pub struct StoragePower {
    /// Capacity and costs
    pub component: Component,
    /// Conversion efficiency of the flow
    pub efficiency: ParamValue,
    /// Ratio of invested power to invested energy capacity
    pub c_rate: f64,
}

/// A generic storage
#[derive(Debug, Clone, PartialEq)]
pub struct Storage {
    /// Energy capacity and its costs
    pub capacity: Component,
    /// Charging power
    pub input_power: StoragePower,
    /// Discharging power
    pub output_power: StoragePower,
    /// Lowest state of charge
    pub soc_min: f64,
    /// Highest state of charge
    pub soc_max: f64,
    /// Initial state of charge; if unset it is free and the storage is balanced over the horizon
    pub soc_initial: Option<f64>,
    /// Share of the content lost per time step
    pub loss_rate: f64,
    /// Share of the total capacity lost per time step
    pub fixed_losses_relative: ParamValue,
    /// Energy lost per time step
    pub fixed_losses_absolute: ParamValue,
}

/// The variant payload of an asset
#[derive(Debug, Clone, PartialEq)]
pub enum AssetKind {
    /// A source
    Source(Source),
    /// A sink
    Sink(Sink),
    /// A transformer
    Transformer(Transformer),
    /// A storage
    Storage(Storage),
}

/// The ports of an asset on one side (input or output)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ports {
    /// Connected buses in port order
    pub buses: Vec<BusID>,
    /// Whether the direction was given as a list
    pub is_list: bool,
}

impl Ports {
    /// A single port on the given bus
    pub fn single(bus: BusID) -> Self {
        Self {
            buses: vec![bus],
            is_list: false,
        }
    }

    /// Number of ports
    pub fn len(&self) -> usize {
        self.buses.len()
    }

    /// Whether there are no ports
    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }

    /// The first port's bus
    pub fn first(&self) -> Option<&BusID> {
        self.buses.first()
    }

    /// Iterate over the connected buses
    pub fn iter(&self) -> impl Iterator<Item = &BusID> {
        self.buses.iter()
    }
}

/// An asset of the energy system
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    /// Index in the pool
    pub id: AssetID,
    /// Unique label
    pub label: AssetLabel,
    /// Where the asset came from
    pub group: AssetGroup,
    /// The asset's energy carrier
    pub energy_vector: EnergyVector,
    /// Buses the asset draws from
    pub inputs: Ports,
    /// Buses the asset supplies
    pub outputs: Ports,
    /// Variant-specific data
    pub kind: AssetKind,
}

impl Asset {
    /// The kind of optimisation node for this asset
    pub fn type_oemof(&self) -> TypeOemof {
        match self.kind {
            AssetKind::Source(_) => TypeOemof::Source,
            AssetKind::Sink(_) => TypeOemof::Sink,
            AssetKind::Transformer(_) => TypeOemof::Transformer,
            AssetKind::Storage(_) => TypeOemof::Storage,
        }
    }

    /// The main capacity-bearing component (the energy capacity for storages)
    pub fn main_component(&self) -> &Component {
        match &self.kind {
            AssetKind::Source(source) => &source.capacity,
            AssetKind::Sink(sink) => &sink.capacity,
            AssetKind::Transformer(transformer) => &transformer.capacity,
            AssetKind::Storage(storage) => &storage.capacity,
        }
    }

    /// All components of the asset
    pub fn components(&self) -> Vec<&Component> {
        match &self.kind {
            AssetKind::Storage(storage) => vec![
                &storage.capacity,
                &storage.input_power.component,
                &storage.output_power.component,
            ],
            _ => vec![self.main_component()],
        }
    }

    /// All components of the asset, mutably
    pub fn components_mut(&mut self) -> Vec<&mut Component> {
        match &mut self.kind {
            AssetKind::Source(source) => vec![&mut source.capacity],
            AssetKind::Sink(sink) => vec![&mut sink.capacity],
            AssetKind::Transformer(transformer) => vec![&mut transformer.capacity],
            AssetKind::Storage(storage) => vec![
                &mut storage.capacity,
                &mut storage.input_power.component,
                &mut storage.output_power.component,
            ],
        }
    }

    /// Whether the asset is a demand of the energy system
    pub fn is_demand(&self) -> bool {
        self.group == AssetGroup::Consumption
    }

    /// Whether any component has optimised capacity
    pub fn is_optimised(&self) -> bool {
        self.components().iter().any(|c| c.optimize_cap)
    }

    /// The source data, if this asset is a source
    pub fn as_source(&self) -> Option<&Source> {
        match &self.kind {
            AssetKind::Source(source) => Some(source),
            _ => None,
        }
    }

    /// The storage data, if this asset is a storage
    pub fn as_storage(&self) -> Option<&Storage> {
        match &self.kind {
            AssetKind::Storage(storage) => Some(storage),
            _ => None,
        }
    }
}

/// The collection of all assets in the model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetPool {
    assets: Vec<Asset>,
    by_label: HashMap<AssetLabel, AssetID>,
}

impl AssetPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset to the pool, assigning it an ID.
    ///
    /// Fails with [`SimulationError::DuplicateLabel`] if the label is already taken.
    pub fn insert(&mut self, mut asset: Asset) -> Result<AssetID> {
        if self.by_label.contains_key(&asset.label) {
            Err(SimulationError::DuplicateLabel(asset.label.to_string()))?;
        }

        let id = AssetID(self.assets.len());
        asset.id = id;
        self.by_label.insert(asset.label.clone(), id);
        self.assets.push(asset);

        Ok(id)
    }

    /// Get an asset by ID
    pub fn get(&self, id: AssetID) -> &Asset {
        &self.assets[id.0]
    }

    /// Get an asset by ID, mutably
    pub fn get_mut(&mut self, id: AssetID) -> &mut Asset {
        &mut self.assets[id.0]
    }

    /// Look up an asset by its label
    pub fn get_by_label(&self, label: &str) -> Option<&Asset> {
        self.by_label.get(label).map(|id| self.get(*id))
    }

    /// Iterate over all assets in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.assets.iter()
    }

    /// Iterate over all assets mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Asset> {
        self.assets.iter_mut()
    }

    /// Iterate over the assets in a group
    pub fn iter_group<'a>(&'a self, group: &'a AssetGroup) -> impl Iterator<Item = &'a Asset> {
        self.assets.iter().filter(move |asset| &asset.group == group)
    }

    /// Iterate over the sources (including providers' consumption sources)
    pub fn iter_sources(&self) -> impl Iterator<Item = (&Asset, &Source)> {
        self.assets
            .iter()
            .filter_map(|asset| asset.as_source().map(|source| (asset, source)))
    }

    /// Number of assets
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the pool is empty
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Labels of all assets, comma separated
    pub fn labels(&self) -> String {
        self.assets.iter().map(|asset| &asset.label).join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, electricity_bus, pv_asset};
    use rstest::rstest;

    #[rstest]
    fn test_pool_insert_duplicate(pv_asset: Asset) {
        let mut pool = AssetPool::new();
        let id = pool.insert(pv_asset.clone()).unwrap();
        assert_eq!(id, AssetID(0));
        assert_eq!(pool.get_by_label("pv").unwrap().id, id);
        assert_error!(pool.insert(pv_asset), "Duplicate asset label: pv");
    }

    #[test]
    fn test_time_series_stats() {
        let stats = TimeSeriesStats::new(TimeSeries(vec![0.0, 0.5, 0.25]));
        assert_eq!(stats.peak, 0.5);
        assert_eq!(stats.total, 0.75);
        assert_eq!(stats.average, 0.25);
        assert_eq!(stats.normalized, Some(TimeSeries(vec![0.0, 1.0, 0.5])));

        let stats = TimeSeriesStats::new(TimeSeries(vec![0.0, 0.0]));
        assert_eq!(stats.normalized, None);
    }

    #[test]
    fn test_max_additional() {
        let mut component = Component::new("pv", 20);
        assert_eq!(component.max_additional(), None);
        component.installed_cap = Capacity(10.0);
        component.maximum_cap = Some(Capacity(25.0));
        assert_eq!(component.max_additional(), Some(Capacity(15.0)));
    }

    #[test]
    fn test_missing_lifetime_costs() {
        let component = Component::new("pv", 20);
        let err = component.lifetime_costs().unwrap_err();
        assert!(err.to_string().starts_with(
            "Missing parameters for economic evaluation of pv: lifetime_specific_cost"
        ));
    }

    #[rstest]
    #[case(1, 1, vec![1.0], vec![0.9])]
    #[case(1, 2, vec![1.0], vec![0.9, 0.5])]
    #[case(2, 1, vec![0.9, 0.5], vec![1.0])]
    fn test_conversion_factors(
        #[case] inputs: usize,
        #[case] outputs: usize,
        #[case] expected_in: Vec<f64>,
        #[case] expected_out: Vec<f64>,
    ) {
        let efficiency = if inputs.max(outputs) > 1 {
            ParamValue::List(vec![0.9.into(), 0.5.into()])
        } else {
            ParamValue::Scalar(0.9)
        };
        let transformer = Transformer {
            capacity: Component::new("chp", 20),
            efficiency,
        };
        let (factors_in, factors_out) = transformer.conversion_factors(inputs, outputs, 0);
        assert_eq!(factors_in, expected_in);
        assert_eq!(factors_out, expected_out);
    }

    #[rstest]
    fn test_source_availability(electricity_bus: BusID) {
        let mut source = Source {
            capacity: Component::new("diesel", 10),
            dispatchable: true,
            timeseries: None,
            renewable_share: Dimensionless(0.0),
            emission_factor: 0.0,
        };
        assert_eq!(source.availability(3), 1.0);
        source.timeseries = Some(TimeSeriesStats::new(TimeSeries(vec![0.0, 2.0])));
        assert_eq!(source.availability(1), 1.0);
        assert_eq!(source.availability(0), 0.0);
        assert_eq!(Ports::single(electricity_bus).len(), 1);
    }
}
