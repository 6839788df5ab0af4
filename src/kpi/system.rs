//! Energy balances and technical KPIs of the whole system and of each carrier.
use super::costs::CostRow;
use crate::asset::{AssetGroup, AssetKind};
use crate::carrier::EnergyVector;
use crate::model::Model;
use crate::simulation::results::SimulationResults;
use crate::units::Money;
use indexmap::IndexMap;
use serde::Serialize;

/// Energy totals over the simulated period for one carrier (or their electricity equivalents)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnergyTotals {
    /// Energy delivered to demands
    pub total_demand: f64,
    /// Energy dumped in excess sinks
    pub total_excess: f64,
    /// Energy fed into providers' grids
    pub total_feedin: f64,
    /// Energy consumed from providers
    pub total_consumption_from_providers: f64,
    /// Energy generated by local producers
    pub total_generation_in_les: f64,
    /// Renewable part of the local generation
    pub total_renewable_generation_in_les: f64,
    /// Renewable part of the generation and consumption from providers
    pub total_renewable_energy_use: f64,
    /// Non-renewable part of the generation and consumption from providers
    pub total_non_renewable_energy_use: f64,
}

impl EnergyTotals {
    /// Multiply every total by `factor`
    fn scaled(&self, factor: f64) -> Self {
        Self {
            total_demand: self.total_demand * factor,
            total_excess: self.total_excess * factor,
            total_feedin: self.total_feedin * factor,
            total_consumption_from_providers: self.total_consumption_from_providers * factor,
            total_generation_in_les: self.total_generation_in_les * factor,
            total_renewable_generation_in_les: self.total_renewable_generation_in_les * factor,
            total_renewable_energy_use: self.total_renewable_energy_use * factor,
            total_non_renewable_energy_use: self.total_non_renewable_energy_use * factor,
        }
    }

    /// Add another set of totals to this one
    fn accumulate(&mut self, other: &Self) {
        self.total_demand += other.total_demand;
        self.total_excess += other.total_excess;
        self.total_feedin += other.total_feedin;
        self.total_consumption_from_providers += other.total_consumption_from_providers;
        self.total_generation_in_les += other.total_generation_in_les;
        self.total_renewable_generation_in_les += other.total_renewable_generation_in_les;
        self.total_renewable_energy_use += other.total_renewable_energy_use;
        self.total_non_renewable_energy_use += other.total_non_renewable_energy_use;
    }
}

/// KPIs of a single carrier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarrierKpis {
    /// Totals in the carrier's own unit
    #[serde(flatten)]
    pub totals: EnergyTotals,
    /// Totals in electricity equivalents
    pub totals_eleq: EnergyTotals,
    /// Share of the system's costs attributed to the carrier by its demand
    pub attributed_costs: Money,
    /// Levelised cost of the carrier's demand
    pub levelized_costs_of_energy: f64,
}

/// KPIs of the whole system
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemKpis {
    /// Sum of the cost matrix
    #[serde(flatten)]
    pub costs: CostRow,
    /// Totals over all carriers in electricity equivalents
    #[serde(flatten)]
    pub totals_eleq: EnergyTotals,
    /// Renewable share of all energy used
    pub renewable_factor: f64,
    /// Renewable share of the local generation
    pub renewable_share_of_local_generation: f64,
    /// Share of the demand not supplied by providers
    pub degree_of_autonomy: Option<f64>,
    /// Share of the local generation consumed on site
    pub onsite_energy_fraction: Option<f64>,
    /// Share of the demand covered by local generation
    pub onsite_energy_matching: Option<f64>,
    /// Balance of feed-in and consumption from providers relative to the demand
    pub degree_of_nze: Option<f64>,
    /// Levelised cost of the electricity-equivalent demand
    pub levelized_costs_of_electricity_equivalent: f64,
    /// Emissions of all sources
    pub total_emissions: f64,
    /// Emissions per unit of electricity-equivalent demand
    pub specific_emissions_per_electricity_equivalent: f64,
}

/// Divide, giving zero if the denominator is not positive
fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Divide, giving `None` if the denominator is not positive
fn ratio_or_none(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator > 0.0).then(|| numerator / denominator)
}

/// Sum the energy flows of every carrier
pub fn calculate_energy_totals(
    model: &Model,
    results: &SimulationResults,
) -> IndexMap<EnergyVector, EnergyTotals> {
    let mut totals: IndexMap<EnergyVector, EnergyTotals> = model
        .energy_vectors
        .iter()
        .map(|ev| (*ev, EnergyTotals::default()))
        .collect();

    for asset in model.assets.iter() {
        let total_flow = results.get(asset.id).summary.total_flow;
        let entry = totals.entry(asset.energy_vector).or_default();
        match (&asset.group, &asset.kind) {
            (AssetGroup::Consumption, AssetKind::Sink(_)) => entry.total_demand += total_flow,
            (AssetGroup::Excess, _) => entry.total_excess += total_flow,
            (AssetGroup::ProviderFeedin(_), _) => entry.total_feedin += total_flow,
            (AssetGroup::ProviderConsumption(_), AssetKind::Source(source)) => {
                let renewable = source.renewable_share.value() * total_flow;
                entry.total_consumption_from_providers += total_flow;
                entry.total_renewable_energy_use += renewable;
                entry.total_non_renewable_energy_use += total_flow - renewable;
            }
            (AssetGroup::Production, AssetKind::Source(source)) => {
                let renewable = source.renewable_share.value() * total_flow;
                entry.total_generation_in_les += total_flow;
                entry.total_renewable_generation_in_les += renewable;
                entry.total_renewable_energy_use += renewable;
                entry.total_non_renewable_energy_use += total_flow - renewable;
            }
            _ => {}
        }
    }

    totals
}

/// Calculate the KPIs of every carrier and of the whole system
pub fn calculate_system_kpis(
    model: &Model,
    results: &SimulationResults,
    cost_totals: CostRow,
) -> (SystemKpis, IndexMap<EnergyVector, CarrierKpis>) {
    let crf = model.economic_data.crf;
    let carrier_totals = calculate_energy_totals(model, results);

    let mut totals_eleq = EnergyTotals::default();
    for (ev, totals) in &carrier_totals {
        totals_eleq.accumulate(&totals.scaled(ev.weight().value()));
    }
    let demand_eleq = totals_eleq.total_demand;
    let annual_costs = (cost_totals.cost_total * crf).value();

    let per_carrier = carrier_totals
        .into_iter()
        .map(|(ev, totals)| {
            let carrier_eleq = totals.scaled(ev.weight().value());
            let attributed_costs = Money(
                cost_totals.cost_total.value()
                    * ratio_or_zero(carrier_eleq.total_demand, demand_eleq),
            );
            let kpis = CarrierKpis {
                levelized_costs_of_energy: ratio_or_zero(
                    (attributed_costs * crf).value(),
                    totals.total_demand,
                ),
                attributed_costs,
                totals,
                totals_eleq: carrier_eleq,
            };
            (ev, kpis)
        })
        .collect();

    let total_emissions: f64 = model
        .assets
        .iter_sources()
        .map(|(asset, source)| {
            source.emission_factor * results.get(asset.id).summary.total_flow
        })
        .sum();

    let t = &totals_eleq;
    let system = SystemKpis {
        renewable_factor: ratio_or_zero(
            t.total_renewable_energy_use,
            t.total_renewable_energy_use + t.total_non_renewable_energy_use,
        ),
        renewable_share_of_local_generation: ratio_or_zero(
            t.total_renewable_generation_in_les,
            t.total_generation_in_les,
        ),
        degree_of_autonomy: ratio_or_none(t.total_consumption_from_providers, demand_eleq)
            .map(|share| 1.0 - share),
        onsite_energy_fraction: ratio_or_none(
            t.total_generation_in_les - t.total_feedin,
            t.total_generation_in_les,
        ),
        onsite_energy_matching: ratio_or_none(
            t.total_generation_in_les - t.total_feedin - t.total_excess,
            demand_eleq,
        ),
        degree_of_nze: ratio_or_none(
            t.total_feedin - t.total_consumption_from_providers,
            demand_eleq,
        )
        .map(|balance| 1.0 + balance),
        levelized_costs_of_electricity_equivalent: ratio_or_zero(annual_costs, demand_eleq),
        specific_emissions_per_electricity_equivalent: ratio_or_zero(total_emissions, demand_eleq),
        total_emissions,
        costs: cost_totals,
        totals_eleq,
    };

    (system, per_carrier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_ratios() {
        assert_approx_eq!(f64, ratio_or_zero(1.0, 4.0), 0.25);
        assert_approx_eq!(f64, ratio_or_zero(1.0, 0.0), 0.0);
        assert_eq!(ratio_or_none(1.0, 0.0), None);
        assert_approx_eq!(f64, ratio_or_none(3.0, 4.0).unwrap(), 0.75);
    }

    #[test]
    fn test_energy_totals_scaled() {
        let totals = EnergyTotals {
            total_demand: 2.0,
            total_feedin: 1.0,
            ..EnergyTotals::default()
        };
        let mut sum = totals.scaled(32.87);
        sum.accumulate(&totals);
        assert_approx_eq!(f64, sum.total_demand, 2.0 * 33.87);
        assert_approx_eq!(f64, sum.total_feedin, 33.87);
        assert_approx_eq!(f64, sum.total_excess, 0.0);
    }
}
