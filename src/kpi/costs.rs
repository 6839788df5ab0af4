//! Cost rows of the assets, providers and fixed project costs.
use crate::asset::{Asset, AssetGroup, AssetKind, Component};
use crate::finance::{annuity, dispatch_expenditure, investment_cost, replacement_cost};
use crate::model::{FixCost, Model};
use crate::quantity::{ParamValue, TimeSeries};
use crate::simulation::results::{AssetResults, SimulationResults};
use crate::units::{Capacity, Dimensionless, Money};
use anyhow::{Context, Result};
use serde::Serialize;

/// A row of the cost matrix
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostRow {
    /// Label of the asset, provider or fixed cost
    pub label: String,
    /// Present value of all costs over the project
    pub cost_total: Money,
    /// Present value of the operational costs
    pub cost_operational_total: Money,
    /// Present value of all investments, including replacements
    pub cost_investment: Money,
    /// Investment at the start of the project
    pub cost_upfront: Money,
    /// Present value of the reinvestments
    pub cost_replacement: Money,
    /// Present value of the fixed operation and maintenance costs
    pub cost_om_fix: Money,
    /// Present value of the dispatch costs
    pub cost_dispatch: Money,
    /// Annual operation and maintenance costs
    pub annuity_om: Money,
    /// Annual total costs
    pub annuity_total: Money,
    /// Levelised cost of the energy delivered by the asset
    pub lcoe_asset: f64,
}

impl CostRow {
    /// An empty row with the given label
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }

    /// Add the costs of another row to this one (the LCOE is not summed)
    pub fn accumulate(&mut self, other: &CostRow) {
        self.cost_total += other.cost_total;
        self.cost_operational_total += other.cost_operational_total;
        self.cost_investment += other.cost_investment;
        self.cost_upfront += other.cost_upfront;
        self.cost_replacement += other.cost_replacement;
        self.cost_om_fix += other.cost_om_fix;
        self.cost_dispatch += other.cost_dispatch;
        self.annuity_om += other.annuity_om;
        self.annuity_total += other.annuity_total;
    }

    /// Set the LCOE for the given delivered energy (zero if nothing is delivered)
    fn with_lcoe(mut self, total_flow: f64) -> Self {
        self.lcoe_asset = if total_flow > 0.0 {
            self.annuity_total.value() / total_flow
        } else {
            0.0
        };
        self
    }
}

/// Calculate the cost row of a single component.
///
/// Investments are only counted if capacity was added, in which case the whole capacity is
/// charged.
pub fn component_costs(
    component: &Component,
    added_cap: Capacity,
    cost_dispatch: Money,
    crf: Dimensionless,
) -> Result<CostRow> {
    let lifetime_costs = component.lifetime_costs()?;
    let total_cap = component.installed_cap + added_cap;
    let development_costs = component.costs.development_costs;

    let (cost_investment, cost_upfront) = if added_cap.value() > 0.0 {
        (
            investment_cost(
                lifetime_costs.lifetime_specific_cost,
                total_cap,
                development_costs,
            ),
            investment_cost(component.costs.specific_costs, total_cap, development_costs),
        )
    } else {
        (Money(0.0), Money(0.0))
    };
    let cost_om_fix = lifetime_costs.lifetime_specific_cost_om * total_cap;
    let cost_operational_total = cost_om_fix + cost_dispatch;
    let cost_total = cost_investment + cost_operational_total;

    Ok(CostRow {
        label: component.label.clone(),
        cost_total,
        cost_operational_total,
        cost_investment,
        cost_upfront,
        cost_replacement: replacement_cost(cost_investment, cost_upfront),
        cost_om_fix,
        cost_dispatch,
        annuity_om: annuity(cost_om_fix, crf),
        annuity_total: annuity(cost_total, crf),
        lcoe_asset: 0.0,
    })
}

/// The dispatch expenditure of a component over several ports at its lifetime prices
fn port_expenditure<'a, I>(component: &Component, flows: I) -> Result<Money>
where
    I: IntoIterator<Item = (usize, &'a TimeSeries)>,
{
    let prices: &ParamValue = &component.lifetime_costs()?.lifetime_price_dispatch;
    flows
        .into_iter()
        .map(|(port, flow)| dispatch_expenditure(prices.for_port(port), flow))
        .sum()
}

/// Calculate the cost rows of an asset: one for the asset and one per storage sub-asset
pub fn asset_costs(
    asset: &Asset,
    results: &AssetResults,
    crf: Dimensionless,
) -> Result<(CostRow, Vec<CostRow>)> {
    let add_cap = results.optimized_add_cap;
    let row = match &asset.kind {
        AssetKind::Source(source) => {
            let dispatch =
                port_expenditure(&source.capacity, results.output_flows.iter().enumerate())?;
            component_costs(&source.capacity, add_cap, dispatch, crf)?
                .with_lcoe(results.summary.total_flow)
        }
        AssetKind::Sink(sink) => {
            let dispatch =
                port_expenditure(&sink.capacity, results.input_flows.iter().enumerate())?;
            let row = component_costs(&sink.capacity, add_cap, dispatch, crf)?;
            if asset.is_demand() {
                row
            } else {
                row.with_lcoe(results.summary.total_flow)
            }
        }
        AssetKind::Transformer(transformer) => {
            let priced = if asset.inputs.len() > 1 {
                &results.input_flows
            } else {
                &results.output_flows
            };
            let dispatch = port_expenditure(&transformer.capacity, priced.iter().enumerate())?;
            component_costs(&transformer.capacity, add_cap, dispatch, crf)?
                .with_lcoe(results.summary.total_flow)
        }
        AssetKind::Storage(storage) => {
            let Some(sub_results) = &results.storage else {
                return Ok((CostRow::new(asset.label.as_str()), Vec::new()));
            };
            let sub_assets = [
                (
                    &storage.input_power.component,
                    sub_results.input_power.optimized_add_cap,
                    &sub_results.input_power.summary.flow,
                ),
                (
                    &storage.output_power.component,
                    sub_results.output_power.optimized_add_cap,
                    &sub_results.output_power.summary.flow,
                ),
                (
                    &storage.capacity,
                    sub_results.storage_capacity.optimized_add_cap,
                    &sub_results.storage_capacity.storage_content,
                ),
            ];

            let mut row = CostRow::new(asset.label.as_str());
            let mut sub_rows = Vec::new();
            for (component, added, flow) in sub_assets {
                let dispatch = port_expenditure(component, [(0, flow)])?;
                let sub_row = component_costs(component, added, dispatch, crf)?
                    .with_lcoe(flow.sum());
                row.accumulate(&sub_row);
                sub_rows.push(sub_row);
            }

            return Ok((row.with_lcoe(sub_results.output_power.summary.total_flow), sub_rows));
        }
    };

    Ok((
        CostRow {
            label: asset.label.to_string(),
            ..row
        },
        Vec::new(),
    ))
}

/// The cost row of a fixed project cost, charged for a capacity of one
pub fn fixcost_costs(fixcost: &FixCost, crf: Dimensionless) -> Result<CostRow> {
    let component = &fixcost.component;
    let lifetime_costs = component.lifetime_costs()?;
    let unit = Capacity(1.0);
    let development_costs = component.costs.development_costs;

    let cost_investment = investment_cost(
        lifetime_costs.lifetime_specific_cost,
        unit,
        development_costs,
    );
    let cost_upfront = investment_cost(component.costs.specific_costs, unit, development_costs);
    let cost_om_fix = lifetime_costs.lifetime_specific_cost_om * unit;
    let cost_total = cost_investment + cost_om_fix;

    Ok(CostRow {
        label: component.label.clone(),
        cost_total,
        cost_operational_total: cost_om_fix,
        cost_investment,
        cost_upfront,
        cost_replacement: replacement_cost(cost_investment, cost_upfront),
        cost_om_fix,
        cost_dispatch: Money(0.0),
        annuity_om: annuity(cost_om_fix, crf),
        annuity_total: annuity(cost_total, crf),
        lcoe_asset: 0.0,
    })
}

/// The cost rows of the whole energy system
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostMatrix {
    /// One row per reported asset, provider and fixed cost
    pub rows: Vec<CostRow>,
    /// Rows of each individual asset and storage sub-asset, including generated ones
    pub asset_rows: Vec<CostRow>,
}

impl CostMatrix {
    /// The sum of all rows of the matrix
    pub fn totals(&self) -> CostRow {
        let mut totals = CostRow::new("total");
        for row in &self.rows {
            totals.accumulate(row);
        }
        totals
    }

    /// Find a row of the matrix by label
    pub fn get(&self, label: &str) -> Option<&CostRow> {
        self.rows.iter().find(|row| row.label == label)
    }
}

/// Calculate the cost matrix.
///
/// Assets generated for a provider are aggregated into a single row for the provider. Excess sinks
/// are not reported.
pub fn calculate_cost_matrix(model: &Model, results: &SimulationResults) -> Result<CostMatrix> {
    let crf = model.economic_data.crf;
    let mut matrix = CostMatrix::default();
    let mut provider_rows: Vec<CostRow> = model
        .providers
        .keys()
        .map(|label| CostRow::new(label.as_str()))
        .collect();
    let mut provider_flows = vec![0.0; provider_rows.len()];

    for asset in model.assets.iter() {
        let asset_results = results.get(asset.id);
        let (row, sub_rows) = asset_costs(asset, asset_results, crf)
            .with_context(|| format!("Could not evaluate the costs of {}", asset.label))?;

        match &asset.group {
            AssetGroup::Excess => {}
            AssetGroup::ProviderConsumption(provider) | AssetGroup::ProviderFeedin(provider) => {
                if let Some(idx) = model.providers.get_index_of(provider) {
                    provider_rows[idx].accumulate(&row);
                    if matches!(asset.group, AssetGroup::ProviderConsumption(_)) {
                        provider_flows[idx] += asset_results.summary.total_flow;
                    }
                }
            }
            _ => matrix.rows.push(row.clone()),
        }

        matrix.asset_rows.push(row);
        matrix.asset_rows.extend(sub_rows);
    }

    matrix.rows.extend(
        provider_rows
            .into_iter()
            .zip(provider_flows)
            .map(|(row, flow)| row.with_lcoe(flow)),
    );
    for fixcost in &model.fixcosts {
        matrix.rows.push(
            fixcost_costs(fixcost, crf)
                .with_context(|| format!("Could not evaluate fixed cost {}", fixcost.component.label))?,
        );
    }

    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::economic_data;
    use crate::model::EconomicData;
    use crate::preprocessing::costs::lifetime_costs;
    use crate::units::MoneyPerCapacity;
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn component(economic_data: EconomicData) -> Component {
        let mut component = Component::new("pv", 20);
        component.optimize_cap = true;
        component.installed_cap = Capacity(10.0);
        component.costs.specific_costs = MoneyPerCapacity(1000.0);
        component.costs.specific_costs_om = MoneyPerCapacity(10.0);
        component.costs.development_costs = Money(500.0);
        component.lifetime_costs = Some(lifetime_costs(&component, &economic_data, 365).unwrap());
        component
    }

    #[rstest]
    fn test_component_costs_with_investment(component: Component, economic_data: EconomicData) {
        let row =
            component_costs(&component, Capacity(5.0), Money(100.0), economic_data.crf).unwrap();
        assert_approx_eq!(Money, row.cost_investment, Money(15500.0));
        assert_approx_eq!(Money, row.cost_upfront, Money(15500.0));
        assert_approx_eq!(Money, row.cost_replacement, Money(0.0));
        assert_approx_eq!(
            Money,
            row.cost_om_fix,
            Money(150.0 * economic_data.annuity_factor.value())
        );
        assert_approx_eq!(
            Money,
            row.cost_total,
            row.cost_investment + row.cost_om_fix + Money(100.0)
        );
        assert_approx_eq!(
            Money,
            row.annuity_total,
            row.cost_total * economic_data.crf
        );
    }

    #[rstest]
    fn test_component_costs_without_investment(component: Component, economic_data: EconomicData) {
        let row = component_costs(&component, Capacity(0.0), Money(0.0), economic_data.crf).unwrap();
        assert_eq!(row.cost_investment, Money(0.0));
        assert_eq!(row.cost_upfront, Money(0.0));
        assert!(row.cost_om_fix > Money(0.0));
    }

    #[rstest]
    fn test_component_costs_missing_parameters(economic_data: EconomicData) {
        let component = Component::new("pv", 20);
        let err =
            component_costs(&component, Capacity(0.0), Money(0.0), economic_data.crf).unwrap_err();
        assert!(err.to_string().contains("lifetime_specific_cost"));
    }

    #[test]
    fn test_lcoe_zero_flow() {
        let row = CostRow {
            annuity_total: Money(10.0),
            ..CostRow::new("x")
        };
        assert_approx_eq!(f64, row.clone().with_lcoe(0.0).lcoe_asset, 0.0);
        assert_approx_eq!(f64, row.with_lcoe(4.0).lcoe_asset, 2.5);
    }
}
