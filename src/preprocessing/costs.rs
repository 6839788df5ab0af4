//! Lifting year-0 cost parameters to lifetime and annualised values.
use crate::asset::{AssetPool, Component, LifetimeCosts};
use crate::finance::{annuity, lifetime_capex, lifetime_dispatch_price, simulation_annuity};
use crate::model::{EconomicData, FixCost};
use anyhow::{Context, Result};

/// Calculate the lifetime costs of a single component
pub fn lifetime_costs(
    component: &Component,
    economic_data: &EconomicData,
    days: u32,
) -> Result<LifetimeCosts> {
    let costs = &component.costs;
    let lifetime_specific_cost = lifetime_capex(
        costs.specific_costs,
        costs.lifetime,
        economic_data.project_duration,
        economic_data.discount_factor,
        economic_data.tax,
    );
    let annuity_specific_investment_and_om =
        annuity(lifetime_specific_cost, economic_data.crf) + costs.specific_costs_om;

    Ok(LifetimeCosts {
        lifetime_specific_cost,
        lifetime_specific_cost_om: costs.specific_costs_om * economic_data.annuity_factor,
        lifetime_price_dispatch: lifetime_dispatch_price(
            &costs.dispatch_price,
            economic_data.annuity_factor,
        )?,
        annuity_specific_investment_and_om,
        simulation_annuity: simulation_annuity(annuity_specific_investment_and_om, days),
    })
}

/// Attach lifetime costs to every component of every asset and to the cost-only items
pub fn lift_costs(
    assets: &mut AssetPool,
    fixcosts: &mut [FixCost],
    economic_data: &EconomicData,
    days: u32,
) -> Result<()> {
    let components = assets
        .iter_mut()
        .flat_map(|asset| asset.components_mut())
        .chain(fixcosts.iter_mut().map(|item| &mut item.component));
    for component in components {
        let costs = lifetime_costs(component, economic_data, days)
            .with_context(|| format!("Could not lift the costs of {}", component.label))?;
        component.lifetime_costs = Some(costs);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::economic_data;
    use crate::quantity::ParamValue;
    use crate::units::{Dimensionless, MoneyPerCapacity};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_lifetime_costs(economic_data: EconomicData) {
        let mut component = Component::new("pv", 20);
        component.costs.specific_costs = MoneyPerCapacity(1000.0);
        component.costs.specific_costs_om = MoneyPerCapacity(10.0);
        component.costs.dispatch_price = ParamValue::Scalar(0.1);

        let costs = lifetime_costs(&component, &economic_data, 365).unwrap();

        // Lifetime equals the project duration, so there is one investment
        assert_approx_eq!(
            MoneyPerCapacity,
            costs.lifetime_specific_cost,
            MoneyPerCapacity(1000.0)
        );
        assert_approx_eq!(
            MoneyPerCapacity,
            costs.lifetime_specific_cost_om,
            MoneyPerCapacity(10.0) * economic_data.annuity_factor
        );
        assert_approx_eq!(
            MoneyPerCapacity,
            costs.annuity_specific_investment_and_om,
            MoneyPerCapacity(1000.0) * economic_data.crf + MoneyPerCapacity(10.0)
        );
        assert_approx_eq!(
            MoneyPerCapacity,
            costs.simulation_annuity,
            costs.annuity_specific_investment_and_om
        );
        assert_eq!(
            costs.lifetime_price_dispatch,
            ParamValue::Scalar(0.1 * economic_data.annuity_factor.value())
        );
    }

    #[rstest]
    fn test_simulation_annuity_scales_with_days(economic_data: EconomicData) {
        let mut component = Component::new("battery", 10);
        component.costs.specific_costs = MoneyPerCapacity(500.0);
        let year = lifetime_costs(&component, &economic_data, 365).unwrap();
        let week = lifetime_costs(&component, &economic_data, 7).unwrap();
        assert_approx_eq!(
            MoneyPerCapacity,
            week.simulation_annuity,
            year.simulation_annuity * Dimensionless(7.0 / 365.0)
        );
    }
}
