//! Expansion of energy providers into consumption sources and feed-in sinks.
//!
//! A provider with peak demand pricing over `n` periods per year becomes `n` consumption sources,
//! each available only during its own period. The capacity of each source is optimised and costs
//! the peak demand price, so the optimiser pays for the peak power drawn in every period.
use super::BuildContext;
use crate::asset::{
    Asset, AssetGroup, AssetID, AssetKind, AssetLabel, AssetPool, Component, Costs, Ports, Sink,
    Source, TimeSeriesStats,
};
use crate::bus::bus_id_for;
use crate::carrier::EnergyVector;
use crate::error::SimulationError;
use crate::finance::DAYS_PER_YEAR;
use crate::input::asset::{Direction, ProviderRaw};
use crate::input::positive_whole;
use crate::model::{Provider, SimulationSettings};
use crate::quantity::{Param, ParamValue, TimeSeries};
use crate::units::{Capacity, Dimensionless, Money, MoneyPerCapacity};
use anyhow::{Context, Result, ensure};
use chrono::{Months, NaiveDateTime};
use float_cmp::approx_eq;
use indexmap::IndexMap;
use log::warn;

/// The allowed numbers of peak demand pricing periods per year
const VALID_PERIODS: [u32; 6] = [1, 2, 3, 4, 6, 12];

/// Expand every provider, adding the generated assets to the pool
pub fn expand_providers(
    ctx: &BuildContext,
    settings: &SimulationSettings,
    raw_providers: IndexMap<String, ProviderRaw>,
    assets: &mut AssetPool,
) -> Result<IndexMap<AssetLabel, Provider>> {
    let mut providers = IndexMap::new();
    for (key, raw) in raw_providers {
        let provider = expand_provider(ctx, settings, &key, raw, assets)
            .with_context(|| format!("Invalid energyProviders asset {key}"))?;
        providers.insert(provider.label.clone(), provider);
    }

    Ok(providers)
}

/// The single bus name of a provider direction
fn single_bus(direction: &Direction, name: &str) -> Result<Ports> {
    let names = direction.names();
    ensure!(
        names.len() == 1,
        "{name} of a provider must be a single bus"
    );

    Ok(Ports::single(bus_id_for(names[0])))
}

/// A provider price, which must be a scalar or a series
fn price(ctx: &BuildContext, param: &Param<ParamValue>, name: &str) -> Result<ParamValue> {
    let value = ctx
        .resolve(Some(param), 0.0)
        .with_context(|| format!("Invalid {name}"))?;
    ensure!(
        value.list_len().is_none(),
        "{name} of a provider cannot be a list"
    );

    Ok(value)
}

/// Create the availability masks of the pricing periods.
///
/// With a single period the provider is available in every time step. Otherwise the horizon is
/// cut into blocks of `m = 12 / periods` months counted from the start date, and block `b` belongs
/// to period `b mod periods`, so the periods recur every year of a horizon longer than one year.
pub fn period_masks(settings: &SimulationSettings, periods: u32) -> Result<Vec<TimeSeries>> {
    ensure!(
        VALID_PERIODS.contains(&periods),
        "peak_demand_pricing_period must be one of {VALID_PERIODS:?} (got {periods})"
    );
    let len = settings.time_index.len();
    if periods == 1 {
        return Ok(vec![TimeSeries::constant(1.0, len)]);
    }

    let months = 12 / periods;
    let mut masks = vec![TimeSeries::constant(0.0, len); periods as usize];
    let mut block = 0;
    let mut block_end = block_start(settings, months, 1)?;
    for (t, time) in settings.time_index.iter().enumerate() {
        while *time >= block_end {
            block += 1;
            block_end = block_start(settings, months, block + 1)?;
        }
        masks[(block % periods) as usize].0[t] = 1.0;
    }

    Ok(masks)
}

/// The first instant of the given block of `months` months
fn block_start(settings: &SimulationSettings, months: u32, block: u32) -> Result<NaiveDateTime> {
    settings
        .start_date
        .checked_add_months(Months::new(block * months))
        .context("Pricing period out of range")
}

/// Expand a single provider
fn expand_provider(
    ctx: &BuildContext,
    settings: &SimulationSettings,
    key: &str,
    raw: ProviderRaw,
    assets: &mut AssetPool,
) -> Result<Provider> {
    let label: AssetLabel = raw.label.unwrap_or_else(|| key.to_string()).into();
    let energy_vector = EnergyVector::from_name(&raw.energy_vector)?;
    let inputs = single_bus(&raw.inflow_direction, "inflow_direction")?;
    let outputs = single_bus(&raw.outflow_direction, "outflow_direction")?;

    let energy_price = price(ctx, &raw.energy_price, "energy_price")?;
    let feedin_tariff = price(ctx, &raw.feedin_tariff, "feedin_tariff")?;
    let peak_demand_pricing = raw.peak_demand_pricing.map_or(0.0, |p| p.value);
    ensure!(
        peak_demand_pricing >= 0.0,
        "peak_demand_pricing cannot be negative"
    );
    let period = match raw.peak_demand_pricing_period {
        Some(period) => positive_whole(period.value, "peak_demand_pricing_period")?,
        None => 1,
    };
    let renewable_share = raw.renewable_share.map_or(0.0, |p| p.value);
    ensure!(
        (0.0..=1.0).contains(&renewable_share),
        "renewable_share must be between 0 and 1"
    );
    let emission_factor = raw.emission_factor.map_or(0.0, |p| p.value);
    ensure!(emission_factor >= 0.0, "emission_factor cannot be negative");

    let masks = period_masks(settings, period)?;
    let mut consumption = Vec::with_capacity(masks.len());
    for (p, mask) in masks.into_iter().enumerate() {
        let source_label = if period == 1 {
            format!("{label}_consumption")
        } else {
            format!("{label}_consumption_period_{}", p + 1)
        };
        let capacity = Component {
            label: source_label.clone(),
            optimize_cap: true,
            installed_cap: Capacity(0.0),
            maximum_cap: None,
            costs: Costs {
                specific_costs: MoneyPerCapacity(0.0),
                specific_costs_om: MoneyPerCapacity(peak_demand_pricing),
                development_costs: Money(0.0),
                dispatch_price: energy_price.clone(),
                lifetime: ctx.project_duration,
            },
            lifetime_costs: None,
        };
        let source = Asset {
            id: AssetID(0),
            label: source_label.into(),
            group: AssetGroup::ProviderConsumption(label.clone()),
            energy_vector,
            inputs: Ports::default(),
            outputs: outputs.clone(),
            kind: AssetKind::Source(Source {
                capacity,
                dispatchable: true,
                timeseries: Some(TimeSeriesStats::new(mask)),
                renewable_share: Dimensionless(renewable_share),
                emission_factor,
            }),
        };
        consumption.push(assets.insert(source)?);
    }

    let feedin_label = format!("{label}_feedin");
    let mut feedin_component = Component::new(&feedin_label, ctx.project_duration);
    feedin_component.costs.dispatch_price = feedin_tariff.scaled(-1.0);
    let feedin = assets.insert(Asset {
        id: AssetID(0),
        label: feedin_label.into(),
        group: AssetGroup::ProviderFeedin(label.clone()),
        energy_vector,
        inputs,
        outputs: Ports::default(),
        kind: AssetKind::Sink(Sink {
            capacity: feedin_component,
            dispatchable: true,
            timeseries: None,
        }),
    })?;

    Ok(Provider {
        label,
        energy_vector,
        energy_price,
        feedin_tariff,
        peak_demand_pricing,
        peak_demand_pricing_period: period,
        renewable_share: Dimensionless(renewable_share),
        emission_factor,
        consumption,
        feedin,
    })
}

/// The lifetime levelised cost of one unit of output of an optimised non-dispatchable source, or
/// `None` if the source produces nothing.
fn producer_lcoe(source: &Source, days: u32) -> Option<f64> {
    let stats = source.timeseries.as_ref()?;
    let annual_generation = stats.total * DAYS_PER_YEAR / f64::from(days);
    if annual_generation <= 0.0 {
        return None;
    }
    let lifetime_costs = source.capacity.lifetime_costs.as_ref()?;
    let annuity = lifetime_costs.annuity_specific_investment_and_om.value();

    Some(annuity / annual_generation + source.capacity.costs.dispatch_price.mean())
}

/// Check that feeding in cannot be used to make unbounded profits.
///
/// A tariff above the energy price at any time step allows buying and selling the same energy and
/// is fatal. A tariff above the LCOE of an optimised non-dispatchable producer without a maximum
/// capacity would make the optimiser install unbounded capacity, which is also fatal; if the
/// producer is capped only a warning is logged.
pub fn check_feedin_tariffs(
    assets: &AssetPool,
    providers: &IndexMap<AssetLabel, Provider>,
    settings: &SimulationSettings,
) -> Result<()> {
    for provider in providers.values() {
        let mut equal = false;
        for t in 0..settings.periods {
            let tariff = provider.feedin_tariff.at(t);
            let price = provider.energy_price.at(t);
            if tariff > price {
                Err(SimulationError::FeedinArbitrage(format!(
                    "the feed-in tariff of {} ({tariff}) exceeds its energy price ({price}) in \
                    time step {t}",
                    provider.label
                )))?;
            }
            equal |= tariff > 0.0 && approx_eq!(f64, tariff, price);
        }
        if equal {
            warn!(
                "Provider {}: the feed-in tariff equals the energy price in some time steps",
                provider.label
            );
        }

        let tariff = provider.feedin_tariff.mean();
        for (asset, source) in assets.iter_sources() {
            if asset.group != AssetGroup::Production
                || asset.energy_vector != provider.energy_vector
                || source.dispatchable
                || !source.capacity.optimize_cap
            {
                continue;
            }
            let Some(lcoe) = producer_lcoe(source, settings.evaluated_period) else {
                continue;
            };
            if tariff <= lcoe {
                continue;
            }

            if source.capacity.maximum_cap.is_none() {
                Err(SimulationError::FeedinArbitrage(format!(
                    "the feed-in tariff of {} ({tariff}) exceeds the levelised cost of {} \
                    ({lcoe}), which has no maximumCap",
                    provider.label, asset.label
                )))?;
            }
            warn!(
                "Provider {}: the feed-in tariff ({tariff}) exceeds the levelised cost of {} \
                ({lcoe}); its capacity will be bounded only by its maximumCap",
                provider.label, asset.label
            );
        }
    }

    Ok(())
}
