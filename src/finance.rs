//! General functions related to finance.
//!
//! These turn year-0 costs into lifetime and annualised values. All functions are pure.
use crate::error::SimulationError;
use crate::quantity::{ParamValue, TimeSeries};
use crate::units::{Capacity, Dimensionless, Money, MoneyPerCapacity};
use anyhow::Result;
use std::ops::Mul;

/// Number of days used to scale annual values to the simulated horizon
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Calculates the annuity factor for a given number of years and discount rate.
///
/// This is the present value of a payment of one unit per year over `years` years.
pub fn annuity_factor(years: u32, discount_rate: Dimensionless) -> Dimensionless {
    if discount_rate == Dimensionless(0.0) {
        return Dimensionless(years as f64);
    }
    let d = discount_rate;
    let factor = (Dimensionless(1.0) + d).powi(years as i32);
    Dimensionless(1.0) / d - Dimensionless(1.0) / (d * factor)
}

/// Calculates the capital recovery factor (CRF) for a given lifetime and discount rate.
///
/// The CRF is used to annualize capital costs over the lifetime of an asset.
pub fn capital_recovery_factor(lifetime: u32, discount_rate: Dimensionless) -> Dimensionless {
    if lifetime == 0 {
        return Dimensionless(0.0);
    }
    if discount_rate == Dimensionless(0.0) {
        return Dimensionless(1.0) / Dimensionless(lifetime as f64);
    }
    let factor = (Dimensionless(1.0) + discount_rate).powi(lifetime as i32);
    (discount_rate * factor) / (factor - Dimensionless(1.0))
}

/// Calculates the specific capital expenditure over the whole project.
///
/// Assets whose lifetime is shorter than the project are reinvested in every `lifetime` years. If
/// the last investment outlives the project, its linearly depreciated residual value is refunded.
///
/// # Arguments
///
/// * `specific_cost` - Specific investment cost at year 0
/// * `lifetime` - Lifetime of the asset in years
/// * `project_duration` - Duration of the project in years
/// * `discount_rate` - Discount rate
/// * `tax` - Tax applied to every investment
pub fn lifetime_capex(
    specific_cost: MoneyPerCapacity,
    lifetime: u32,
    project_duration: u32,
    discount_rate: Dimensionless,
    tax: Dimensionless,
) -> MoneyPerCapacity {
    let first_investment = specific_cost * (Dimensionless(1.0) + tax);
    if lifetime == project_duration || lifetime == 0 {
        return first_investment;
    }

    let investments = project_duration.div_ceil(lifetime);
    let discount = |year: u32| (Dimensionless(1.0) + discount_rate).powi(year as i32);

    let mut capex = MoneyPerCapacity(0.0);
    for i in 0..investments {
        capex += first_investment / discount(i * lifetime);
    }

    let overshoot = investments * lifetime;
    if overshoot > project_duration {
        let last_investment = first_investment / discount((investments - 1) * lifetime);
        let unused_share =
            Dimensionless((overshoot - project_duration) as f64 / f64::from(lifetime));
        capex = capex - last_investment * unused_share;
    }

    capex
}

/// Converts a present value (total or per unit of capacity) into an annuity
pub fn annuity<T: Mul<Dimensionless, Output = T>>(present_value: T, crf: Dimensionless) -> T {
    present_value * crf
}

/// Converts an annuity into a present value
pub fn present_value_from_annuity(annuity: Money, annuity_factor: Dimensionless) -> Money {
    annuity * annuity_factor
}

/// Scales an annual value to the number of simulated days
pub fn simulation_annuity(annuity: MoneyPerCapacity, days: u32) -> MoneyPerCapacity {
    annuity * Dimensionless(f64::from(days) / DAYS_PER_YEAR)
}

/// Lifts a dispatch price from a per-year value to its present value over the project.
///
/// Scalars and series are multiplied by the annuity factor, lists element by element.
pub fn lifetime_dispatch_price(
    price: &ParamValue,
    annuity_factor: Dimensionless,
) -> Result<ParamValue> {
    let af = annuity_factor.value();
    let lifted = match price {
        ParamValue::Scalar(value) => ParamValue::Scalar(value * af),
        ParamValue::Series(series) => ParamValue::Series(series.scale(af)),
        ParamValue::List(values) => ParamValue::List(
            values
                .iter()
                .map(|value| lifetime_dispatch_price(value, annuity_factor))
                .collect::<Result<_>>()?,
        ),
        ParamValue::Reference(r) => Err(SimulationError::WrongDispatchPriceType(format!(
            "unresolved time series reference to {}",
            r.file_name
        )))?,
    };

    Ok(lifted)
}

/// Calculates the expenditure on dispatch for a flow at the given (lifetime) price.
///
/// Per-port lists must be split into their elements by the caller.
pub fn dispatch_expenditure(price: &ParamValue, flow: &TimeSeries) -> Result<Money> {
    let cost = match price {
        ParamValue::Scalar(value) => value * flow.sum(),
        ParamValue::Series(series) => series
            .iter()
            .zip(flow.iter())
            .map(|(p, f)| p * f)
            .sum::<f64>(),
        ParamValue::List(_) => Err(SimulationError::WrongDispatchPriceType(
            "a list of prices cannot be applied to a single flow".into(),
        ))?,
        ParamValue::Reference(r) => Err(SimulationError::WrongDispatchPriceType(format!(
            "unresolved time series reference to {}",
            r.file_name
        )))?,
    };

    Ok(Money(cost))
}

/// Calculates the investment cost for a capacity, including development costs
pub fn investment_cost(
    specific_cost: MoneyPerCapacity,
    capacity: Capacity,
    development_costs: Money,
) -> Money {
    specific_cost * capacity + development_costs
}

/// The part of the total investment spent on replacements
pub fn replacement_cost(total_investment: Money, upfront: Money) -> Money {
    total_investment - upfront
}
