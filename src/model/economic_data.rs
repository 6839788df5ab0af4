//! Economic parameters of the project and the factors derived from them.
use crate::finance::{annuity_factor, capital_recovery_factor};
use crate::input::asset::EconomicDataRaw;
use crate::input::positive_whole;
use crate::units::Dimensionless;
use anyhow::{Result, ensure};
use serde::Serialize;

/// Economic parameters of the project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EconomicData {
    /// Currency used for all costs
    pub currency: String,
    /// Discount rate
    pub discount_factor: Dimensionless,
    /// Project duration in years
    pub project_duration: u32,
    /// Tax applied to investments
    pub tax: Dimensionless,
    /// Annuity factor over the project duration
    pub annuity_factor: Dimensionless,
    /// Capital recovery factor over the project duration
    pub crf: Dimensionless,
}

/// Check that a rate lies in [0, 1)
fn check_rate(value: f64, name: &str) -> Result<()> {
    ensure!(
        (0.0..1.0).contains(&value),
        "{name} must be in the range [0, 1) (got {value})"
    );

    Ok(())
}

impl EconomicData {
    /// Check the raw economic data and derive the annuity factor and CRF
    pub fn from_raw(raw: EconomicDataRaw) -> Result<Self> {
        let discount_factor = raw.discount_factor.into_inner();
        check_rate(discount_factor, "discount_factor")?;
        let tax = raw.tax.into_inner();
        check_rate(tax, "tax")?;
        let project_duration =
            positive_whole(raw.project_duration.into_inner(), "project_duration")?;

        Ok(Self::new(
            raw.currency.into_inner(),
            Dimensionless(discount_factor),
            project_duration,
            Dimensionless(tax),
        ))
    }

    /// Create economic data, computing the derived factors
    pub fn new(
        currency: String,
        discount_factor: Dimensionless,
        project_duration: u32,
        tax: Dimensionless,
    ) -> Self {
        Self {
            currency,
            discount_factor,
            project_duration,
            tax,
            annuity_factor: annuity_factor(project_duration, discount_factor),
            crf: capital_recovery_factor(project_duration, discount_factor),
        }
    }
}
