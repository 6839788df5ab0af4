//! Settings for the optional side constraints.
use crate::input::asset::ConstraintsRaw;
use anyhow::{Result, ensure};
use serde::Serialize;

/// Which side constraints are active, and their parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConstraintSettings {
    /// Minimum share of renewable energy in the supply (0 disables the constraint)
    pub minimal_renewable_share: f64,
    /// Maximum total emissions over the simulated horizon
    pub maximum_emissions: Option<f64>,
    /// Minimum degree of autonomy (0 disables the constraint)
    pub minimal_degree_of_autonomy: f64,
    /// Whether feed-in must at least match consumption from providers
    pub net_zero_energy: bool,
}

impl ConstraintSettings {
    /// Read and check the raw constraint settings
    pub fn from_raw(raw: ConstraintsRaw) -> Result<Self> {
        let minimal_renewable_share = raw
            .minimal_renewable_share
            .map_or(0.0, |v| v.into_inner());
        ensure!(
            (0.0..=1.0).contains(&minimal_renewable_share),
            "minimal_renewable_share must be between 0 and 1"
        );

        let minimal_degree_of_autonomy = raw
            .minimal_degree_of_autonomy
            .map_or(0.0, |v| v.into_inner());
        ensure!(
            (0.0..=1.0).contains(&minimal_degree_of_autonomy),
            "minimal_degree_of_autonomy must be between 0 and 1"
        );

        let maximum_emissions = raw.maximum_emissions.and_then(|v| v.into_inner());
        if let Some(cap) = maximum_emissions {
            ensure!(cap >= 0.0, "maximum_emissions cannot be negative");
        }

        Ok(Self {
            minimal_renewable_share,
            maximum_emissions,
            minimal_degree_of_autonomy,
            net_zero_energy: raw.net_zero_energy.is_some_and(|v| v.into_inner()),
        })
    }
}
