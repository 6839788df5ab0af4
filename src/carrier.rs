//! Energy carriers and their electricity-equivalent weights.
use crate::error::SimulationError;
use crate::units::Dimensionless;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use strum::{EnumIter, IntoEnumIterator};
use unicase::UniCase;

/// An energy carrier recognised by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter)]
pub enum EnergyVector {
    /// Electricity (kWh_el)
    Electricity,
    /// Hydrogen (kgH2)
    H2,
    /// Heat (kWh_th)
    Heat,
}

impl EnergyVector {
    /// The name used for the carrier in input files
    pub fn name(self) -> &'static str {
        match self {
            Self::Electricity => "Electricity",
            Self::H2 => "H2",
            Self::Heat => "Heat",
        }
    }

    /// The electricity-equivalent weight of one unit of this carrier
    pub fn weight(self) -> Dimensionless {
        match self {
            Self::Electricity | Self::Heat => Dimensionless(1.0),
            Self::H2 => Dimensionless(32.87),
        }
    }

    /// The unit of the electricity-equivalent weight
    pub fn weight_unit(self) -> &'static str {
        match self {
            Self::Electricity => "kWh_eleq/kWh_el",
            Self::H2 => "kWh_eleq/kgH2",
            Self::Heat => "kWh_eleq/kWh_th",
        }
    }

    /// Look up a carrier by name (case-insensitive)
    pub fn from_name(name: &str) -> Result<Self, SimulationError> {
        let name = UniCase::new(name.trim());
        Self::iter()
            .find(|vector| UniCase::new(vector.name()) == name)
            .ok_or_else(|| SimulationError::UnknownEnergyVector(name.to_string()))
    }
}

impl fmt::Display for EnergyVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Serialize for EnergyVector {
    fn serialize<S: Serializer>(&self, serialiser: S) -> Result<S::Ok, S::Error> {
        serialiser.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for EnergyVector {
    fn deserialize<D: Deserializer<'de>>(deserialiser: D) -> Result<Self, D::Error> {
        let name: String = Deserialize::deserialize(deserialiser)?;
        Self::from_name(&name).map_err(serde::de::Error::custom)
    }
}
