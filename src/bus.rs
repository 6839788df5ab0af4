//! Buses balance the flows of one energy carrier between the assets connected to them.
use crate::asset::AssetID;
use crate::carrier::EnergyVector;
use crate::id::define_id_type;
use indexmap::{IndexMap, IndexSet};

define_id_type! {BusID}

/// The suffix appended to a direction name to give the bus name
const BUS_SUFFIX: &str = " bus";

/// A map of buses, keyed by bus ID
pub type BusMap = IndexMap<BusID, Bus>;

/// A balanced node for a single energy carrier
#[derive(Debug, Clone, PartialEq)]
pub struct Bus {
    /// Bus name, `"<direction name> bus"`
    pub id: BusID,
    /// The carrier flowing through the bus
    pub energy_vector: EnergyVector,
    /// Every asset with a port on this bus, including the excess sink
    pub assets: IndexSet<AssetID>,
}

impl Bus {
    /// Create a bus with no assets
    pub fn new(id: BusID, energy_vector: EnergyVector) -> Self {
        Self {
            id,
            energy_vector,
            assets: IndexSet::new(),
        }
    }

    /// The direction name the bus was created from
    pub fn short_name(&self) -> &str {
        strip_bus_suffix(&self.id)
    }
}

/// Get the bus ID for a direction name
pub fn bus_id_for(direction: &str) -> BusID {
    let direction = direction.trim();
    if direction.ends_with(BUS_SUFFIX) {
        direction.into()
    } else {
        format!("{direction}{BUS_SUFFIX}").into()
    }
}

/// Remove the bus suffix from a bus ID
fn strip_bus_suffix(id: &BusID) -> &str {
    id.as_str().strip_suffix(BUS_SUFFIX).unwrap_or(id.as_str())
}

/// The label of the excess sink attached to a bus
pub fn excess_label(id: &BusID) -> String {
    format!("{}_excess", strip_bus_suffix(id))
}
