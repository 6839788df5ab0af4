//! Fixtures for tests

use crate::asset::{
    Asset, AssetGroup, AssetID, AssetKind, Component, Ports, Source, TimeSeriesStats,
};
use crate::bus::{BusID, bus_id_for};
use crate::carrier::EnergyVector;
use crate::input::{INPUT_FILE_NAME, TIME_SERIES_DIR_NAME};
use crate::model::EconomicData;
use crate::quantity::TimeSeries;
use crate::units::{Dimensionless, MoneyPerCapacity};
use itertools::Itertools;
use rstest::fixture;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Hourly demand used by the minimal model (kW)
pub const DEMAND: [f64; 24] = [
    5.0, 5.0, 5.0, 5.0, 5.0, 6.0, 8.0, 10.0, 10.0, 9.0, 8.0, 8.0, 8.0, 8.0, 8.0, 9.0, 10.0, 12.0,
    12.0, 11.0, 9.0, 7.0, 6.0, 5.0,
];

#[fixture]
pub fn electricity_bus() -> BusID {
    bus_id_for("Electricity")
}

#[fixture]
pub fn economic_data() -> EconomicData {
    EconomicData::new("EUR".into(), Dimensionless(0.06), 20, Dimensionless(0.0))
}

#[fixture]
pub fn pv_asset(electricity_bus: BusID) -> Asset {
    let mut capacity = Component::new("pv", 20);
    capacity.optimize_cap = true;
    capacity.costs.specific_costs = MoneyPerCapacity(1000.0);
    let profile = TimeSeries(vec![0.0, 0.5, 1.0, 0.5]);

    Asset {
        id: AssetID(0),
        label: "pv".into(),
        group: AssetGroup::Production,
        energy_vector: EnergyVector::Electricity,
        inputs: Ports::default(),
        outputs: Ports::single(electricity_bus),
        kind: AssetKind::Source(Source {
            capacity,
            dispatchable: false,
            timeseries: Some(TimeSeriesStats::new(profile)),
            renewable_share: Dimensionless(1.0),
            emission_factor: 0.0,
        }),
    }
}

/// A one-day, hourly model with a diesel generator, a demand and a grid connection
#[fixture]
pub fn minimal_input() -> Value {
    json!({
        "project_data": {
            "project_id": "minimal",
            "project_name": "Minimal",
            "scenario_id": "s1",
            "scenario_name": "Base",
            "country": "Nowhere",
            "latitude": {"value": 50.0, "unit": "deg"},
            "longitude": {"value": 10.0, "unit": "deg"}
        },
        "simulation_settings": {
            "start_date": "2018-01-01 00:00",
            "evaluated_period": {"value": 1, "unit": "day"},
            "timestep": {"value": 60, "unit": "minute"}
        },
        "economic_data": {
            "currency": "EUR",
            "discount_factor": {"value": 0.06, "unit": "factor"},
            "project_duration": {"value": 20, "unit": "year"},
            "tax": {"value": 0.0, "unit": "factor"}
        },
        "energyProduction": {
            "diesel": {
                "energyVector": "Electricity",
                "outflow_direction": "Electricity",
                "dispatchable": {"value": true, "unit": "bool"},
                "installedCap": {"value": 20.0, "unit": "kW"},
                "dispatch_price": {"value": 0.3, "unit": "currency/kWh"},
                "emission_factor": {"value": 0.8, "unit": "kgCO2eq/kWh"}
            }
        },
        "energyConsumption": {
            "demand": {
                "energyVector": "Electricity",
                "inflow_direction": "Electricity",
                "timeseries": {"value": DEMAND, "unit": "kW"}
            }
        },
        "energyProviders": {
            "dso": {
                "energyVector": "Electricity",
                "inflow_direction": "Electricity",
                "outflow_direction": "Electricity",
                "energy_price": {"value": 0.4, "unit": "currency/kWh"},
                "feedin_tariff": {"value": 0.1, "unit": "currency/kWh"},
                "peak_demand_pricing": {"value": 0.0, "unit": "currency/kW"},
                "peak_demand_pricing_period": {"value": 1, "unit": "times per year"},
                "renewable_share": {"value": 0.3, "unit": "factor"},
                "emission_factor": {"value": 0.5, "unit": "kgCO2eq/kWh"}
            }
        }
    })
}

/// Write the input bundle into a model directory
pub fn write_model_dir(dir: &Path, input: &Value) {
    let json = serde_json::to_string_pretty(input).unwrap();
    fs::write(dir.join(INPUT_FILE_NAME), json).unwrap();
}

/// Write a single-column time series CSV into the model's `time_series` folder
pub fn write_time_series(dir: &Path, file_name: &str, header: &str, values: &[f64]) {
    let ts_dir = dir.join(TIME_SERIES_DIR_NAME);
    fs::create_dir_all(&ts_dir).unwrap();
    let contents = format!("{header}\n{}\n", values.iter().join("\n"));
    fs::write(ts_dir.join(file_name), contents).unwrap();
}
