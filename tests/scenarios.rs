//! End-to-end simulations of small energy systems, checking physical and economic properties of
//! the results.
use float_cmp::{approx_eq, assert_approx_eq};
use mves::asset::{AssetGroup, AssetKind};
use mves::model::Model;
use mves::simulation::{SimulationOutcome, simulate};
use serde_json::{Value, json};
use std::fs;
use tempfile::tempdir;

/// Tolerance for balances computed from the solver's solution
const TOLERANCE: f64 = 1e-4;

/// A day of solar availability (kW/kWp)
const PV_PROFILE: [f64; 24] = [
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.05, 0.2, 0.4, 0.6, 0.75, 0.85, 0.9, 0.85, 0.75, 0.6, 0.4, 0.2,
    0.05, 0.0, 0.0, 0.0, 0.0, 0.0,
];

/// A day of electricity demand (kW)
const DEMAND: [f64; 24] = [
    5.0, 5.0, 5.0, 5.0, 5.0, 6.0, 8.0, 10.0, 10.0, 9.0, 8.0, 8.0, 8.0, 8.0, 8.0, 9.0, 10.0, 12.0,
    12.0, 11.0, 9.0, 7.0, 6.0, 5.0,
];

/// An input bundle without assets
fn base_input(days: u32, timestep: u32) -> Value {
    json!({
        "project_data": {"project_id": "test", "scenario_id": "s1"},
        "simulation_settings": {
            "start_date": "2019-01-01 00:00",
            "evaluated_period": {"value": days, "unit": "day"},
            "timestep": {"value": timestep, "unit": "minute"}
        },
        "economic_data": {
            "currency": "EUR",
            "discount_factor": {"value": 0.06, "unit": "factor"},
            "project_duration": {"value": 20, "unit": "year"},
            "tax": {"value": 0.0, "unit": "factor"}
        }
    })
}

/// A grid connection on the electricity bus
fn dso(feedin_tariff: f64) -> Value {
    json!({
        "energyVector": "Electricity",
        "inflow_direction": "Electricity",
        "outflow_direction": "Electricity",
        "energy_price": {"value": 0.3, "unit": "currency/kWh"},
        "feedin_tariff": {"value": feedin_tariff, "unit": "currency/kWh"},
        "renewable_share": {"value": 0.1, "unit": "factor"},
        "emission_factor": {"value": 0.5, "unit": "kgCO2eq/kWh"}
    })
}

/// A PV system on the electricity bus
fn pv(installed: f64, optimise: bool) -> Value {
    json!({
        "energyVector": "Electricity",
        "outflow_direction": "Electricity",
        "optimizeCap": {"value": optimise, "unit": "bool"},
        "installedCap": {"value": installed, "unit": "kWp"},
        "specific_costs": {"value": 1000.0, "unit": "currency/kWp"},
        "specific_costs_om": {"value": 10.0, "unit": "currency/kWp/year"},
        "timeseries": {"value": PV_PROFILE, "unit": "kW/kWp"},
        "renewableAsset": {"value": true, "unit": "bool"}
    })
}

/// An electricity demand
fn demand() -> Value {
    json!({
        "energyVector": "Electricity",
        "inflow_direction": "Electricity",
        "timeseries": {"value": DEMAND, "unit": "kW"}
    })
}

/// Write the input bundle to a model folder and simulate it
fn simulate_input(input: &Value) -> (Model, SimulationOutcome) {
    unsafe { std::env::set_var("MVES_LOG_LEVEL", "off") };

    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("input.json"),
        serde_json::to_string_pretty(input).unwrap(),
    )
    .unwrap();
    let model = Model::from_path(dir.path()).unwrap();
    let outcome = simulate(&model).unwrap();

    (model, outcome)
}

/// Total flow of the named asset
fn total_flow(model: &Model, outcome: &SimulationOutcome, label: &str) -> f64 {
    let asset = model.assets.get_by_label(label).unwrap();
    outcome.results.get(asset.id).summary.total_flow
}

/// Total flow into the excess sinks
fn total_excess(model: &Model, outcome: &SimulationOutcome) -> f64 {
    model
        .assets
        .iter_group(&AssetGroup::Excess)
        .map(|asset| outcome.results.get(asset.id).summary.total_flow)
        .sum()
}

/// Check that every bus is balanced in every time step
fn assert_buses_balanced(model: &Model, outcome: &SimulationOutcome) {
    for (bus_id, flows) in &outcome.results.bus_flows {
        for t in 0..model.periods() {
            let balance: f64 = flows.values().map(|flow| flow.get(t)).sum();
            assert!(
                balance.abs() < TOLERANCE,
                "{bus_id} is unbalanced in time step {t}: {balance}"
            );
        }
    }
}

/// Check the economic identities of the total costs
fn assert_cost_identities(model: &Model, outcome: &SimulationOutcome) {
    let costs = &outcome.kpi.scalars.costs;
    assert_approx_eq!(
        f64,
        costs.annuity_total.value(),
        (costs.cost_total * model.economic_data.crf).value(),
        epsilon = TOLERANCE
    );
    for row in &outcome.kpi.cost_matrix.rows {
        assert!(row.cost_replacement.value() >= 0.0, "{}", row.label);
    }

    let scalars = &outcome.kpi.scalars;
    assert!((0.0..=1.0 + TOLERANCE).contains(&scalars.renewable_factor));
    if let Some(doa) = scalars.degree_of_autonomy {
        assert!((-TOLERANCE..=1.0 + TOLERANCE).contains(&doa));
    }
}

#[test]
fn test_inverter_between_ac_and_dc_buses() {
    let mut input = base_input(1, 60);
    input["energyProduction"] = json!({
        "generator": {
            "energyVector": "Electricity",
            "outflow_direction": "AC",
            "dispatchable": {"value": true, "unit": "bool"},
            "installedCap": {"value": 20.0, "unit": "kW"},
            "dispatch_price": {"value": 0.2, "unit": "currency/kWh"}
        }
    });
    input["energyConversion"] = json!({
        "inverter": {
            "energyVector": "Electricity",
            "inflow_direction": "AC",
            "outflow_direction": "DC",
            "optimizeCap": {"value": false, "unit": "bool"},
            "installedCap": {"value": 20.0, "unit": "kW"},
            "efficiency": {"value": 0.9, "unit": "factor"}
        }
    });
    input["energyConsumption"] = json!({
        "dc_demand": {
            "energyVector": "Electricity",
            "inflow_direction": "DC",
            "timeseries": {"value": vec![10.0; 24], "unit": "kW"}
        }
    });

    let (model, outcome) = simulate_input(&input);
    assert_buses_balanced(&model, &outcome);

    let inverter = model.assets.get_by_label("inverter").unwrap();
    let results = outcome.results.get(inverter.id);
    for t in 0..model.periods() {
        assert_approx_eq!(
            f64,
            results.input_flows[0].get(t),
            10.0 / 0.9,
            epsilon = TOLERANCE
        );
    }
    assert_approx_eq!(
        f64,
        total_flow(&model, &outcome, "DC_excess"),
        0.0,
        epsilon = TOLERANCE
    );
    assert_approx_eq!(
        f64,
        total_flow(&model, &outcome, "generator"),
        240.0 / 0.9,
        epsilon = TOLERANCE
    );
}

#[test]
fn test_bus_balance_with_transformer() {
    let mut input = base_input(1, 60);
    input["energyProduction"] = json!({"pv": pv(30.0, false)});
    input["energyConsumption"] = json!({
        "demand": demand(),
        "h2_demand": {
            "energyVector": "H2",
            "inflow_direction": "H2",
            "timeseries": {"value": vec![1.0; 24], "unit": "kgH2/h"}
        }
    });
    input["energyConversion"] = json!({
        "electrolyser": {
            "energyVector": "H2",
            "inflow_direction": "Electricity",
            "outflow_direction": "H2",
            "optimizeCap": {"value": true, "unit": "bool"},
            "specific_costs": {"value": 500.0, "unit": "currency/kgH2/h"},
            "efficiency": {"value": 0.05, "unit": "kgH2/kWh"}
        }
    });
    input["energyProviders"] = json!({"dso": dso(0.05)});

    let (model, outcome) = simulate_input(&input);
    assert_buses_balanced(&model, &outcome);
    assert_cost_identities(&model, &outcome);

    let electrolyser = model.assets.get_by_label("electrolyser").unwrap();
    let results = outcome.results.get(electrolyser.id);
    for t in 0..model.periods() {
        assert_approx_eq!(
            f64,
            results.output_flows[0].get(t),
            0.05 * results.input_flows[0].get(t),
            epsilon = TOLERANCE
        );
    }
    assert_approx_eq!(f64, results.total_output(), 24.0, epsilon = TOLERANCE);

    // Output capacity covers the peak H2 demand
    assert_approx_eq!(
        f64,
        results.optimized_add_cap.value(),
        1.0,
        epsilon = TOLERANCE
    );
}

#[test]
fn test_positive_feedin_tariff() {
    let mut input = base_input(1, 60);
    input["energyProduction"] = json!({"pv": pv(40.0, false)});
    input["energyConsumption"] = json!({"demand": demand()});
    input["energyProviders"] = json!({"dso": dso(0.05)});

    let (model, outcome) = simulate_input(&input);
    assert_buses_balanced(&model, &outcome);
    assert_cost_identities(&model, &outcome);

    // Surplus PV generation earns the tariff instead of being dumped
    assert!(total_flow(&model, &outcome, "dso_feedin") > 1.0);
    assert_approx_eq!(
        f64,
        total_excess(&model, &outcome),
        0.0,
        epsilon = TOLERANCE
    );

    let totals = &outcome.kpi.scalars.totals_eleq;
    let fraction = outcome.kpi.scalars.onsite_energy_fraction.unwrap();
    assert_approx_eq!(
        f64,
        fraction + totals.total_feedin / totals.total_generation_in_les,
        1.0,
        epsilon = TOLERANCE
    );
}

#[test]
fn test_feedin_with_capped_pv_investment() {
    // Feeding in earns more than PV costs, so the investment runs up to its cap
    let mut pv = pv(0.0, true);
    pv["maximumCap"] = json!({"value": 50.0, "unit": "kWp"});
    let mut input = base_input(1, 60);
    input["energyProduction"] = json!({"pv": pv});
    input["energyConsumption"] = json!({"demand": demand()});
    input["energyProviders"] = json!({"dso": dso(0.08)});

    let (model, outcome) = simulate_input(&input);
    assert_buses_balanced(&model, &outcome);
    assert_cost_identities(&model, &outcome);

    let pv_asset = model.assets.get_by_label("pv").unwrap();
    assert_approx_eq!(
        f64,
        outcome.results.get(pv_asset.id).optimized_add_cap.value(),
        50.0,
        epsilon = TOLERANCE
    );
    assert!(total_flow(&model, &outcome, "dso_feedin") > 1.0);
    assert_approx_eq!(
        f64,
        total_excess(&model, &outcome),
        0.0,
        epsilon = TOLERANCE
    );

    let totals = &outcome.kpi.scalars.totals_eleq;
    let fraction = outcome.kpi.scalars.onsite_energy_fraction.unwrap();
    assert_approx_eq!(
        f64,
        fraction + totals.total_feedin / totals.total_generation_in_les,
        1.0,
        epsilon = TOLERANCE
    );
}

#[test]
fn test_negative_feedin_tariff() {
    let mut input = base_input(1, 60);
    input["energyProduction"] = json!({"pv": pv(40.0, false)});
    input["energyConsumption"] = json!({"demand": demand()});
    input["energyProviders"] = json!({"dso": dso(-0.05)});

    let (model, outcome) = simulate_input(&input);
    assert_buses_balanced(&model, &outcome);
    assert_cost_identities(&model, &outcome);

    // Feeding in costs money, so the surplus goes to the excess sink
    assert_approx_eq!(
        f64,
        total_flow(&model, &outcome, "dso_feedin"),
        0.0,
        epsilon = TOLERANCE
    );
    assert!(total_excess(&model, &outcome) > 1.0);
}

#[test]
fn test_minimal_renewable_share() {
    // Per unit of energy, PV is dearer than the grid
    let mut pv = pv(0.0, true);
    pv["specific_costs"]["value"] = json!(10000.0);
    let mut provider = dso(0.0);
    provider["renewable_share"]["value"] = json!(0.2);
    let mut input = base_input(1, 60);
    input["energyProduction"] = json!({"pv": pv});
    input["energyConsumption"] = json!({"demand": demand()});
    input["energyProviders"] = json!({"dso": provider});

    // Without the constraint, the grid supplies everything
    let (model, unconstrained) = simulate_input(&input);
    assert_approx_eq!(
        f64,
        unconstrained.kpi.scalars.renewable_factor,
        0.2,
        epsilon = TOLERANCE
    );
    assert_approx_eq!(
        f64,
        total_flow(&model, &unconstrained, "dso_consumption"),
        DEMAND.iter().sum::<f64>(),
        epsilon = TOLERANCE
    );

    input["constraints"] = json!({
        "minimal_renewable_share": {"value": 0.5, "unit": "factor"}
    });
    let (model, outcome) = simulate_input(&input);
    assert_buses_balanced(&model, &outcome);
    assert_cost_identities(&model, &outcome);
    assert!(outcome.kpi.scalars.renewable_factor >= 0.5 - TOLERANCE);
    let pv_asset = model.assets.get_by_label("pv").unwrap();
    assert!(outcome.results.get(pv_asset.id).optimized_add_cap.value() > 0.0);

    // The constraint binds, so meeting it costs more
    assert!(outcome.objective_value.value() > unconstrained.objective_value.value() + TOLERANCE);
}

#[test]
fn test_peak_demand_pricing_periods() {
    let mut provider = dso(0.0);
    provider["peak_demand_pricing"] = json!({"value": 100.0, "unit": "currency/kW"});
    provider["peak_demand_pricing_period"] = json!({"value": 4, "unit": "times per year"});
    let mut input = base_input(365, 1440);
    input["energyConsumption"] = json!({
        "demand": {
            "energyVector": "Electricity",
            "inflow_direction": "Electricity",
            "timeseries": {"value": vec![10.0; 365], "unit": "kW"}
        }
    });
    input["energyProviders"] = json!({"dso": provider});

    let (model, outcome) = simulate_input(&input);
    assert_buses_balanced(&model, &outcome);
    assert_cost_identities(&model, &outcome);

    let days = [90.0, 91.0, 92.0, 92.0];
    let mut invested = 0.0;
    let mut supplied = 0.0;
    for (period, days) in days.iter().enumerate() {
        let label = format!("dso_consumption_period_{}", period + 1);
        let asset = model.assets.get_by_label(&label).unwrap();
        let AssetKind::Source(source) = &asset.kind else {
            panic!("{label} is not a source");
        };
        let mask = &source.timeseries.as_ref().unwrap().series;
        let results = outcome.results.get(asset.id);

        // Each period supplies the demand only within its own months and pays for its own peak
        for t in 0..model.periods() {
            if approx_eq!(f64, mask.get(t), 0.0) {
                assert_approx_eq!(f64, results.summary.flow.get(t), 0.0, epsilon = TOLERANCE);
            }
        }
        assert_approx_eq!(
            f64,
            results.summary.total_flow,
            10.0 * days,
            epsilon = TOLERANCE
        );
        assert_approx_eq!(
            f64,
            results.optimized_add_cap.value(),
            10.0,
            epsilon = TOLERANCE
        );
        invested += results.optimized_add_cap.value();
        supplied += results.summary.total_flow;
    }

    // The provider is charged the peak price on the capacity of every period, on top of the energy
    let annuity_factor = model.economic_data.annuity_factor.value();
    let provider = outcome.kpi.cost_matrix.get("dso").unwrap();
    assert_approx_eq!(
        f64,
        provider.cost_om_fix.value(),
        100.0 * invested * annuity_factor,
        epsilon = 1e-2
    );
    assert_approx_eq!(
        f64,
        provider.cost_total.value(),
        (100.0 * invested + 0.3 * supplied) * annuity_factor,
        epsilon = 1e-2
    );
}

#[test]
fn test_storage_thermal_losses() {
    let mut input = base_input(1, 60);
    input["energyProduction"] = json!({
        "boiler": {
            "energyVector": "Heat",
            "outflow_direction": "Heat",
            "dispatchable": {"value": true, "unit": "bool"},
            "installedCap": {"value": 20.0, "unit": "kW"},
            "dispatch_price": {"value": 0.05, "unit": "currency/kWh"}
        }
    });
    input["energyConsumption"] = json!({
        "heat_demand": {
            "energyVector": "Heat",
            "inflow_direction": "Heat",
            "timeseries": {"value": vec![5.0; 24], "unit": "kW"}
        }
    });
    input["energyStorage"] = json!({
        "tank": {
            "energyVector": "Heat",
            "inflow_direction": "Heat",
            "outflow_direction": "Heat",
            "optimizeCap": {"value": false, "unit": "bool"},
            "storage_capacity": {
                "installedCap": {"value": 100.0, "unit": "kWh"},
                "soc_initial": {"value": 0.5, "unit": "factor"},
                "fixed_thermal_losses_relative": {"value": 0.01, "unit": "factor"},
                "fixed_thermal_losses_absolute": {"value": 0.2, "unit": "kWh"}
            },
            "input_power": {"installedCap": {"value": 20.0, "unit": "kW"}},
            "output_power": {"installedCap": {"value": 20.0, "unit": "kW"}}
        }
    });

    let (model, outcome) = simulate_input(&input);
    assert_buses_balanced(&model, &outcome);

    let tank = model.assets.get_by_label("tank").unwrap();
    let storage = outcome.results.get(tank.id).storage.as_ref().unwrap();
    let content = &storage.storage_capacity.storage_content;
    let charge = &storage.input_power.summary.flow;
    let discharge = &storage.output_power.summary.flow;

    // 1% of the capacity plus a fixed amount is lost in every time step
    let loss = 0.01 * 100.0 + 0.2;
    let mut previous = 50.0;
    for t in 0..model.periods() {
        assert_approx_eq!(
            f64,
            content.get(t),
            previous - loss + charge.get(t) - discharge.get(t),
            epsilon = TOLERANCE
        );
        assert!(content.get(t) >= -TOLERANCE);
        previous = content.get(t);
    }

    // The boiler covers the demand and the losses (less any energy drawn from the initial content)
    let boiler = total_flow(&model, &outcome, "boiler");
    let drawn = 50.0 - content.get(model.periods() - 1);
    assert_approx_eq!(
        f64,
        boiler + drawn,
        5.0 * 24.0 + loss * 24.0 + total_excess(&model, &outcome),
        epsilon = TOLERANCE
    );
}

/// A heat system in which a cheap boiler runs only in the morning and a storage can shift its heat
/// into the afternoon
fn shifting_input(self_discharge: f64) -> Value {
    let mut availability = vec![1.0; 12];
    availability.extend([0.0; 12]);
    let mut input = base_input(1, 60);
    input["energyProduction"] = json!({
        "cheap_boiler": {
            "energyVector": "Heat",
            "outflow_direction": "Heat",
            "dispatchable": {"value": true, "unit": "bool"},
            "installedCap": {"value": 100.0, "unit": "kW"},
            "dispatch_price": {"value": 0.05, "unit": "currency/kWh"},
            "timeseries": {"value": availability, "unit": "factor"}
        },
        "boiler": {
            "energyVector": "Heat",
            "outflow_direction": "Heat",
            "dispatchable": {"value": true, "unit": "bool"},
            "installedCap": {"value": 20.0, "unit": "kW"},
            "dispatch_price": {"value": 0.1, "unit": "currency/kWh"}
        }
    });
    input["energyConsumption"] = json!({
        "heat_demand": {
            "energyVector": "Heat",
            "inflow_direction": "Heat",
            "timeseries": {"value": vec![5.0; 24], "unit": "kW"}
        }
    });
    input["energyStorage"] = json!({
        "tank": {
            "energyVector": "Heat",
            "inflow_direction": "Heat",
            "outflow_direction": "Heat",
            "optimizeCap": {"value": true, "unit": "bool"},
            "storage_capacity": {
                "specific_costs": {"value": 10.0, "unit": "currency/kWh"},
                "efficiency": {"value": self_discharge, "unit": "factor"}
            },
            "input_power": {},
            "output_power": {}
        }
    });
    input
}

/// The optimised capacity of the tank
fn tank_capacity(model: &Model, outcome: &SimulationOutcome) -> f64 {
    let tank = model.assets.get_by_label("tank").unwrap();
    let storage = outcome.results.get(tank.id).storage.as_ref().unwrap();
    storage.storage_capacity.optimized_add_cap.value()
}

#[test]
fn test_storage_losses_shrink_optimal_capacity() {
    // Without losses, the whole afternoon demand is shifted
    let (model, lossless) = simulate_input(&shifting_input(0.0));
    assert_buses_balanced(&model, &lossless);
    let lossless_capacity = tank_capacity(&model, &lossless);
    assert_approx_eq!(f64, lossless_capacity, 60.0, epsilon = 1e-3);

    // Heat held for many hours loses more than the price difference, so less of it is stored
    let (model, lossy) = simulate_input(&shifting_input(0.1));
    assert_buses_balanced(&model, &lossy);
    let lossy_capacity = tank_capacity(&model, &lossy);
    assert!(lossy_capacity > 1.0);
    assert!(lossy_capacity < lossless_capacity - 1.0);
    assert!(total_flow(&model, &lossy, "boiler") > total_flow(&model, &lossless, "boiler"));
}

/// PV with a grid connection, with every price multiplied by `scale`
fn priced_input(scale: f64) -> Value {
    let mut pv = pv(0.0, true);
    pv["specific_costs"]["value"] = json!(1000.0 * scale);
    pv["specific_costs_om"]["value"] = json!(10.0 * scale);
    let mut provider = dso(0.02 * scale);
    provider["energy_price"]["value"] = json!(0.3 * scale);
    let mut input = base_input(1, 60);
    input["energyProduction"] = json!({"pv": pv});
    input["energyConsumption"] = json!({"demand": demand()});
    input["energyProviders"] = json!({"dso": provider});
    input
}

#[test]
fn test_doubling_prices_doubles_costs() {
    let (model, base) = simulate_input(&priced_input(1.0));
    let (_, doubled) = simulate_input(&priced_input(2.0));

    // The dispatch is unchanged
    assert_approx_eq!(
        f64,
        total_flow(&model, &doubled, "pv"),
        total_flow(&model, &base, "pv"),
        epsilon = TOLERANCE
    );
    assert_approx_eq!(
        f64,
        total_flow(&model, &doubled, "dso_consumption"),
        total_flow(&model, &base, "dso_consumption"),
        epsilon = TOLERANCE
    );
    let pv_asset = model.assets.get_by_label("pv").unwrap();
    assert_approx_eq!(
        f64,
        doubled.results.get(pv_asset.id).optimized_add_cap.value(),
        base.results.get(pv_asset.id).optimized_add_cap.value(),
        epsilon = TOLERANCE
    );

    // Every cost doubles
    assert_approx_eq!(
        f64,
        doubled.objective_value.value(),
        2.0 * base.objective_value.value(),
        epsilon = TOLERANCE
    );
    assert_approx_eq!(
        f64,
        doubled.kpi.scalars.costs.cost_total.value(),
        2.0 * base.kpi.scalars.costs.cost_total.value(),
        epsilon = 1e-2
    );
}
