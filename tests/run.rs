//! Integration tests for the `run` command.
use mves::cli::{RunOpts, handle_run_command};
use mves::settings::Settings;
use std::path::PathBuf;
use tempfile::tempdir;

/// Get the path to a bundled demo model.
fn get_model_dir() -> PathBuf {
    PathBuf::from("demos/simple")
}

/// The files written by every run
const OUTPUT_FILES: [&str; 8] = [
    "metadata.toml",
    "results.json",
    "cost_matrix.csv",
    "scalar_matrix.csv",
    "kpi_scalars.csv",
    "kpi_scalars_per_carrier.csv",
    "optimized_flows.csv",
    "mves_info.log",
];

/// An integration test for the `run` command.
#[test]
fn test_handle_run_command() {
    unsafe { std::env::set_var("MVES_LOG_LEVEL", "off") };

    // Save results to non-existent directory to check that directory creation works
    let tempdir = tempdir().unwrap();
    let output_dir = tempdir.path().join("results");
    let opts = RunOpts {
        output_dir: Some(output_dir.clone()),
        overwrite: false,
        debug_model: true,
    };
    handle_run_command(&get_model_dir(), &opts, Some(Settings::default())).unwrap();
    for file_name in OUTPUT_FILES {
        assert!(output_dir.join(file_name).is_file(), "{file_name} missing");
    }
    assert!(output_dir.join("debug_bus_prices.csv").is_file());

    let results: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output_dir.join("results.json")).unwrap())
            .unwrap();
    assert!(results["objective_value"].is_number());
    assert!(results["kpi"]["scalars_dict"]["cost_total"].is_number());
    assert!(results["energyProduction"]["pv"]["optimizedAddCap"].is_number());

    // The output folder is no longer empty
    let opts = RunOpts {
        output_dir: Some(output_dir.clone()),
        ..RunOpts::default()
    };
    assert_eq!(
        handle_run_command(&get_model_dir(), &opts, Some(Settings::default()))
            .unwrap_err()
            .to_string(),
        format!(
            "Failed to create output directory: {}",
            output_dir.display()
        )
    );

    // ...unless overwriting is allowed
    let opts = RunOpts {
        output_dir: Some(output_dir.clone()),
        overwrite: true,
        debug_model: false,
    };
    handle_run_command(&get_model_dir(), &opts, Some(Settings::default())).unwrap();
    assert!(!output_dir.join("debug_bus_prices.csv").exists());
}
