//! Common functionality for the multi-vector energy system simulator.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod asset;
pub mod bus;
pub mod carrier;
pub mod cli;
pub mod error;
pub mod finance;
pub mod graph;
pub mod id;
pub mod input;
pub mod kpi;
pub mod log;
pub mod model;
pub mod output;
pub mod preprocessing;
pub mod quantity;
pub mod settings;
pub mod simulation;
pub mod units;
pub mod validation;

#[cfg(test)]
mod fixture;

/// Get config dir for program.
///
/// This is a subfolder of the user's configuration directory (e.g. `~/.config/mves` on Linux).
pub fn get_mves_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // No config dir, so use the current working directory instead
        return PathBuf::default();
    };

    config_dir.push("mves");
    config_dir
}
