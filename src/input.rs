//! Common routines for handling input data.
use crate::error::SimulationError;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

pub mod asset;
pub use asset::InputBundle;
pub mod time_series;

/// The name of the input file in the model directory
pub const INPUT_FILE_NAME: &str = "input.json";

/// The name of the folder containing time series CSV files
pub const TIME_SERIES_DIR_NAME: &str = "time_series";

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Check that a file exists, raising [`SimulationError::MissingFile`] if it doesn't
pub fn check_file_exists(file_path: &Path) -> Result<()> {
    if !file_path.is_file() {
        Err(SimulationError::MissingFile(
            file_path.display().to_string(),
        ))?;
    }

    Ok(())
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Parse a JSON file at the specified path
pub fn read_json<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    check_file_exists(file_path)?;
    let json_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let json_data = serde_json::from_str(&json_str).with_context(|| input_err_msg(file_path))?;
    Ok(json_data)
}

/// Read the input bundle from the model directory
pub fn read_input_bundle(model_dir: &Path) -> Result<InputBundle> {
    read_json(&model_dir.join(INPUT_FILE_NAME))
}

/// A value that may be given bare or wrapped in a `{value, unit}` quantity
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MaybeParam<T> {
    /// The bare value
    Plain(T),
    /// The value with a unit
    Param(crate::quantity::Param<T>),
}

impl<T> MaybeParam<T> {
    /// Get the contained value, dropping the unit
    pub fn into_inner(self) -> T {
        match self {
            Self::Plain(value) => value,
            Self::Param(param) => param.value,
        }
    }
}

impl<T: Default> Default for MaybeParam<T> {
    fn default() -> Self {
        Self::Plain(T::default())
    }
}

/// Convert a number given as a float into an integer, checking it is positive and whole
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn positive_whole(value: f64, name: &str) -> Result<u32> {
    ensure!(
        value.is_finite() && value > 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX),
        "{name} must be a positive whole number (got {value})"
    );

    Ok(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Record {
        id: String,
        value: u32,
    }

    #[test]
    fn test_read_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.toml");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "id = \"hello\"\nvalue = 1").unwrap();
        }

        assert_eq!(
            read_toml::<Record>(&file_path).unwrap(),
            Record {
                id: "hello".to_string(),
                value: 1,
            }
        );

        // Invalid TOML
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "bad toml syntax").unwrap();
        }
        assert!(read_toml::<Record>(&file_path).is_err());
    }

    #[test]
    fn test_read_json_missing_file() {
        let dir = tempdir().unwrap();
        let err = read_json::<Record>(&dir.path().join("input.json")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SimulationError>(),
            Some(SimulationError::MissingFile(_))
        ));
    }

    #[test]
    fn test_maybe_param() {
        let plain: MaybeParam<String> = serde_json::from_str(r#""EUR""#).unwrap();
        assert_eq!(plain.into_inner(), "EUR");
        let param: MaybeParam<String> =
            serde_json::from_str(r#"{"value": "EUR", "unit": "str"}"#).unwrap();
        assert_eq!(param.into_inner(), "EUR");
    }

    #[test]
    fn test_positive_whole() {
        assert_eq!(positive_whole(20.0, "lifetime").unwrap(), 20);
        assert_error!(
            positive_whole(0.0, "lifetime"),
            "lifetime must be a positive whole number (got 0)"
        );
        assert!(positive_whole(2.5, "lifetime").is_err());
    }
}
