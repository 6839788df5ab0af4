//! Code for reading time series from CSV files in the `time_series` folder.
use super::{TIME_SERIES_DIR_NAME, check_file_exists, input_err_msg};
use crate::error::SimulationError;
use crate::quantity::{ParamValue, TimeSeries, TimeSeriesRef};
use anyhow::{Context, Result, ensure};
use std::path::Path;

/// Read the column referenced by `reference` and align it to the simulated periods.
///
/// Values beyond the number of periods are dropped.
///
/// # Arguments
///
/// * `model_dir` - Folder containing the model
/// * `reference` - The file name and column header to read
/// * `periods` - Number of simulated periods
pub fn read_time_series(
    model_dir: &Path,
    reference: &TimeSeriesRef,
    periods: usize,
) -> Result<TimeSeries> {
    let file_path = model_dir
        .join(TIME_SERIES_DIR_NAME)
        .join(&reference.file_name);
    check_file_exists(&file_path)?;

    let mut values = read_column(&file_path, &reference.header)
        .with_context(|| input_err_msg(&file_path))?;
    if values.len() < periods {
        Err(SimulationError::TimeSeriesTooShort {
            source: format!("{}:{}", reference.file_name, reference.header),
            found: values.len(),
            required: periods,
        })?;
    }
    values.truncate(periods);

    Ok(TimeSeries(values))
}

/// Read all values of the column with the given header
fn read_column(file_path: &Path, header: &str) -> Result<Vec<f64>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)?;

    let idx = reader
        .headers()?
        .iter()
        .position(|h| h == header.trim())
        .with_context(|| format!("Column {header} not found"))?;

    let mut values = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let field = record
            .get(idx)
            .with_context(|| format!("Row {} has no value for column {header}", row + 1))?;
        ensure!(!field.is_empty(), "Missing value in row {}", row + 1);
        let value: f64 = field
            .parse()
            .with_context(|| format!("Invalid value {field} in row {}", row + 1))?;
        ensure!(value.is_finite(), "Non-finite value in row {}", row + 1);
        values.push(value);
    }

    Ok(values)
}

/// Replace every time series reference contained in `value` with the series it points to
pub fn resolve_param_value(
    value: ParamValue,
    model_dir: &Path,
    periods: usize,
) -> Result<ParamValue> {
    let resolved = match value {
        ParamValue::Reference(reference) => {
            ParamValue::Series(read_time_series(model_dir, &reference, periods)?)
        }
        ParamValue::List(values) => ParamValue::List(
            values
                .into_iter()
                .map(|v| resolve_param_value(v, model_dir, periods))
                .collect::<Result<_>>()?,
        ),
        ParamValue::Series(series) => {
            ensure!(
                series.len() >= periods,
                SimulationError::TimeSeriesTooShort {
                    source: "inline series".into(),
                    found: series.len(),
                    required: periods,
                }
            );
            ParamValue::Series(TimeSeries(series.0[..periods].to_vec()))
        }
        scalar @ ParamValue::Scalar(_) => scalar,
    };

    Ok(resolved)
}
