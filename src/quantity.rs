//! Quantities as they appear in the input bundle, and the values they can hold.
//!
//! Prices and efficiencies may be scalars, per-port lists or time series. [`ParamValue`] treats all
//! of these uniformly so that the economics kernel and the model builder can pattern-match on it.
use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

/// A value paired with its (free-form) unit, e.g. `{"value": 4000, "unit": "currency/kW"}`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Param<T> {
    /// The value
    pub value: T,
    /// The unit (not interpreted)
    #[serde(default)]
    pub unit: String,
}

impl<T> Param<T> {
    /// Create a new parameter with the given unit
    pub fn new(value: T, unit: &str) -> Self {
        Self {
            value,
            unit: unit.to_string(),
        }
    }
}

/// A reference to a column of a CSV file in the model's `time_series` folder
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct TimeSeriesRef {
    /// The CSV file name
    pub file_name: String,
    /// The header of the column to read
    pub header: String,
}

/// A series of values aligned with the simulation time index
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TimeSeries(pub Vec<f64>);

impl TimeSeries {
    /// A series of `len` copies of `value`
    pub fn constant(value: f64, len: usize) -> Self {
        Self(vec![value; len])
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the series is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the values
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    /// The value at time step `t`
    pub fn get(&self, t: usize) -> f64 {
        self.0[t]
    }

    /// Sum of all values
    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Largest value, or zero for an empty series
    pub fn max(&self) -> f64 {
        if self.0.is_empty() {
            return 0.0;
        }
        self.0.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Smallest value, or zero for an empty series
    pub fn min(&self) -> f64 {
        if self.0.is_empty() {
            return 0.0;
        }
        self.0.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Mean value, or zero for an empty series
    pub fn mean(&self) -> f64 {
        if self.0.is_empty() {
            0.0
        } else {
            self.sum() / self.0.len() as f64
        }
    }

    /// Multiply every value by `factor`
    pub fn scale(&self, factor: f64) -> Self {
        Self(self.0.iter().map(|v| v * factor).collect())
    }

    /// Element-wise product with another series of the same length
    pub fn product(&self, other: &TimeSeries) -> Self {
        Self(self.iter().zip(other.iter()).map(|(a, b)| a * b).collect())
    }

    /// Element-wise sum with another series of the same length
    pub fn plus(&self, other: &TimeSeries) -> Self {
        Self(self.iter().zip(other.iter()).map(|(a, b)| a + b).collect())
    }
}

impl FromIterator<f64> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A parameter value which may be a scalar, a per-port list, a time series or a reference to a
/// time series which has not been loaded yet.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// A single number
    Scalar(f64),
    /// A reference to a CSV column, resolved during pre-processing
    Reference(TimeSeriesRef),
    /// One value per port
    List(Vec<ParamValue>),
    /// A resolved time series
    #[serde(skip_deserializing)]
    Series(TimeSeries),
}

impl Default for ParamValue {
    fn default() -> Self {
        Self::Scalar(0.0)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl ParamValue {
    /// Number of port entries this value provides, if it is a list
    pub fn list_len(&self) -> Option<usize> {
        match self {
            Self::List(values) => Some(values.len()),
            _ => None,
        }
    }

    /// Get the value for the given port, broadcasting scalars and series
    pub fn for_port(&self, port: usize) -> &ParamValue {
        match self {
            Self::List(values) => &values[port],
            _ => self,
        }
    }

    /// The value at time step `t` for a scalar or series.
    ///
    /// Lists must be indexed with [`ParamValue::for_port`] first. Unresolved references are
    /// rejected during pre-processing, so reaching one here is a programming error.
    pub fn at(&self, t: usize) -> f64 {
        match self {
            Self::Scalar(value) => *value,
            Self::Series(series) => series.get(t),
            Self::List(_) => panic!("Per-port list used where a single value was expected"),
            Self::Reference(r) => panic!("Unresolved time series reference: {}", r.file_name),
        }
    }

    /// Whether any contained value is a reference to an unloaded time series
    pub fn has_reference(&self) -> bool {
        match self {
            Self::Reference(_) => true,
            Self::List(values) => values.iter().any(ParamValue::has_reference),
            Self::Scalar(_) | Self::Series(_) => false,
        }
    }

    /// Iterate over every number contained in the value
    pub fn iter_numbers(&self) -> Box<dyn Iterator<Item = f64> + '_> {
        match self {
            Self::Scalar(value) => Box::new(std::iter::once(*value)),
            Self::Series(series) => Box::new(series.iter()),
            Self::List(values) => Box::new(values.iter().flat_map(ParamValue::iter_numbers)),
            Self::Reference(_) => Box::new(std::iter::empty()),
        }
    }

    /// Mean of a scalar or series (lists give the mean over all contained numbers)
    pub fn mean(&self) -> f64 {
        let (sum, count) = self
            .iter_numbers()
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        if count == 0 { 0.0 } else { sum / count as f64 }
    }

    /// Multiply every contained number by `factor`
    pub fn scaled(&self, factor: f64) -> ParamValue {
        match self {
            Self::Scalar(value) => Self::Scalar(value * factor),
            Self::Series(series) => Self::Series(series.scale(factor)),
            Self::List(values) => Self::List(values.iter().map(|v| v.scaled(factor)).collect()),
            Self::Reference(_) => self.clone(),
        }
    }

    /// Check that the value is usable for a direction with `ports` ports.
    ///
    /// Scalars and series are broadcast. Lists must have exactly one entry per port.
    pub fn check_ports(&self, ports: usize) -> Result<()> {
        if let Self::List(values) = self {
            ensure!(
                values.len() == ports,
                "Expected {ports} values (one per bus) but found {}",
                values.len()
            );
            ensure!(
                values.iter().all(|v| v.list_len().is_none()),
                "Nested lists are not supported"
            );
        }

        Ok(())
    }
}
