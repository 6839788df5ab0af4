//! Fatal error kinds which terminate a simulation run.
//!
//! These are carried inside [`anyhow::Error`] so that context can be attached as they propagate.
//! The binary searches the error chain for a [`SimulationError`] to decide on the exit code.
use std::error::Error;
use std::fmt;

/// A fatal error with a dedicated exit code
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// An asset refers to an energy carrier without an electricity-equivalent weight
    UnknownEnergyVector(String),
    /// Two or more assets share a label
    DuplicateLabel(String),
    /// An input file could not be found
    MissingFile(String),
    /// A time series has fewer values than there are simulated periods
    TimeSeriesTooShort {
        /// Where the series came from
        source: String,
        /// Number of values found
        found: usize,
        /// Number of values required
        required: usize,
    },
    /// A maximum capacity is invalid for the asset
    MaximumCapViolated(String),
    /// A feed-in tariff would allow unbounded profit
    FeedinArbitrage(String),
    /// The LP has no feasible solution
    LpInfeasible,
    /// The LP is unbounded
    LpUnbounded,
    /// The solver failed for another reason
    LpSolverError(String),
    /// An input value is outside its allowed range
    InvalidInputValue(String),
    /// A dispatch price has a shape that cannot be lifted to lifetime values
    WrongDispatchPriceType(String),
    /// Parameters required for an economic evaluation are absent
    MissingParametersForEconomicEvaluation {
        /// The asset being evaluated
        label: String,
        /// Every absent key
        missing: Vec<String>,
    },
}

impl SimulationError {
    /// The process exit code for this kind of error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnknownEnergyVector(_) => 2,
            Self::DuplicateLabel(_) => 3,
            Self::MissingFile(_) => 4,
            Self::TimeSeriesTooShort { .. } => 5,
            Self::MaximumCapViolated(_) => 6,
            Self::FeedinArbitrage(_) => 7,
            Self::LpInfeasible => 8,
            Self::LpUnbounded => 9,
            Self::LpSolverError(_) => 10,
            Self::InvalidInputValue(_)
            | Self::WrongDispatchPriceType(_)
            | Self::MissingParametersForEconomicEvaluation { .. } => 1,
        }
    }
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownEnergyVector(name) => write!(f, "Unknown energy vector: {name}"),
            Self::DuplicateLabel(label) => write!(f, "Duplicate asset label: {label}"),
            Self::MissingFile(path) => write!(f, "File not found: {path}"),
            Self::TimeSeriesTooShort {
                source,
                found,
                required,
            } => write!(
                f,
                "Time series {source} has {found} values but {required} periods are simulated"
            ),
            Self::MaximumCapViolated(msg) => write!(f, "Invalid maximum capacity: {msg}"),
            Self::FeedinArbitrage(msg) => write!(f, "Feed-in arbitrage possible: {msg}"),
            Self::LpInfeasible => write!(f, "The optimisation problem is infeasible"),
            Self::LpUnbounded => write!(f, "The optimisation problem is unbounded"),
            Self::LpSolverError(msg) => write!(f, "Solver error: {msg}"),
            Self::InvalidInputValue(msg) => write!(f, "Invalid input value: {msg}"),
            Self::WrongDispatchPriceType(msg) => write!(f, "Wrong dispatch price type: {msg}"),
            Self::MissingParametersForEconomicEvaluation { label, missing } => write!(
                f,
                "Missing parameters for economic evaluation of {label}: {}",
                missing.join(", ")
            ),
        }
    }
}

impl Error for SimulationError {}

/// Find the exit code for an error, falling back on 1 if it carries no [`SimulationError`]
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|e| e.downcast_ref::<SimulationError>())
        .map_or(1, SimulationError::exit_code)
}
