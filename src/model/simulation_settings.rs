//! The simulated time horizon and its time index.
use crate::input::asset::SimulationSettingsRaw;
use crate::input::positive_whole;
use anyhow::{Context, Result, ensure};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::Serialize;

/// Minutes in a day
const MINUTES_PER_DAY: u32 = 1440;

/// Accepted formats for the start date, tried in order
const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// The time horizon of the simulation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSettings {
    /// First time step
    pub start_date: NaiveDateTime,
    /// Start plus the evaluated period, minus one hour
    pub end_date: NaiveDateTime,
    /// Number of simulated days
    pub evaluated_period: u32,
    /// Length of a time step in minutes
    pub timestep: u32,
    /// Number of time steps
    pub periods: usize,
    /// Start of every time step
    #[serde(skip)]
    pub time_index: Vec<NaiveDateTime>,
}

/// Parse a start date in one of the accepted formats
pub fn parse_start_date(date: &str) -> Result<NaiveDateTime> {
    let date = date.trim();
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date, format) {
            return Ok(dt);
        }
    }

    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("Invalid start date: {date}"))?;
    Ok(day.and_time(chrono::NaiveTime::MIN))
}

impl SimulationSettings {
    /// Build the time index from the raw settings
    pub fn from_raw(raw: SimulationSettingsRaw) -> Result<Self> {
        let start_date = parse_start_date(&raw.start_date.into_inner())?;
        let evaluated_period =
            positive_whole(raw.evaluated_period.into_inner(), "evaluated_period")?;
        let timestep = positive_whole(raw.timestep.into_inner(), "timestep")?;
        Self::new(start_date, evaluated_period, timestep)
    }

    /// Create settings for the given start, number of days and time step length in minutes.
    ///
    /// Fails if the evaluated period is not a whole number of time steps.
    pub fn new(start_date: NaiveDateTime, evaluated_period: u32, timestep: u32) -> Result<Self> {
        let minutes = u64::from(evaluated_period) * u64::from(MINUTES_PER_DAY);
        ensure!(timestep > 0, "timestep must be greater than zero");
        ensure!(
            minutes % u64::from(timestep) == 0,
            "The evaluated period of {evaluated_period} days is not a whole number of \
            {timestep}-minute time steps"
        );
        let periods = usize::try_from(minutes / u64::from(timestep))?;

        let step = TimeDelta::minutes(i64::from(timestep));
        let time_index = (0..periods)
            .map(|i| -> Result<NaiveDateTime> {
                let offset = step * i32::try_from(i)?;
                start_date
                    .checked_add_signed(offset)
                    .context("Time index out of range")
            })
            .collect::<Result<Vec<_>>>()?;

        let end_date = start_date
            .checked_add_signed(TimeDelta::days(i64::from(evaluated_period)) - TimeDelta::hours(1))
            .context("End date out of range")?;

        Ok(Self {
            start_date,
            end_date,
            evaluated_period,
            timestep,
            periods,
            time_index,
        })
    }

    /// Number of time steps per hour (fractional for steps longer than an hour)
    pub fn steps_per_hour(&self) -> f64 {
        60.0 / f64::from(self.timestep)
    }
}
