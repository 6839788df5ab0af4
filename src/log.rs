//! Initialisation of the program logger.
//!
//! Messages go to the console (coloured when attached to a terminal). For a simulation run they
//! are also written to two files in the output folder: `mves_info.log` for the progress of the run
//! and `mves_error.log` for the warnings raised by validation and pre-processing, so that these
//! can be inspected alongside the results.
//!
//! The level is taken from the `MVES_LOG_LEVEL` environment variable, then from `settings.toml`,
//! falling back on [`DEFAULT_LOG_LEVEL`]. At `debug` and `trace` the solver output is shown too.
use anyhow::{Context, Result, anyhow};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Record};
use std::env;
use std::fmt::{Arguments, Display};
use std::fs::File;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::OnceLock;

/// Set once the logger has been initialised
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The environment variable which overrides the log level given in the settings
pub const LOG_LEVEL_ENV_VAR: &str = "MVES_LOG_LEVEL";

/// The log level used when neither the environment nor the settings specify one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Progress messages of a run
const LOG_INFO_FILE_NAME: &str = "mves_info.log";

/// Warnings and errors of a run
const LOG_ERROR_FILE_NAME: &str = "mves_error.log";

/// Prefix of the log targets of this crate, which is dropped from messages
const TARGET_PREFIX: &str = "mves::";

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Choose the log level from the environment, the settings or the default, in that order.
///
/// Level names are case-insensitive and may be any of `off`, `error`, `warn`, `info`, `debug`
/// or `trace`.
fn resolve_log_level(from_env: Option<&str>, from_settings: Option<&str>) -> Result<LevelFilter> {
    let name = from_env.or(from_settings).unwrap_or(DEFAULT_LOG_LEVEL);
    name.trim()
        .parse()
        .map_err(|_| anyhow!("Unknown log level: {name}"))
}

/// Initialise the program logger.
///
/// # Arguments
///
/// * `log_level_from_settings`: The log level given in `settings.toml`, if any
/// * `log_file_path`: The output folder of a run; log files are only written if this is given
///
/// The logger is global, so calling this again once it is set up does nothing.
pub fn init(log_level_from_settings: Option<&str>, log_file_path: Option<&Path>) -> Result<()> {
    if is_logger_initialised() {
        return Ok(());
    }

    let from_env = env::var(LOG_LEVEL_ENV_VAR).ok();
    let log_level = resolve_log_level(from_env.as_deref(), log_level_from_settings)?;

    let mut dispatch = Dispatch::new().chain(console_dispatch(log_level));
    if let Some(dir) = log_file_path {
        dispatch = dispatch.chain(file_dispatch(log_level, dir)?);
    }
    dispatch.apply()?;
    LOGGER_INIT.get_or_init(|| ());

    Ok(())
}

/// Messages below warnings go to stdout; warnings and errors go to stderr
fn console_dispatch(log_level: LevelFilter) -> Dispatch {
    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);
    let colour_stdout = std::io::stdout().is_terminal();
    let colour_stderr = std::io::stderr().is_terminal();

    Dispatch::new()
        .chain(
            Dispatch::new()
                .filter(|metadata| metadata.level() > LevelFilter::Warn)
                .format(move |out, message, record| {
                    write_log_colour(out, message, record, colour_stdout.then_some(&colours));
                })
                .level(log_level)
                .chain(std::io::stdout()),
        )
        .chain(
            Dispatch::new()
                .format(move |out, message, record| {
                    write_log_colour(out, message, record, colour_stderr.then_some(&colours));
                })
                .level(log_level.min(LevelFilter::Warn))
                .chain(std::io::stderr()),
        )
}

/// Write the log files of a run into `dir`.
///
/// The info file records at least `info` messages whatever the console level, and the error file
/// always records warnings and errors.
fn file_dispatch(log_level: LevelFilter, dir: &Path) -> Result<Dispatch> {
    let create = |file_name: &str| {
        let path = dir.join(file_name);
        File::create(&path).with_context(|| format!("Could not create {}", path.display()))
    };

    Ok(Dispatch::new()
        .chain(
            Dispatch::new()
                .filter(|metadata| metadata.level() > LevelFilter::Warn)
                .format(write_log_plain)
                .level(log_level.max(LevelFilter::Info))
                .chain(create(LOG_INFO_FILE_NAME)?),
        )
        .chain(
            Dispatch::new()
                .format(write_log_plain)
                .level(LevelFilter::Warn)
                .chain(create(LOG_ERROR_FILE_NAME)?),
        ))
}

/// The module a message comes from, without the crate prefix
fn short_target<'a>(record: &Record<'a>) -> &'a str {
    let target = record.target();
    target.strip_prefix(TARGET_PREFIX).unwrap_or(target)
}

/// Write a log message with a timestamp, level and target
fn write_log<T: Display>(out: FormatCallback, level: T, target: &str, message: &Arguments) {
    let timestamp = Local::now().format("%H:%M:%S");

    out.finish(format_args!("[{timestamp} {level} {target}] {message}"));
}

/// Write to the log with no colours
fn write_log_plain(out: FormatCallback, message: &Arguments, record: &Record) {
    write_log(out, record.level(), short_target(record), message);
}

/// Write to the log, colouring the level if colours are given
fn write_log_colour(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    colours: Option<&ColoredLevelConfig>,
) {
    match colours {
        Some(colours) => {
            let level = colours.color(record.level());
            write_log(out, level, short_target(record), message);
        }
        None => write_log_plain(out, message, record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, None, LevelFilter::Info)]
    #[case(None, Some("warn"), LevelFilter::Warn)]
    #[case(Some("DEBUG"), Some("warn"), LevelFilter::Debug)]
    #[case(Some("off"), None, LevelFilter::Off)]
    #[case(None, Some(" trace "), LevelFilter::Trace)]
    fn test_resolve_log_level(
        #[case] from_env: Option<&str>,
        #[case] from_settings: Option<&str>,
        #[case] expected: LevelFilter,
    ) {
        assert_eq!(resolve_log_level(from_env, from_settings).unwrap(), expected);
    }

    #[test]
    fn test_resolve_log_level_unknown() {
        let err = resolve_log_level(None, Some("verbose")).unwrap_err();
        assert_eq!(err.to_string(), "Unknown log level: verbose");
    }

    #[test]
    fn test_short_target() {
        let record = Record::builder().target("mves::simulation::solver").build();
        assert_eq!(short_target(&record), "simulation::solver");
        let record = Record::builder().target("highs").build();
        assert_eq!(short_target(&record), "highs");
    }
}
