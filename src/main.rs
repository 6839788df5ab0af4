//! Provides the main entry point to the program.
use human_panic::setup_panic;
use log::error;
use mves::cli::run_cli;
use mves::error::exit_code_for;
use mves::log::is_logger_initialised;

fn main() {
    setup_panic!();

    if let Err(err) = run_cli() {
        if is_logger_initialised() {
            error!("{err:?}");
        } else {
            eprintln!("Error: {err:?}");
        }

        std::process::exit(exit_code_for(&err));
    }
}
