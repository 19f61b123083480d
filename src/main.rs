use clap::Parser;
use firefly_convert::args::{Args, Command, ConvertArgs};
use firefly_convert::commands::{self, Files};
use firefly_convert::{Config, Result};
use std::process::ExitCode;
use tracing::{debug, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            // Printed directly so the error survives `--log-level off`.
            eprintln!("Error: {e}");
            debug!("{e:?}");
            ExitCode::FAILURE
        }
    }
}

pub fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let common = args.common();
    debug!("Loading configuration from {}", common.config());
    let config = Config::load(common.config().path())?;

    let files = |convert_args: &ConvertArgs| {
        Files::new(
            convert_args.input().map(ToOwned::to_owned),
            convert_args.output().map(ToOwned::to_owned),
            common.input_dir().path(),
            common.output_dir().path(),
        )
    };

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Fineco(convert_args) => commands::fineco(&config, &files(convert_args))?.print(),
        Command::Paypal(convert_args) => commands::paypal(&config, &files(convert_args))?.print(),
        Command::N26(convert_args) => commands::n26(&config, &files(convert_args))?.print(),
        Command::Unicredit(convert_args) => {
            commands::unicredit(&config, &files(convert_args))?.print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
