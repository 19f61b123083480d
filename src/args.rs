//! These structs provide the CLI interface for the firefly-convert CLI.

use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::filter::LevelFilter;

/// firefly-convert: turns bank and payment provider exports into Firefly III import files.
///
/// Each subcommand reads one export format, normalizes every row into a Firefly III transaction
/// and writes the result as CSV. Rows that cannot be converted are reported and left out.
///
/// Settings for each format live in a JSON configuration file, one section per subcommand.
#[derive(Debug, Parser, Clone)]
#[command(version)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Convert a Fineco bank statement (.xlsx).
    ///
    /// Uses the "fineco" section of the configuration file. Payments made with one of the two
    /// configured cards are booked to that card's account instead of the main account.
    Fineco(ConvertArgs),
    /// Convert a PayPal activity export (.csv).
    ///
    /// Uses the "paypal" section of the configuration file. PayPal writes every transaction as a
    /// header line followed by an accounting line; lines that cannot be paired are reported and
    /// left out of the output.
    Paypal(ConvertArgs),
    /// Convert an N26 export (.csv).
    N26(ConvertArgs),
    /// Convert a UniCredit export (.csv, semicolon separated).
    Unicredit(ConvertArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The JSON configuration file.
    #[arg(
        long,
        env = "FIREFLY_CONVERT_CONFIG",
        default_value_t = DisplayPath::from("config/config.json")
    )]
    config: DisplayPath,

    /// Where the input file is looked for when neither the command line nor the configuration
    /// names one. It must contain exactly one file of the right type.
    #[arg(long, default_value_t = DisplayPath::from("input"))]
    input_dir: DisplayPath,

    /// Where the output file is written when neither the command line nor the configuration
    /// names one.
    #[arg(long, default_value_t = DisplayPath::from("output"))]
    output_dir: DisplayPath,
}

impl Common {
    pub fn new(
        log_level: LevelFilter,
        config: PathBuf,
        input_dir: PathBuf,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            log_level,
            config: config.into(),
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn config(&self) -> &DisplayPath {
        &self.config
    }

    pub fn input_dir(&self) -> &DisplayPath {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &DisplayPath {
        &self.output_dir
    }
}

/// (Not shown): Args shared by every conversion subcommand.
#[derive(Debug, Parser, Clone)]
pub struct ConvertArgs {
    /// The file to convert. Defaults to the section's "default_input", then to the only matching
    /// file in --input-dir.
    input: Option<PathBuf>,

    /// The file to write. Defaults to the section's "default_output", then to a timestamped file
    /// in --output-dir.
    output: Option<PathBuf>,
}

impl ConvertArgs {
    pub fn new(input: Option<PathBuf>, output: Option<PathBuf>) -> Self {
        Self { input, output }
    }

    pub fn input(&self) -> Option<&Path> {
        self.input.as_deref()
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }
}

/// A `PathBuf` that can be shown as a clap default value.
#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl From<&str> for DisplayPath {
    fn from(value: &str) -> Self {
        DisplayPath(PathBuf::from(value))
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["firefly-convert", "paypal"]).unwrap();
        assert_eq!(args.common().log_level(), LevelFilter::INFO);
        assert_eq!(args.common().input_dir().path(), Path::new("input"));
        assert_eq!(args.common().output_dir().path(), Path::new("output"));
        match args.command() {
            Command::Paypal(convert) => {
                assert_eq!(convert.input(), None);
                assert_eq!(convert.output(), None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_positional_files() {
        let args = Args::try_parse_from([
            "firefly-convert",
            "--log-level",
            "debug",
            "--config",
            "my.json",
            "unicredit",
            "in.csv",
            "out.csv",
        ])
        .unwrap();
        assert_eq!(args.common().log_level(), LevelFilter::DEBUG);
        assert_eq!(args.common().config().path(), Path::new("my.json"));
        let Command::Unicredit(convert) = args.command() else {
            panic!("expected unicredit");
        };
        assert_eq!(convert.input(), Some(Path::new("in.csv")));
        assert_eq!(convert.output(), Some(Path::new("out.csv")));
    }

    #[test]
    fn test_unknown_subcommand() {
        assert!(Args::try_parse_from(["firefly-convert", "revolut"]).is_err());
    }
}
