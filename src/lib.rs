pub mod args;
pub mod commands;
mod config;
pub mod convert;
mod error;
pub mod model;
pub mod output;
pub mod source;
mod utils;

pub use config::{
    Card, CardMarker, CategoryDefaults, CellRef, Config, ConversionPolicy, FinecoConfig,
    IoSettings, N26Config, PaypalConfig, Rule, UnicreditConfig,
};
pub use error::{Error, ErrorType, Result};
