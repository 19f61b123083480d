//! Command handlers for the firefly-convert CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod convert;

use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use convert::{fineco, n26, paypal, unicredit, ConversionSummary, Converter, Files};

/// What a command hands back to `main`: a one-line message for the user and the structured
/// result it was built from.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    message: String,
    structure: T,
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn structure(&self) -> &T {
        &self.structure
    }

    /// Logs the message at info level and the structure as JSON at debug level.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Ok(json) = serde_json::to_string_pretty(&self.structure) {
            debug!("Command output:\n\n{json}\n\n");
        }
    }
}
