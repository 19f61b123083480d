//! The normalizers: one module per supported export format.
//!
//! Each normalizer takes rows that a reader in `crate::source` produced plus its own configuration
//! section, and returns the normalized transactions together with a `RowReport`. Rows that cannot
//! be converted are recorded in the report and skipped; only problems with the file as a whole are
//! returned as errors.

pub mod fineco;
pub mod n26;
pub mod paypal;
pub mod unicredit;

use crate::config::{CategoryDefaults, IoSettings, Rule};
use crate::error::Error;
use crate::model::{NormalizedTransaction, RowReport};
use crate::Result;
use chrono::NaiveDate;

/// Date layouts found in the supported exports, tried in order.
const DATE_FORMATS: [&str; 4] = ["%d/%m/%Y", "%Y-%m-%d", "%d.%m.%Y", "%d-%m-%Y"];

/// Parses a date written in one of the layouts the supported banks use. A trailing time of day
/// (`2024-02-01 10:22:00`) is ignored.
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let day = s.split_whitespace().next().unwrap_or(s);
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(day, format).ok())
}

/// Fails if more rows were skipped than `io.max_skipped_rows` allows.
pub(crate) fn check_skipped(report: &RowReport, io: &IoSettings) -> Result<()> {
    match io.max_skipped_rows {
        Some(max) if report.skipped.len() > max => Err(Error::parse(format!(
            "{} rows were skipped, more than the allowed {max}",
            report.skipped.len()
        ))),
        _ => Ok(()),
    }
}

/// Sets the category and tags of the matched rule, or the section's defaults when none matched.
pub(crate) fn categorize(
    transaction: NormalizedTransaction,
    rule: Option<&Rule>,
    defaults: &CategoryDefaults,
) -> NormalizedTransaction {
    match rule {
        Some(rule) => transaction.categorize(rule.category.as_deref(), &rule.tags),
        None => {
            transaction.categorize(defaults.default_category.as_deref(), &defaults.default_tags)
        }
    }
}

/// Errors that make the whole file unusable because a column the normalizer reads is missing.
pub(crate) fn missing_columns_error(missing: &[String]) -> Error {
    Error::config(format!(
        "Required columns missing from the input: {}",
        missing.join(", ")
    ))
}
