//! N26 CSV exports.

use crate::config::N26Config;
use crate::convert::{missing_columns_error, parse_date};
use crate::model::{Amount, AmountFormat, Normalized, NormalizedTransaction, RawRow};
use crate::source::Table;
use crate::Result;
use anyhow::{bail, Context};
use tracing::trace;

pub const DATE: &str = "Value Date";
pub const PARTNER_NAME: &str = "Partner Name";
pub const PARTNER_IBAN: &str = "Partner Iban";
pub const REFERENCE: &str = "Payment Reference";
pub const AMOUNT: &str = "Amount (EUR)";

pub const COLUMNS: [&str; 5] = [DATE, PARTNER_NAME, PARTNER_IBAN, REFERENCE, AMOUNT];

/// # Errors
/// - `ErrorType::Config` if one of `COLUMNS` is missing.
pub fn normalize(table: &Table<String>, config: &N26Config) -> Result<Normalized> {
    let missing = table.missing_columns(COLUMNS);
    if !missing.is_empty() {
        return Err(missing_columns_error(&missing));
    }

    let mut normalized = Normalized::default();
    for row in &table.rows {
        match normalize_row(row, config) {
            Ok(transaction) => {
                normalized.report.processed += 1;
                normalized.transactions.push(transaction);
            }
            Err(e) => {
                trace!("Row {} skipped: {e:#}", row.row_number());
                normalized.report.skip(row.row_number(), format!("{e:#}"));
            }
        }
    }
    Ok(normalized)
}

fn normalize_row(
    row: &RawRow<String>,
    config: &N26Config,
) -> anyhow::Result<NormalizedTransaction> {
    let date = match row.text(DATE) {
        "" => bail!("missing date"),
        text => parse_date(text).with_context(|| format!("unrecognised date '{text}'"))?,
    };
    let amount = match row.text(AMOUNT) {
        "" => bail!("missing amount"),
        text => Amount::parse(text, AmountFormat::Plain)?,
    };
    if amount.is_zero() {
        bail!("zero amount");
    }

    let reference = row.text(REFERENCE);
    let counterparty = match row.text(PARTNER_NAME) {
        "" => reference,
        name => name,
    };
    let description = format!("{} {}", row.text(PARTNER_IBAN), reference)
        .trim()
        .to_string();

    Ok(NormalizedTransaction::new(
        date,
        description,
        amount.value(),
        config.currency_code.as_str(),
        config.account_name.as_str(),
        counterparty,
    ))
}
