//! UniCredit account movements, exported as `;` separated CSV with Italian amounts.

use crate::config::UnicreditConfig;
use crate::convert::{categorize, missing_columns_error, parse_date};
use crate::model::{
    Amount, AmountFormat, Normalized, NormalizedTransaction, RawRow, TransactionType,
};
use crate::source::Table;
use crate::Result;
use anyhow::{bail, Context};
use tracing::trace;

pub const DELIMITER: u8 = b';';

pub const DATE: &str = "Data valuta";
pub const DESCRIPTION: &str = "Descrizione";
pub const AMOUNT: &str = "Importo (EUR)";

/// # Errors
/// - `ErrorType::Config` if the date, description or amount column is missing.
pub fn normalize(table: &Table<String>, config: &UnicreditConfig) -> Result<Normalized> {
    let missing = table.missing_columns([DATE, DESCRIPTION, AMOUNT]);
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
    config: &UnicreditConfig,
) -> anyhow::Result<NormalizedTransaction> {
    let (date, description, amount) = (row.text(DATE), row.text(DESCRIPTION), row.text(AMOUNT));
    if date.is_empty() || description.is_empty() || amount.is_empty() {
        bail!("missing date, description or amount");
    }
    let date = parse_date(date).with_context(|| format!("unrecognised date '{date}'"))?;
    let amount = Amount::parse(amount, AmountFormat::Italian)?;
    if amount.is_zero() {
        bail!("zero amount");
    }
    let description = collapse_whitespace(description);

    let rule = config.match_rule(&description);
    let opposing = rule
        .and_then(|rule| rule.account.as_deref())
        .unwrap_or(config.default_opposing_name.as_str());
    trace!("Row {}: counter-account '{opposing}'", row.row_number());

    let transaction = match rule {
        Some(rule) if rule.transfer => {
            // Money leaves this account when the amount is negative.
            let (source, destination) = if amount.is_negative() {
                (config.account_name.as_str(), opposing)
            } else {
                (opposing, config.account_name.as_str())
            };
            NormalizedTransaction::with_type(
                date,
                description,
                amount.value(),
                config.currency_code.as_str(),
                TransactionType::Transfer,
                source,
                destination,
            )
        }
        _ => NormalizedTransaction::new(
            date,
            description,
            amount.value(),
            config.currency_code.as_str(),
            config.account_name.as_str(),
            opposing,
        ),
    };
    Ok(categorize(transaction, rule, &config.categories))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
