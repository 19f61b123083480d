//! Fineco bank statements: one spreadsheet row per transaction, with separate deposit and
//! withdrawal columns.

use crate::config::FinecoConfig;
use crate::convert::{categorize, missing_columns_error, parse_date};
use crate::error::Error;
use crate::model::{Amount, AmountFormat, Cell, Normalized, NormalizedTransaction, RawRow};
use crate::source::Sheet;
use crate::Result;
use anyhow::{bail, Context};
use chrono::{Days, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, trace};

pub const DATE: &str = "Data_Valuta";
pub const DESCRIPTION: &str = "Descrizione";
pub const FULL_DESCRIPTION: &str = "Descrizione_Completa";
pub const DEPOSIT: &str = "Entrate";
pub const WITHDRAWAL: &str = "Uscite";

const FALLBACK_DESCRIPTION: &str = "Transazione";

/// Normalizes every row under the configured header row of `sheet`.
///
/// # Errors
/// - `ErrorType::Config` if the header row lacks a required column. No row is looked at in that
///   case.
/// - `ErrorType::Parse` if the header row has duplicate labels.
pub fn normalize(sheet: &Sheet, config: &FinecoConfig) -> Result<Normalized> {
    let table = sheet.table(config.header_row).map_err(|e| {
        Error::parse(format!(
            "Unable to read the header on row {}: {e}",
            config.header_row + 1
        ))
    })?;

    let required = config
        .required_columns
        .iter()
        .map(String::as_str)
        .chain([DATE, DESCRIPTION, DEPOSIT, WITHDRAWAL]);
    let missing = table.mapping.missing(required);
    if !missing.is_empty() {
        return Err(missing_columns_error(&missing));
    }

    let account = account_name(sheet, config);
    debug!("Fineco rows are booked to '{account}' unless a card marker matches");

    let mut normalized = Normalized::default();
    for row in &table.rows {
        match normalize_row(row, &account, config) {
            Ok(transaction) => {
                trace!(
                    "Row {}: {} of {} {}",
                    row.row_number(),
                    transaction.transaction_type,
                    transaction.amount,
                    transaction.currency_code
                );
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

/// The account label from `account_cell` when configured and filled, otherwise `fineco_account`.
fn account_name(sheet: &Sheet, config: &FinecoConfig) -> String {
    let Some(at) = config.account_cell else {
        return config.fineco_account.clone();
    };
    match sheet.cell(at).as_text() {
        Some(label) => label,
        None => {
            debug!("Cell {at} is blank, using '{}'", config.fineco_account);
            config.fineco_account.clone()
        }
    }
}

fn normalize_row(
    row: &RawRow<Cell>,
    account: &str,
    config: &FinecoConfig,
) -> anyhow::Result<NormalizedTransaction> {
    let date = date(row.get(DATE).unwrap_or(&Cell::Empty))
        .with_context(|| format!("column {DATE}"))?;

    let deposit = amount(row, DEPOSIT)?;
    let withdrawal = amount(row, WITHDRAWAL)?;
    let net = match (deposit.is_zero(), withdrawal.is_zero()) {
        (true, true) => bail!("neither {DEPOSIT} nor {WITHDRAWAL} has an amount"),
        (false, false) => bail!("both {DEPOSIT} and {WITHDRAWAL} have an amount"),
        _ => deposit - withdrawal.abs(),
    };

    let short = text(row, DESCRIPTION);
    let full = text(row, FULL_DESCRIPTION)
        .or_else(|| short.clone())
        .unwrap_or_else(|| FALLBACK_DESCRIPTION.to_string());

    let account = match short.as_deref().and_then(|s| config.match_card(s)) {
        Some(card) => config.card(card).source_account_name.as_str(),
        None => account,
    };

    let rule = config.match_rule(&full);
    let opposing = match rule {
        Some(rule) => rule.account.clone(),
        None => config.default_opposing_name.clone(),
    }
    .unwrap_or_else(|| full.clone());

    let transaction = NormalizedTransaction::new(
        date,
        full,
        net.round_dp(2),
        config.currency_code.clone(),
        account,
        opposing,
    );
    let transaction = categorize(transaction, rule, &config.categories);
    Ok(match short {
        Some(short) => transaction.notes(short),
        None => transaction,
    })
}

fn text(row: &RawRow<Cell>, label: &str) -> Option<String> {
    row.get(label).and_then(Cell::as_text)
}

/// A blank cell is zero. Text is read as an Italian amount first, then as a plain one.
fn amount(row: &RawRow<Cell>, label: &str) -> anyhow::Result<Decimal> {
    match row.get(label) {
        None | Some(Cell::Empty) => Ok(Decimal::ZERO),
        Some(Cell::Number(n)) => Ok(*n),
        Some(Cell::Text(s)) => Amount::parse(s, AmountFormat::Italian)
            .or_else(|_| Amount::parse(s, AmountFormat::Plain))
            .map(|a| a.value())
            .with_context(|| format!("column {label}")),
        Some(Cell::Date(d)) => bail!("column {label}: expected an amount, found the date {d}"),
    }
}

fn date(cell: &Cell) -> anyhow::Result<NaiveDate> {
    match cell {
        Cell::Date(d) => Ok(*d),
        Cell::Number(serial) => from_serial(*serial)
            .with_context(|| format!("{serial} is not a valid spreadsheet date")),
        Cell::Text(s) => parse_date(s).with_context(|| format!("unrecognised date '{}'", s.trim())),
        Cell::Empty => bail!("missing date"),
    }
}

/// Spreadsheet serial dates count days from 1899-12-30.
fn from_serial(serial: Decimal) -> Option<NaiveDate> {
    let days = serial.trunc().to_u64().filter(|days| *days > 0)?;
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(days))
}
