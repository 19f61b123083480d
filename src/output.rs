//! Writes normalized transactions as a Firefly III import CSV.

use crate::error::{ErrorType, IntoResult};
use crate::model::{NormalizedTransaction, OutputColumns};
use crate::{utils, Result};
use anyhow::{anyhow, Context};
use std::path::Path;
use tracing::debug;

/// Writes `transactions` to `path` with one column per entry of `columns`, creating the parent
/// directory if needed. The file is written in one go, so a failure never leaves a partial CSV.
///
/// # Errors
/// - `ErrorType::Io` if the file cannot be written.
pub fn write_transactions(
    path: &Path,
    columns: &OutputColumns,
    transactions: &[NormalizedTransaction],
) -> Result<()> {
    let bytes = to_csv(columns, transactions).pub_result(ErrorType::Io)?;
    utils::write(path, bytes).pub_result(ErrorType::Io)?;
    debug!(
        "Wrote {} transactions to {}",
        transactions.len(),
        path.display()
    );
    Ok(())
}

/// Serializes `transactions` in input order below a header of the configured labels.
pub fn to_csv(
    columns: &OutputColumns,
    transactions: &[NormalizedTransaction],
) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(columns.labels())
        .context("Unable to write the CSV header")?;
    for transaction in transactions {
        writer
            .write_record(columns.record(transaction))
            .context("Unable to write a CSV record")?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow!("Unable to flush the CSV output: {}", e.error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TransactionType;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tempfile::TempDir;

    fn transactions() -> Vec<NormalizedTransaction> {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        vec![
            NormalizedTransaction::new(
                date,
                "Coffee, large",
                Decimal::from_str("-3.50").unwrap(),
                "EUR",
                "PayPal",
                "Coffee Shop",
            ),
            NormalizedTransaction::with_type(
                date,
                "Savings",
                Decimal::from_str("100").unwrap(),
                "EUR",
                TransactionType::Transfer,
                "Fineco",
                "N26",
            )
            .external_id("paypal-2"),
        ]
    }

    #[test]
    fn test_configured_header_and_order() {
        let columns = OutputColumns::new([
            "date",
            "description",
            "amount",
            "type",
            "source_account",
            "destination_account",
            "external_id",
        ])
        .unwrap();
        let csv = String::from_utf8(to_csv(&columns, &transactions()).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                "date,description,amount,type,source_account,destination_account,external_id",
                "2024-02-01,\"Coffee, large\",3.50,withdrawal,PayPal,Coffee Shop,",
                "2024-02-01,Savings,100,transfer,Fineco,N26,paypal-2",
            ]
        );
    }

    #[test]
    fn test_empty_output_has_header_only() {
        let csv = to_csv(&OutputColumns::default(), &[]).unwrap();
        assert_eq!(
            String::from_utf8(csv).unwrap(),
            "date,description,amount,currency_code,type,source_name,destination_name,notes,\
             external_id\n"
        );
    }

    #[test]
    fn test_write_creates_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output").join("paypal.csv");
        write_transactions(&path, &OutputColumns::default(), &transactions()).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 3);
    }

    #[test]
    fn test_unwritable_destination_is_io_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let err = write_transactions(
            &blocker.join("out.csv"),
            &OutputColumns::default(),
            &transactions(),
        )
        .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Io);
    }
}
