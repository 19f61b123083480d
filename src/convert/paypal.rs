//! PayPal activity exports.
//!
//! PayPal writes each transaction as two lines: a header row carrying the counterparty name and the
//! gross amount, followed (not necessarily immediately) by an accounting row with an empty name
//! and the amount actually booked. Currency conversions add bookkeeping rows of their own, which
//! carry no information we need and are dropped.

use crate::config::{ConversionPolicy, PaypalConfig};
use crate::convert::{categorize, missing_columns_error, parse_date};
use crate::model::{
    Amount, Normalized, NormalizedTransaction, OrphanKind, OrphanRow, RawRow, TransactionType,
};
use crate::source::Table;
use crate::Result;
use anyhow::{bail, Context};
use std::str::FromStr;
use tracing::trace;

pub const NAME: &str = "Nome";
pub const DATE: &str = "Data";
pub const CURRENCY: &str = "Valuta";
pub const AMOUNT: &str = "Importo";
pub const TYPE: &str = "Tipo";

const CONVERSION_TYPE: &str = "Conversione di valuta generica";
const EXTERNAL_ID_PREFIX: &str = "paypal";

/// What a ledger row is, decided from its name and type columns alone.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum RowKind {
    /// Has a counterparty name.
    Header,
    /// No name; carries the booked amount of the header row it belongs to.
    Accounting,
    /// No name and a currency-conversion type. Ignored.
    Conversion,
}

impl RowKind {
    pub fn of(row: &RawRow<String>) -> Self {
        if !row.text(NAME).is_empty() {
            RowKind::Header
        } else if row.text(TYPE).starts_with(CONVERSION_TYPE) {
            RowKind::Conversion
        } else {
            RowKind::Accounting
        }
    }
}

/// A header row and the accounting row that belongs to it, as indices into the classified rows.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Pair {
    pub header: usize,
    pub accounting: usize,
}

#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Pairing {
    /// In the order of their header rows.
    pub pairs: Vec<Pair>,
    /// Header and accounting rows without a partner, ascending.
    pub orphans: Vec<usize>,
}

/// Pairs every header row with the nearest following accounting row that no earlier header has
/// claimed. When a header has a key, the accounting row must have the same key; a header without
/// a key accepts any accounting row. Conversion rows never take part.
pub fn pair_rows<K: PartialEq>(rows: &[(RowKind, Option<K>)]) -> Pairing {
    let mut claimed = vec![false; rows.len()];
    let mut pairing = Pairing::default();

    for (header, (kind, key)) in rows.iter().enumerate() {
        if *kind != RowKind::Header {
            continue;
        }
        let partner = rows
            .iter()
            .enumerate()
            .skip(header + 1)
            .filter(|(ix, (kind, _))| *kind == RowKind::Accounting && !claimed[*ix])
            .find(|(_, (_, other))| match key {
                Some(key) => other.as_ref() == Some(key),
                None => true,
            })
            .map(|(ix, _)| ix);
        match partner {
            Some(accounting) => {
                claimed[accounting] = true;
                pairing.pairs.push(Pair { header, accounting });
            }
            None => pairing.orphans.push(header),
        }
    }

    pairing.orphans.extend(
        rows.iter()
            .enumerate()
            .filter(|(ix, (kind, _))| *kind == RowKind::Accounting && !claimed[*ix])
            .map(|(ix, _)| ix),
    );
    pairing.orphans.sort_unstable();
    pairing
}

/// Rebuilds the logical transactions of a PayPal export.
///
/// # Errors
/// - `ErrorType::Config` if a column this reads, or the configured pairing key column, is missing.
pub fn normalize(table: &Table<String>, config: &PaypalConfig) -> Result<Normalized> {
    let mut required = vec![NAME, DATE, CURRENCY, AMOUNT];
    if let Some(key) = &config.pairing_key_column {
        required.push(key.as_str());
    }
    let missing = table.missing_columns(required);
    if !missing.is_empty() {
        return Err(missing_columns_error(&missing));
    }

    let classified: Vec<(RowKind, Option<&str>)> = table
        .rows
        .iter()
        .map(|row| {
            let key = config
                .pairing_key_column
                .as_deref()
                .map(|column| row.text(column))
                .filter(|key| !key.is_empty());
            (RowKind::of(row), key)
        })
        .collect();
    let pairing = pair_rows(&classified);

    let mut normalized = Normalized::default();
    for Pair { header, accounting } in pairing.pairs {
        let header = &table.rows[header];
        let accounting = &table.rows[accounting];
        trace!(
            "Row {} paired with row {}",
            header.row_number(),
            accounting.row_number()
        );
        match transactions(header, accounting, config) {
            Ok(legs) => {
                normalized.report.processed += 1;
                normalized.transactions.extend(legs);
            }
            Err(e) => {
                trace!("Row {} skipped: {e:#}", header.row_number());
                normalized.report.skip(header.row_number(), format!("{e:#}"));
            }
        }
    }

    for ix in pairing.orphans {
        let row = &table.rows[ix];
        let (kind, name) = match classified[ix].0 {
            RowKind::Header => (OrphanKind::Header, row.text(NAME)),
            _ => (OrphanKind::Accounting, row.text(TYPE)),
        };
        normalized.report.orphans.push(OrphanRow {
            row_number: row.row_number(),
            kind,
            name: name.to_string(),
            date: row.text(DATE).to_string(),
        });
    }

    let conversions = classified
        .iter()
        .filter(|(kind, _)| *kind == RowKind::Conversion)
        .count();
    if conversions > 0 {
        trace!("Ignored {conversions} currency conversion rows");
    }
    Ok(normalized)
}

/// The transaction of one header/accounting pair, or two legs for a currency conversion under
/// `ConversionPolicy::LinkedLegs`.
fn transactions(
    header: &RawRow<String>,
    accounting: &RawRow<String>,
    config: &PaypalConfig,
) -> anyhow::Result<Vec<NormalizedTransaction>> {
    let name = header.text(NAME);
    let date_text = match accounting.text(DATE) {
        "" => header.text(DATE),
        date => date,
    };
    let Some(date) = parse_date(date_text) else {
        bail!("unrecognised date '{date_text}'");
    };

    let amount = booked_amount(accounting)
        .with_context(|| format!("accounting row {}", accounting.row_number()))?;
    if amount.is_zero() {
        bail!("zero amount");
    }
    let header_currency = header.text(CURRENCY);
    let currency = match accounting.text(CURRENCY) {
        "" => header_currency,
        currency => currency,
    };
    if currency.is_empty() {
        bail!("no currency");
    }

    let rule = config.match_rule(name);
    let counterparty = rule.and_then(|rule| rule.account.as_deref()).unwrap_or(name);
    let transaction_type = transaction_type(amount, config.positive_is_withdrawal);
    let leg = |amount: Amount, currency: &str| {
        let leg = NormalizedTransaction::with_type(
            date,
            name,
            amount.value(),
            currency,
            transaction_type,
            config.source_account.as_str(),
            counterparty,
        );
        categorize(leg, rule, &config.categories)
    };
    let primary = leg(amount, currency);

    let is_conversion = !header_currency.is_empty() && header_currency != currency;
    if !is_conversion {
        return Ok(vec![primary]);
    }
    match config.conversion_policy {
        ConversionPolicy::SingleLeg => {
            trace!(
                "Row {}: {header_currency} converted to {currency}, writing one leg",
                header.row_number()
            );
            Ok(vec![primary])
        }
        ConversionPolicy::LinkedLegs => {
            let gross = booked_amount(header)
                .with_context(|| format!("header row {}", header.row_number()))?;
            let link = format!("{EXTERNAL_ID_PREFIX}-{}", header.row_number());
            Ok(vec![
                primary.external_id(link.clone()),
                leg(gross, header_currency).external_id(link),
            ])
        }
    }
}

fn booked_amount(row: &RawRow<String>) -> anyhow::Result<Amount> {
    let text = row.text(AMOUNT);
    if text.is_empty() {
        bail!("no amount");
    }
    Ok(Amount::from_str(text)?)
}

fn transaction_type(amount: Amount, positive_is_withdrawal: bool) -> TransactionType {
    let withdrawal = if positive_is_withdrawal {
        amount.is_positive()
    } else {
        amount.is_negative()
    };
    if withdrawal {
        TransactionType::Withdrawal
    } else {
        TransactionType::Deposit
    }
}

#[cfg(test)]
mod tests {
    use super::RowKind::{Accounting as A, Conversion as C, Header as H};
    use super::*;
    use crate::config::{CategoryDefaults, IoSettings, Rule};
    use crate::model::OutputColumns;
    use crate::source::parse_csv;
    use crate::ErrorType;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    const COLUMNS: &str = "Data,Nome,Tipo,Valuta,Importo,Codice\n";

    fn config() -> PaypalConfig {
        PaypalConfig {
            source_account: "PayPal".to_string(),
            output_columns: OutputColumns::default(),
            positive_is_withdrawal: true,
            conversion_policy: ConversionPolicy::SingleLeg,
            pairing_key_column: None,
            rules: Vec::new(),
            categories: CategoryDefaults::default(),
            io: IoSettings::default(),
        }
    }

    fn table(lines: &str) -> Table<String> {
        parse_csv(&format!("{COLUMNS}{lines}"), b',').unwrap()
    }

    fn unkeyed(kinds: &[RowKind]) -> Vec<(RowKind, Option<&'static str>)> {
        kinds.iter().map(|kind| (*kind, None)).collect()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_pair_interleaved() {
        let pairing = pair_rows(&unkeyed(&[H, A, H, A]));
        assert_eq!(
            pairing.pairs,
            vec![
                Pair {
                    header: 0,
                    accounting: 1
                },
                Pair {
                    header: 2,
                    accounting: 3
                }
            ]
        );
        assert!(pairing.orphans.is_empty());
    }

    #[test]
    fn test_pair_header_without_accounting() {
        let pairing = pair_rows(&unkeyed(&[H, H, A]));
        assert_eq!(
            pairing.pairs,
            vec![Pair {
                header: 0,
                accounting: 2
            }]
        );
        assert_eq!(pairing.orphans, vec![1]);
    }

    #[test]
    fn test_pair_skips_conversions_and_reports_stray_accounting() {
        let pairing = pair_rows(&unkeyed(&[A, H, C, C, A, A]));
        assert_eq!(
            pairing.pairs,
            vec![Pair {
                header: 1,
                accounting: 4
            }]
        );
        assert_eq!(pairing.orphans, vec![0, 5]);
    }

    #[test]
    fn test_pair_by_key() {
        let rows = vec![
            (H, Some("x")),
            (H, Some("y")),
            (A, Some("y")),
            (A, Some("x")),
        ];
        let pairing = pair_rows(&rows);
        assert_eq!(
            pairing.pairs,
            vec![
                Pair {
                    header: 0,
                    accounting: 3
                },
                Pair {
                    header: 1,
                    accounting: 2
                }
            ]
        );
        assert!(pairing.orphans.is_empty());
    }

    #[test]
    fn test_classify() {
        let table = table(
            "01/02/2024,Shop,Pagamento,EUR,\"-10,00\",\n\
             01/02/2024,,Conversione di valuta generica,USD,\"10,90\",\n\
             01/02/2024,,Bonifico,EUR,\"10,00\",\n",
        );
        let kinds: Vec<RowKind> = table.rows.iter().map(RowKind::of).collect();
        assert_eq!(kinds, vec![H, C, A]);
    }

    #[test]
    fn test_two_domestic_transactions() {
        let table = table(
            "01/02/2024,Coffee Shop,Pagamento,EUR,\"-3,50\",\n\
             01/02/2024,,Bonifico,EUR,\"3,50\",\n\
             02/02/2024,Book Store,Pagamento,EUR,\"-1.234,56\",\n\
             02/02/2024,,Bonifico,EUR,\"1.234,56\",\n",
        );
        let normalized = normalize(&table, &config()).unwrap();
        assert_eq!(normalized.report.processed, 2);
        assert!(normalized.report.orphans.is_empty());

        let coffee = &normalized.transactions[0];
        assert_eq!(coffee.description, "Coffee Shop");
        assert_eq!(coffee.amount, dec("3.50"));
        assert_eq!(coffee.transaction_type, TransactionType::Withdrawal);
        assert_eq!(coffee.source_name, "PayPal");
        assert_eq!(coffee.destination_name, "Coffee Shop");
        assert_eq!(coffee.date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());

        assert_eq!(normalized.transactions[1].amount, dec("1234.56"));
    }

    #[test]
    fn test_orphan_header_is_reported_not_written() {
        let table = table(
            "01/02/2024,Coffee Shop,Pagamento,EUR,\"-3,50\",\n\
             02/02/2024,Book Store,Pagamento,EUR,\"-9,00\",\n\
             01/02/2024,,Bonifico,EUR,\"3,50\",\n",
        );
        let normalized = normalize(&table, &config()).unwrap();
        assert_eq!(normalized.transactions.len(), 1);
        assert_eq!(normalized.transactions[0].description, "Coffee Shop");
        assert_eq!(normalized.report.orphans.len(), 1);
        let orphan = &normalized.report.orphans[0];
        assert_eq!(orphan.kind, OrphanKind::Header);
        assert_eq!(orphan.name, "Book Store");
        assert_eq!(orphan.row_number, 3);
    }

    #[test]
    fn test_negative_accounting_amount_is_deposit() {
        let table = table(
            "01/02/2024,Friend,Pagamento ricevuto,EUR,\"20,00\",\n\
             01/02/2024,,Bonifico,EUR,\"-20,00\",\n",
        );
        let normalized = normalize(&table, &config()).unwrap();
        let t = &normalized.transactions[0];
        assert_eq!(t.transaction_type, TransactionType::Deposit);
        assert_eq!(t.source_name, "Friend");
        assert_eq!(t.destination_name, "PayPal");

        let mut config = config();
        config.positive_is_withdrawal = false;
        let normalized = normalize(&table, &config).unwrap();
        assert_eq!(
            normalized.transactions[0].transaction_type,
            TransactionType::Withdrawal
        );
    }

    #[test]
    fn test_malformed_amount_skips_the_pair() {
        let table = table(
            "01/02/2024,Shop,Pagamento,EUR,\"-12,34,56\",\n\
             01/02/2024,,Bonifico,EUR,\"12,34,56\",\n",
        );
        let normalized = normalize(&table, &config()).unwrap();
        assert!(normalized.transactions.is_empty());
        assert_eq!(normalized.report.skipped.len(), 1);
        assert_eq!(normalized.report.skipped[0].row_number, 2);
        assert!(normalized.report.skipped[0]
            .reason
            .contains("malformed amount '12,34,56'"));
    }

    #[test]
    fn test_date_falls_back_to_header() {
        let table = table(
            "05/02/2024,Shop,Pagamento,EUR,\"-1,00\",\n\
             ,,Bonifico,EUR,\"1,00\",\n",
        );
        let normalized = normalize(&table, &config()).unwrap();
        assert_eq!(
            normalized.transactions[0].date,
            NaiveDate::from_ymd_opt(2024, 2, 5).unwrap()
        );
    }

    const CONVERSION: &str = "01/02/2024,US Store,Pagamento,USD,\"-10,90\",\n\
         01/02/2024,,Conversione di valuta generica,USD,\"10,90\",\n\
         01/02/2024,,Conversione di valuta generica,EUR,\"-10,00\",\n\
         01/02/2024,,Bonifico,EUR,\"10,00\",\n";

    #[test]
    fn test_conversion_single_leg() {
        let normalized = normalize(&table(CONVERSION), &config()).unwrap();
        assert_eq!(normalized.transactions.len(), 1);
        let t = &normalized.transactions[0];
        assert_eq!(t.currency_code, "EUR");
        assert_eq!(t.amount, dec("10.00"));
        assert_eq!(t.external_id, None);
        assert!(normalized.report.orphans.is_empty());
    }

    #[test]
    fn test_conversion_linked_legs() {
        let mut config = config();
        config.conversion_policy = ConversionPolicy::LinkedLegs;
        let normalized = normalize(&table(CONVERSION), &config).unwrap();
        assert_eq!(normalized.report.processed, 1);
        let legs = &normalized.transactions;
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].currency_code, "EUR");
        assert_eq!(legs[0].amount, dec("10.00"));
        assert_eq!(legs[1].currency_code, "USD");
        assert_eq!(legs[1].amount, dec("10.90"));
        assert_eq!(legs[0].transaction_type, legs[1].transaction_type);
        assert_eq!(legs[0].external_id.as_deref(), Some("paypal-2"));
        assert_eq!(legs[0].external_id, legs[1].external_id);
    }

    #[test]
    fn test_pairing_key_column() {
        let mut config = config();
        config.pairing_key_column = Some("Codice".to_string());
        let table = table(
            "01/02/2024,First,Pagamento,EUR,\"-1,00\",K1\n\
             01/02/2024,Second,Pagamento,EUR,\"-2,00\",K2\n\
             01/02/2024,,Bonifico,EUR,\"2,00\",K2\n\
             01/02/2024,,Bonifico,EUR,\"1,00\",K1\n",
        );
        let normalized = normalize(&table, &config).unwrap();
        let amounts: Vec<Decimal> = normalized.transactions.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![dec("1.00"), dec("2.00")]);
        assert!(normalized.report.orphans.is_empty());
    }

    #[test]
    fn test_missing_columns() {
        let table = parse_csv("Data,Nome,Valuta\n01/02/2024,Shop,EUR\n", b',').unwrap();
        let err = normalize(&table, &config()).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
        assert!(err.to_string().contains("Importo"));

        let mut config = config();
        config.pairing_key_column = Some("Codice transazione".to_string());
        let err = normalize(&self::table(""), &config).unwrap_err();
        assert!(err.to_string().contains("Codice transazione"));
    }

    #[test]
    fn test_zero_accounting_amount_is_skipped() {
        let table = table(
            "01/02/2024,Authorization,Autorizzazione,EUR,\"0,00\",\n\
             01/02/2024,,Bonifico,EUR,\"0,00\",\n",
        );
        let normalized = normalize(&table, &config()).unwrap();
        assert!(normalized.transactions.is_empty());
        assert_eq!(normalized.report.processed, 0);
        assert_eq!(normalized.report.skipped.len(), 1);
        assert_eq!(normalized.report.skipped[0].row_number, 2);
        assert_eq!(normalized.report.skipped[0].reason, "zero amount");
    }

    #[test]
    fn test_rules_categorize_by_name() {
        let mut config = config();
        config.rules = vec![
            Rule {
                contains: vec!["netflix".to_string()],
                account: None,
                category: Some("Entertainment".to_string()),
                tags: Vec::new(),
                transfer: false,
            },
            Rule {
                contains: vec!["ebay".to_string()],
                account: Some("eBay".to_string()),
                category: Some("ebay".to_string()),
                tags: Vec::new(),
                transfer: false,
            },
        ];
        config.categories.default_tags = vec!["to_categorize".to_string()];
        let table = table(
            "01/02/2024,NETFLIX.COM,Pagamento,EUR,\"-12,99\",\n\
             01/02/2024,,Bonifico,EUR,\"12,99\",\n\
             02/02/2024,eBay O*12-345,Pagamento,EUR,\"-20,00\",\n\
             02/02/2024,,Bonifico,EUR,\"20,00\",\n\
             03/02/2024,Corner Shop,Pagamento,EUR,\"-4,00\",\n\
             03/02/2024,,Bonifico,EUR,\"4,00\",\n",
        );
        let normalized = normalize(&table, &config).unwrap();
        let [netflix, ebay, shop] = &normalized.transactions[..] else {
            panic!("expected three transactions");
        };

        assert_eq!(netflix.category.as_deref(), Some("Entertainment"));
        assert!(netflix.tags.is_empty());
        assert_eq!(netflix.destination_name, "NETFLIX.COM");

        assert_eq!(ebay.destination_name, "eBay");
        assert_eq!(ebay.description, "eBay O*12-345");
        assert_eq!(ebay.category.as_deref(), Some("ebay"));

        assert_eq!(shop.category, None);
        assert_eq!(shop.tags, vec!["to_categorize"]);
        assert_eq!(shop.destination_name, "Corner Shop");
    }
}
