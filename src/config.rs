//! Configuration file handling.
//!
//! The configuration file is a JSON object with one section per converter:
//!
//! ```json
//! {
//!   "fineco": {
//!     "fineco_account": "Fineco",
//!     "header_row": 6,
//!     "required_columns": ["Data_Valuta", "Descrizione", "Entrate", "Uscite"],
//!     "currency_code": "EUR",
//!     "card_a": { "number": "**** 1234", "source_account_name": "fineco carta prepagata" },
//!     "card_b": { "number": "**** 2119", "source_account_name": "fineco carta credito" },
//!     "rules": [
//!       { "contains": ["OBI"], "account": "OBI", "category": "DIY" }
//!     ],
//!     "default_category": "undefined"
//!   },
//!   "paypal": {
//!     "source_account": "PayPal",
//!     "output_columns": ["date", "description", "amount", "currency_code", "type",
//!                        "source_account", "destination_account"]
//!   }
//! }
//! ```
//!
//! The file is parsed once per run. A section is only validated when its converter is selected,
//! and it is validated completely before any input is read.

use crate::error::{Error, ErrorType, IntoResult};
use crate::model::OutputColumns;
use crate::{utils, Result};
use anyhow::{bail, ensure};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const FINECO: &str = "fineco";
pub const PAYPAL: &str = "paypal";
pub const N26: &str = "n26";
pub const UNICREDIT: &str = "unicredit";

const DEFAULT_CURRENCY: &str = "EUR";
const DEFAULT_OPPOSING_NAME: &str = "to be inputed";

/// The loaded configuration file. Holds the raw sections; typed and validated sections are obtained
/// through `fineco()`, `paypal()`, `n26()` and `unicredit()`.
#[derive(Debug, Clone)]
pub struct Config {
    path: PathBuf,
    sections: Map<String, Value>,
}

impl Config {
    /// Reads and parses the configuration file at `path`.
    ///
    /// # Errors
    /// - `ErrorType::Io` if the file cannot be read.
    /// - `ErrorType::Config` if it is not a JSON object.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = utils::read(&path).pub_result(ErrorType::Io)?;
        Self::parse(path, &content)
    }

    /// Parses configuration `content` that was read from `path`.
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Result<Self> {
        let path = path.into();
        let value: Value = serde_json::from_str(content).map_err(|e| {
            Error::config(format!(
                "Invalid JSON in configuration file {}: {e}",
                path.display()
            ))
        })?;
        let Value::Object(sections) = value else {
            return Err(Error::config(format!(
                "The configuration file {} must contain a JSON object",
                path.display()
            )));
        };
        Ok(Self { path, sections })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fineco(&self) -> Result<FinecoConfig> {
        self.section()
    }

    pub fn paypal(&self) -> Result<PaypalConfig> {
        self.section()
    }

    pub fn n26(&self) -> Result<N26Config> {
        self.section()
    }

    pub fn unicredit(&self) -> Result<UnicreditConfig> {
        self.section()
    }

    /// Checks that section `T::NAME` exists and holds every key in `T::REQUIRED`, then
    /// deserializes and validates it. Every missing key is named in the error.
    fn section<T: Section>(&self) -> Result<T> {
        let name = T::NAME;
        let Some(value) = self.sections.get(name) else {
            return Err(Error::config(format!(
                "Missing '{name}' section in configuration."
            )));
        };
        let Some(object) = value.as_object() else {
            return Err(Error::config(format!(
                "The '{name}' section in configuration must be a JSON object."
            )));
        };

        let missing: Vec<&str> = T::REQUIRED
            .iter()
            .copied()
            .filter(|key| !object.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(Error::config(format!(
                "Missing required {name} configuration keys: {}",
                missing.join(", ")
            )));
        }

        let section: T = serde_json::from_value(value.clone()).map_err(|e| {
            Error::config(format!("Invalid '{name}' section in configuration: {e}"))
        })?;
        section
            .validate()
            .map_err(|e| Error::config(format!("Invalid '{name}' section in configuration: {e}")))?;
        Ok(section)
    }
}

/// A converter's section of the configuration file.
pub(crate) trait Section: DeserializeOwned {
    /// The key of the section in the configuration file.
    const NAME: &'static str;
    /// Keys that must be present. Every other key has a documented default.
    const REQUIRED: &'static [&'static str];

    fn validate(&self) -> anyhow::Result<()>;
}

/// Settings shared by every converter section. All of them are optional.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct IoSettings {
    /// Input file used when none is given on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_input: Option<PathBuf>,
    /// Output file used when none is given on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_output: Option<PathBuf>,
    /// The run fails if more rows than this have to be skipped. Absent means no limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_skipped_rows: Option<usize>,
}

// =============================================================================
// Fineco
// =============================================================================

/// The `fineco` section: settings for the spreadsheet normalizer.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct FinecoConfig {
    /// The account name used for rows that do not match a card marker.
    pub fineco_account: String,
    /// When set, the account name is read from this cell of the sheet instead, falling back to
    /// `fineco_account` if the cell is blank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_cell: Option<CellRef>,
    /// 0-based index of the row that holds the column labels.
    pub header_row: u32,
    pub required_columns: Vec<String>,
    pub currency_code: String,
    pub card_a: CardMarker,
    pub card_b: CardMarker,
    #[serde(default)]
    pub output_columns: OutputColumns,
    /// Matched against the full description; the first match applies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,
    /// Counter-account of rows no rule matched. Absent means the full description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_opposing_name: Option<String>,
    #[serde(flatten)]
    pub categories: CategoryDefaults,
    #[serde(flatten)]
    pub io: IoSettings,
}

impl Section for FinecoConfig {
    const NAME: &'static str = FINECO;
    const REQUIRED: &'static [&'static str] = &[
        "fineco_account",
        "header_row",
        "required_columns",
        "currency_code",
        "card_a",
        "card_b",
    ];

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            !self.required_columns.is_empty(),
            "'required_columns' must be a non-empty list"
        );
        ensure!(
            !self.fineco_account.trim().is_empty(),
            "'fineco_account' must not be empty"
        );
        ensure!(
            !self.currency_code.trim().is_empty(),
            "'currency_code' must not be empty"
        );
        for card in Card::ALL {
            self.card(card).validate(card)?;
        }
        validate_rules("rules", &self.rules)
    }
}

impl FinecoConfig {
    pub fn match_rule(&self, description: &str) -> Option<&Rule> {
        first_match(&self.rules, description)
    }

    pub fn card(&self, card: Card) -> &CardMarker {
        match card {
            Card::A => &self.card_a,
            Card::B => &self.card_b,
        }
    }

    /// The first card whose marker occurs in `description`.
    pub fn match_card(&self, description: &str) -> Option<Card> {
        Card::ALL
            .into_iter()
            .find(|card| description.contains(self.card(*card).number.as_str()))
    }
}

/// The payment cards a Fineco statement can contain. A closed set: a marker in the configuration
/// either maps to one of these or the configuration is rejected.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Card {
    #[serde(rename = "card_a")]
    A,
    #[serde(rename = "card_b")]
    B,
}

serde_plain::derive_display_from_serialize!(Card);

impl Card {
    pub const ALL: [Card; 2] = [Card::A, Card::B];
}

/// Identifies the transactions of one card and names the account they belong to.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CardMarker {
    /// Substring of the short description, e.g. the masked card number.
    pub number: String,
    pub source_account_name: String,
}

impl CardMarker {
    fn validate(&self, card: Card) -> anyhow::Result<()> {
        ensure!(
            !self.number.trim().is_empty(),
            "'{card}.number' must not be empty"
        );
        ensure!(
            !self.source_account_name.trim().is_empty(),
            "'{card}.source_account_name' must not be empty"
        );
        Ok(())
    }
}

/// A spreadsheet cell address written in A1 notation, stored 0-based.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl FromStr for CellRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(s.len());
        let (letters, digits) = s.split_at(split);
        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            bail!("Invalid cell reference '{s}', expected something like 'B2'");
        }
        let row: u32 = match digits.parse() {
            Ok(row) if row > 0 => row,
            _ => bail!("Invalid cell reference '{s}', expected something like 'B2'"),
        };
        let mut col: u32 = 0;
        for c in letters.chars() {
            let digit = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
            col = match col.checked_mul(26).and_then(|n| n.checked_add(digit)) {
                Some(col) => col,
                None => bail!("Cell reference '{s}' is out of range"),
            };
        }
        Ok(Self {
            row: row - 1,
            col: col - 1,
        })
    }
}

impl Display for CellRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut letters = Vec::new();
        let mut n = self.col + 1;
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push(char::from(b'A' + rem as u8));
            n = (n - 1) / 26;
        }
        let letters: String = letters.into_iter().rev().collect();
        write!(f, "{letters}{}", self.row + 1)
    }
}

serde_plain::derive_deserialize_from_fromstr!(CellRef, "a cell reference like \"B2\"");
serde_plain::derive_serialize_from_display!(CellRef);

// =============================================================================
// PayPal
// =============================================================================

/// How a transaction whose header and accounting rows are in different currencies is written.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionPolicy {
    /// One transaction in the accounting row's currency.
    #[default]
    SingleLeg,
    /// Two transactions, one per currency, sharing an external id.
    LinkedLegs,
}

serde_plain::derive_display_from_serialize!(ConversionPolicy);

/// The `paypal` section: settings for the ledger normalizer.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PaypalConfig {
    /// The user's PayPal account name in Firefly III.
    pub source_account: String,
    pub output_columns: OutputColumns,
    /// Whether a positive accounting amount means money left the user. Defaults to true.
    #[serde(default = "default_true")]
    pub positive_is_withdrawal: bool,
    #[serde(default)]
    pub conversion_policy: ConversionPolicy,
    /// A column whose value must match between a header row and its accounting row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairing_key_column: Option<String>,
    /// Matched against the counterparty name; the first match applies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,
    #[serde(flatten)]
    pub categories: CategoryDefaults,
    #[serde(flatten)]
    pub io: IoSettings,
}

impl Section for PaypalConfig {
    const NAME: &'static str = PAYPAL;
    const REQUIRED: &'static [&'static str] = &["source_account", "output_columns"];

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            !self.source_account.trim().is_empty(),
            "'source_account' must not be empty"
        );
        if let Some(key) = &self.pairing_key_column {
            ensure!(
                !key.trim().is_empty(),
                "'pairing_key_column' must not be empty when present"
            );
        }
        validate_rules("rules", &self.rules)
    }
}

impl PaypalConfig {
    pub fn match_rule(&self, name: &str) -> Option<&Rule> {
        first_match(&self.rules, name)
    }
}

fn default_true() -> bool {
    true
}

// =============================================================================
// N26
// =============================================================================

/// The `n26` section.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct N26Config {
    pub account_name: String,
    #[serde(default = "default_currency")]
    pub currency_code: String,
    #[serde(default)]
    pub output_columns: OutputColumns,
    #[serde(flatten)]
    pub io: IoSettings,
}

impl Section for N26Config {
    const NAME: &'static str = N26;
    const REQUIRED: &'static [&'static str] = &["account_name"];

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            !self.account_name.trim().is_empty(),
            "'account_name' must not be empty"
        );
        Ok(())
    }
}

// =============================================================================
// UniCredit
// =============================================================================

/// The `unicredit` section.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct UnicreditConfig {
    pub account_name: String,
    pub output_columns: OutputColumns,
    #[serde(default = "default_currency")]
    pub currency_code: String,
    /// Matched against the description; the first match applies.
    #[serde(default)]
    pub opposing_rules: Vec<Rule>,
    /// Counter-account of rows no rule matched, and of rules that name none.
    #[serde(default = "default_opposing_name")]
    pub default_opposing_name: String,
    #[serde(flatten)]
    pub categories: CategoryDefaults,
    #[serde(flatten)]
    pub io: IoSettings,
}

impl Section for UnicreditConfig {
    const NAME: &'static str = UNICREDIT;
    const REQUIRED: &'static [&'static str] = &["account_name", "output_columns"];

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            !self.account_name.trim().is_empty(),
            "'account_name' must not be empty"
        );
        validate_rules("opposing_rules", &self.opposing_rules)
    }
}

impl UnicreditConfig {
    pub fn match_rule(&self, description: &str) -> Option<&Rule> {
        first_match(&self.opposing_rules, description)
    }
}

// =============================================================================
// Rules
// =============================================================================

/// Recognizes transactions by their text and says what to do with them: name the counter-account,
/// set a category, add tags. Matching ignores case.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Every one of these must occur in the text.
    pub contains: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// The counter-account is another of the user's own accounts. Requires `account`.
    #[serde(default)]
    pub transfer: bool,
}

impl Rule {
    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.contains
            .iter()
            .all(|needle| text.contains(&needle.to_lowercase()))
    }

    fn validate(&self, key: &str, ix: usize) -> anyhow::Result<()> {
        ensure!(
            !self.contains.is_empty() && self.contains.iter().all(|s| !s.trim().is_empty()),
            "'{key}[{ix}].contains' must be a non-empty list of non-empty strings"
        );
        for (field, value) in [("account", &self.account), ("category", &self.category)] {
            if let Some(value) = value {
                ensure!(
                    !value.trim().is_empty(),
                    "'{key}[{ix}].{field}' must not be empty when present"
                );
            }
        }
        ensure!(
            self.account.is_some() || self.category.is_some() || !self.tags.is_empty(),
            "'{key}[{ix}]' must set at least one of account, category and tags"
        );
        if self.transfer && self.account.is_none() {
            bail!("'{key}[{ix}].transfer' requires 'account'");
        }
        Ok(())
    }
}

/// Category and tags for transactions that no rule matched.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CategoryDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_tags: Vec<String>,
}

/// The first rule that matches `text`.
fn first_match<'a>(rules: &'a [Rule], text: &str) -> Option<&'a Rule> {
    rules.iter().find(|rule| rule.matches(text))
}

fn validate_rules(key: &str, rules: &[Rule]) -> anyhow::Result<()> {
    rules
        .iter()
        .enumerate()
        .try_for_each(|(ix, rule)| rule.validate(key, ix))
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_opposing_name() -> String {
    DEFAULT_OPPOSING_NAME.to_string()
}
