//! The columns that can appear in an output file.

use crate::model::NormalizedTransaction;
use serde::de::Error as SerdeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The standard output layout, used when a converter's configuration does not name one.
pub const STANDARD_COLUMNS: [&str; 9] = [
    "date",
    "description",
    "amount",
    "currency_code",
    "type",
    "source_name",
    "destination_name",
    "notes",
    "external_id",
];

/// A field of `NormalizedTransaction` that an output column can hold.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Field {
    Date,
    Description,
    Amount,
    CurrencyCode,
    Type,
    SourceName,
    DestinationName,
    /// The user's own account, whichever side it is on.
    Account,
    /// The counter-account, whichever side it is on.
    Opposing,
    Notes,
    ExternalId,
    /// Set by the section's rules; empty when nothing applied.
    Category,
    /// Comma separated.
    Tags,
}

impl Field {
    /// The text written to the output cell for transaction `t`.
    pub fn value(&self, t: &NormalizedTransaction) -> String {
        match self {
            Field::Date => t.date.format("%Y-%m-%d").to_string(),
            Field::Description => t.description.clone(),
            Field::Amount => t.amount.to_string(),
            Field::CurrencyCode => t.currency_code.clone(),
            Field::Type => t.transaction_type.to_string(),
            Field::SourceName => t.source_name.clone(),
            Field::DestinationName => t.destination_name.clone(),
            Field::Account => t.account().to_string(),
            Field::Opposing => t.counterparty().to_string(),
            Field::Notes => t.notes.clone().unwrap_or_default(),
            Field::ExternalId => t.external_id.clone().unwrap_or_default(),
            Field::Category => t.category.clone().unwrap_or_default(),
            Field::Tags => t.tags.join(","),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UnknownColumn(String);

impl Display for UnknownColumn {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown output column '{}'", self.0)
    }
}

impl std::error::Error for UnknownColumn {}

impl FromStr for Field {
    type Err = UnknownColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "date" | "date_transaction" => Ok(Field::Date),
            "description" => Ok(Field::Description),
            "amount" => Ok(Field::Amount),
            "currency_code" | "currency" => Ok(Field::CurrencyCode),
            "type" => Ok(Field::Type),
            "source_name" | "source_account" => Ok(Field::SourceName),
            "destination_name" | "destination_account" => Ok(Field::DestinationName),
            "account-name" | "account_name" => Ok(Field::Account),
            "opposing-name" | "opposing_name" => Ok(Field::Opposing),
            "notes" => Ok(Field::Notes),
            "external_id" => Ok(Field::ExternalId),
            "category" => Ok(Field::Category),
            "tags" => Ok(Field::Tags),
            bad => Err(UnknownColumn(bad.to_string())),
        }
    }
}

/// The configured output layout: header labels exactly as configured, each bound to a `Field`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OutputColumns {
    columns: Vec<(String, Field)>,
}

impl OutputColumns {
    /// Binds each label to its field. Fails on an empty list or an unknown label.
    pub fn new<S, I>(labels: I) -> Result<Self, UnknownColumn>
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        let columns = labels
            .into_iter()
            .map(|label| {
                let label = label.into();
                let field = Field::from_str(&label)?;
                Ok((label, field))
            })
            .collect::<Result<Vec<_>, UnknownColumn>>()?;
        if columns.is_empty() {
            return Err(UnknownColumn(String::from("(no columns configured)")));
        }
        Ok(Self { columns })
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(label, _)| label.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.columns.iter().map(|(_, field)| *field)
    }

    /// The output cells for `t` in column order.
    pub fn record(&self, t: &NormalizedTransaction) -> Vec<String> {
        self.fields().map(|field| field.value(t)).collect()
    }
}

impl Default for OutputColumns {
    fn default() -> Self {
        Self {
            columns: STANDARD_COLUMNS
                .iter()
                .filter_map(|label| {
                    Field::from_str(label)
                        .ok()
                        .map(|field| (label.to_string(), field))
                })
                .collect(),
        }
    }
}

impl Serialize for OutputColumns {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.labels())
    }
}

impl<'de> Deserialize<'de> for OutputColumns {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let labels: Vec<String> = Vec::deserialize(deserializer)?;
        OutputColumns::new(labels).map_err(D::Error::custom)
    }
}
