use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The Firefly III transaction types.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Money leaves one of the user's accounts.
    Withdrawal,
    /// Money enters one of the user's accounts.
    Deposit,
    /// Money moves between two of the user's accounts.
    Transfer,
}

serde_plain::derive_display_from_serialize!(TransactionType);
serde_plain::derive_fromstr_from_deserialize!(TransactionType);

impl TransactionType {
    /// Derives the type from the sign of a net amount as seen from the user's account: a negative
    /// amount is a withdrawal, anything else a deposit.
    pub fn from_net(net: Decimal) -> Self {
        if net.is_sign_negative() && !net.is_zero() {
            TransactionType::Withdrawal
        } else {
            TransactionType::Deposit
        }
    }
}

/// One row of the output file.
///
/// `amount` is always a non-negative magnitude. The direction lives in `transaction_type` together
/// with which of `source_name` and `destination_name` is the user's own account: the source for a
/// withdrawal, the destination for a deposit. Use `NormalizedTransaction::new` to get that right.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NormalizedTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub currency_code: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub source_name: String,
    pub destination_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl NormalizedTransaction {
    /// Builds a transaction from a signed `net` amount as seen from `account`.
    ///
    /// A negative `net` is a withdrawal from `account` to `counterparty`, anything else is a
    /// deposit from `counterparty` into `account`.
    pub fn new(
        date: NaiveDate,
        description: impl Into<String>,
        net: Decimal,
        currency_code: impl Into<String>,
        account: impl Into<String>,
        counterparty: impl Into<String>,
    ) -> Self {
        Self::with_type(
            date,
            description,
            net,
            currency_code,
            TransactionType::from_net(net),
            account,
            counterparty,
        )
    }

    /// Like `new` but with an explicit type. For a withdrawal or a transfer `account` is the
    /// source, for a deposit it is the destination.
    pub fn with_type(
        date: NaiveDate,
        description: impl Into<String>,
        amount: Decimal,
        currency_code: impl Into<String>,
        transaction_type: TransactionType,
        account: impl Into<String>,
        counterparty: impl Into<String>,
    ) -> Self {
        let (source_name, destination_name) = match transaction_type {
            TransactionType::Withdrawal | TransactionType::Transfer => {
                (account.into(), counterparty.into())
            }
            TransactionType::Deposit => (counterparty.into(), account.into()),
        };
        Self {
            date,
            description: description.into(),
            amount: amount.abs(),
            currency_code: currency_code.into(),
            transaction_type,
            source_name,
            destination_name,
            notes: None,
            external_id: None,
            category: None,
            tags: Vec::new(),
        }
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    /// Sets the category and tags. An empty category is left unset.
    pub fn categorize(mut self, category: Option<&str>, tags: &[String]) -> Self {
        self.category = category.filter(|c| !c.is_empty()).map(ToOwned::to_owned);
        self.tags = tags.to_vec();
        self
    }

    /// The user's own account: the source of a withdrawal or transfer, the destination of a
    /// deposit.
    pub fn account(&self) -> &str {
        match self.transaction_type {
            TransactionType::Withdrawal | TransactionType::Transfer => &self.source_name,
            TransactionType::Deposit => &self.destination_name,
        }
    }

    /// The other side of the transaction.
    pub fn counterparty(&self) -> &str {
        match self.transaction_type {
            TransactionType::Withdrawal | TransactionType::Transfer => &self.destination_name,
            TransactionType::Deposit => &self.source_name,
        }
    }
}
