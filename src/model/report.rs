use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A row that a normalizer rejected, and why.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub row_number: usize,
    pub reason: String,
}

impl SkippedRow {
    pub fn new(row_number: usize, reason: impl Into<String>) -> Self {
        Self {
            row_number,
            reason: reason.into(),
        }
    }
}

impl Display for SkippedRow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: {}", self.row_number, self.reason)
    }
}

/// Which half of a ledger transaction an orphan is.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanKind {
    /// A header row that no accounting row followed.
    Header,
    /// An accounting row that no header row claimed.
    Accounting,
}

serde_plain::derive_display_from_serialize!(OrphanKind);

/// A ledger row without a pairing partner. Reported, never written to the output.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct OrphanRow {
    pub row_number: usize,
    pub kind: OrphanKind,
    /// The counterparty name for a header row, the row type for an accounting row.
    pub name: String,
    pub date: String,
}

impl Display for OrphanRow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: {}", self.row_number, self.name)
    }
}

/// What a normalizer produced besides the transactions themselves.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RowReport {
    /// Number of source rows that became at least one transaction.
    pub processed: usize,
    pub skipped: Vec<SkippedRow>,
    pub orphans: Vec<OrphanRow>,
}

impl RowReport {
    pub fn skip(&mut self, row_number: usize, reason: impl Into<String>) {
        self.skipped.push(SkippedRow::new(row_number, reason));
    }
}
