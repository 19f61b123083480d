//! Types that represent the core data model: source rows on the way in, normalized transactions on
//! the way out.
mod amount;
mod cell;
mod column;
mod report;
mod row;
mod transaction;

pub use amount::{Amount, AmountError, AmountFormat};
pub use cell::Cell;
pub use column::{Field, OutputColumns, UnknownColumn, STANDARD_COLUMNS};
pub use report::{OrphanKind, OrphanRow, RowReport, SkippedRow};
pub use row::{Mapping, MappingError, RawRow};
pub use transaction::{NormalizedTransaction, TransactionType};

/// The result of running a normalizer over a whole input file.
#[derive(Debug, Default, Clone)]
pub struct Normalized {
    pub transactions: Vec<NormalizedTransaction>,
    pub report: RowReport,
}
