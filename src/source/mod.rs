//! Readers that turn input files into a `Table` of `RawRow`s.
//!
//! Readers only deal with file structure. Interpreting cells is up to the normalizers.

mod csv;
mod sheet;

pub use self::csv::{parse_csv, read_csv};
pub use sheet::{read_workbook, Sheet};

use crate::model::{Mapping, RawRow};
use std::rc::Rc;

/// A header line and the rows under it.
#[derive(Debug, Clone)]
pub struct Table<V> {
    pub mapping: Rc<Mapping>,
    pub rows: Vec<RawRow<V>>,
}

impl<V> Table<V> {
    /// The configured labels that this table's header does not have.
    pub fn missing_columns<'a, I, S>(&self, required: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a S>,
        S: AsRef<str> + ?Sized + 'a,
    {
        self.mapping.missing(required)
    }
}
