use crate::error::{ErrorType, IntoResult};
use crate::model::{Mapping, RawRow};
use crate::source::Table;
use crate::{utils, Result};
use anyhow::Context;
use std::path::Path;
use std::rc::Rc;
use tracing::trace;

/// Reads the CSV file at `path`. A leading byte-order mark is removed before parsing.
///
/// # Errors
/// - `ErrorType::Io` if the file cannot be read.
/// - `ErrorType::Parse` if it is not valid CSV or has duplicate header labels.
pub fn read_csv(path: &Path, delimiter: u8) -> Result<Table<String>> {
    let content = utils::read_text(path).pub_result(ErrorType::Io)?;
    parse_csv(&content, delimiter)
        .with_context(|| format!("Unable to parse {}", path.display()))
        .pub_result(ErrorType::Parse)
}

/// Parses CSV `content`. The first record is the header. Records where every field is blank are
/// dropped. Row numbers are the line numbers the records start on.
pub fn parse_csv(content: &str, delimiter: u8) -> anyhow::Result<Table<String>> {
    let content = utils::strip_bom(content.to_string());
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers().context("Unable to read the header line")?;
    let mapping = Rc::new(Mapping::new(headers.iter())?);

    let mut rows = Vec::new();
    for (ix, result) in reader.records().enumerate() {
        let record = result.context("Malformed CSV record")?;
        let row_number = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(ix + 2);
        if record.iter().all(|field| field.trim().is_empty()) {
            trace!("Ignoring blank line {row_number}");
            continue;
        }
        let values = record.iter().map(str::to_string).collect();
        rows.push(RawRow::new(row_number, Rc::clone(&mapping), values));
    }

    Ok(Table { mapping, rows })
}
