use crate::config::CellRef;
use crate::error::{ErrorType, IntoResult};
use crate::model::{Cell, Mapping, MappingError, RawRow};
use crate::source::Table;
use crate::Result;
use anyhow::{anyhow, Context};
use calamine::{Data, Reader};
use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::path::Path;
use std::rc::Rc;
use tracing::debug;

/// A worksheet as a grid of cells addressed from `A1`, whatever range the workbook declares.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Sheet {
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// The cell at `at`, `Cell::Empty` if it is outside the used range.
    pub fn cell(&self, at: CellRef) -> &Cell {
        const EMPTY: &Cell = &Cell::Empty;
        self.rows
            .get(at.row as usize)
            .and_then(|row| row.get(at.col as usize))
            .unwrap_or(EMPTY)
    }

    /// Uses row `header_row` (0-based) as column labels and every later row that is not blank as
    /// a `RawRow`. Row numbers are 1-based sheet rows.
    pub fn table(&self, header_row: u32) -> std::result::Result<Table<Cell>, MappingError> {
        let header_row = header_row as usize;
        let headers = self
            .rows
            .get(header_row)
            .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>())
            .unwrap_or_default();
        let mapping = Rc::new(Mapping::new(headers)?);

        let rows = self
            .rows
            .iter()
            .enumerate()
            .skip(header_row + 1)
            .filter(|(_, row)| !row.iter().all(Cell::is_blank))
            .map(|(ix, row)| RawRow::new(ix + 1, Rc::clone(&mapping), row.clone()))
            .collect();

        Ok(Table { mapping, rows })
    }
}

/// Reads the first worksheet of the workbook at `path`.
///
/// # Errors
/// - `ErrorType::Io` if the file does not exist.
/// - `ErrorType::Parse` if it cannot be read as a workbook or has no sheets.
pub fn read_workbook(path: &Path) -> Result<Sheet> {
    if !path.is_file() {
        return Err(anyhow!("Input file {} does not exist", path.display()))
            .pub_result(ErrorType::Io);
    }
    load_first_sheet(path)
        .with_context(|| format!("Unable to read the workbook {}", path.display()))
        .pub_result(ErrorType::Parse)
}

fn load_first_sheet(path: &Path) -> anyhow::Result<Sheet> {
    let mut workbook = calamine::open_workbook_auto(path)?;
    let names = workbook.sheet_names();
    let name = names
        .first()
        .context("The workbook does not contain any sheets")?;
    debug!("Reading sheet '{name}' of {}", path.display());
    let range = workbook.worksheet_range(name)?;

    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; start_col as usize];
        cells.extend(row.iter().map(to_cell));
        rows.push(cells);
    }
    Ok(Sheet::new(rows))
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Number(Decimal::from(*i)),
        Data::Float(f) => match Decimal::from_f64(*f) {
            Some(d) => Cell::Number(d),
            None => Cell::Text(f.to_string()),
        },
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(dt) => Cell::Date(dt.date()),
            None => Decimal::from_f64(dt.as_f64()).map_or(Cell::Empty, Cell::Number),
        },
        Data::DateTimeIso(s) => {
            match s.get(..10).map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d")) {
                Some(Ok(d)) => Cell::Date(d),
                _ => Cell::Text(s.clone()),
            }
        }
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use std::str::FromStr;
    use tempfile::TempDir;

    fn t(s: &str) -> Cell {
        Cell::text(s)
    }

    fn sheet() -> Sheet {
        Sheet::new(vec![
            vec![t("Conto"), t("Fineco 12345")],
            vec![],
            vec![t("Data_Valuta"), t("Descrizione"), t("Entrate"), t("Uscite")],
            vec![
                t("01/02/2024"),
                t("Bonifico"),
                Cell::Number(Decimal::from(100)),
                Cell::Empty,
            ],
            vec![Cell::Empty, t("  "), Cell::Empty, Cell::Empty],
            vec![
                t("02/02/2024"),
                t("Carta"),
                Cell::Empty,
                Cell::Number(Decimal::from(-20)),
            ],
        ])
    }

    #[test]
    fn test_cell_lookup() {
        let sheet = sheet();
        assert_eq!(sheet.cell(CellRef { row: 0, col: 1 }), &t("Fineco 12345"));
        assert_eq!(sheet.cell(CellRef { row: 1, col: 5 }), &Cell::Empty);
        assert_eq!(sheet.cell(CellRef { row: 99, col: 0 }), &Cell::Empty);
    }

    #[test]
    fn test_table_from_header_row() {
        let table = sheet().table(2).unwrap();
        assert_eq!(table.mapping.len(), 4);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].row_number(), 4);
        assert_eq!(table.rows[1].row_number(), 6);
        assert_eq!(
            table.rows[1].get("Uscite"),
            Some(&Cell::Number(Decimal::from(-20)))
        );
    }

    #[test]
    fn test_header_row_past_end() {
        let table = sheet().table(40).unwrap();
        assert!(table.mapping.is_empty());
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_to_cell() {
        assert_eq!(to_cell(&Data::Float(12.5)), Cell::Number(Decimal::new(125, 1)));
        assert_eq!(to_cell(&Data::Int(3)), Cell::Number(Decimal::from(3)));
        assert_eq!(
            to_cell(&Data::DateTimeIso("2024-02-01T00:00:00".to_string())),
            Cell::Date(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
        );
        assert_eq!(to_cell(&Data::Empty), Cell::Empty);
    }

    /// A statement whose used range starts at B2: the account label on row 2, the header on row
    /// 4, a blank row between the two movements.
    fn write_statement(path: &Path) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(1, 1, "Conto Corrente:").unwrap();
        sheet.write_string(1, 2, "Conto 00012345").unwrap();
        for (col, label) in (1..).zip(["Data_Valuta", "Descrizione", "Entrate", "Uscite"]) {
            sheet.write_string(3, col, label).unwrap();
        }
        sheet.write_string(4, 1, "01/02/2024").unwrap();
        sheet.write_string(4, 2, "Bonifico").unwrap();
        sheet.write_number(4, 3, 2500.0).unwrap();
        sheet.write_string(6, 1, "02/02/2024").unwrap();
        sheet.write_string(6, 2, "Pagamento").unwrap();
        sheet.write_number(6, 4, -45.55).unwrap();
        workbook.save(path).unwrap();
    }

    #[test]
    fn test_read_workbook_keeps_sheet_coordinates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("statement.xlsx");
        write_statement(&path);

        let sheet = read_workbook(&path).unwrap();
        assert_eq!(sheet.cell(CellRef { row: 0, col: 0 }), &Cell::Empty);
        assert_eq!(
            sheet.cell(CellRef::from_str("C2").unwrap()),
            &t("Conto 00012345")
        );

        let table = sheet.table(3).unwrap();
        assert_eq!(table.mapping.index("Data_Valuta"), Some(1));
        assert_eq!(table.mapping.index("Uscite"), Some(4));
        let numbers: Vec<usize> = table.rows.iter().map(RawRow::row_number).collect();
        assert_eq!(numbers, vec![5, 7]);
        assert_eq!(table.rows[0].get("Descrizione"), Some(&t("Bonifico")));
        assert_eq!(
            table.rows[0].get("Entrate"),
            Some(&Cell::Number(Decimal::from(2500)))
        );
        assert_eq!(
            table.rows[1].get("Uscite"),
            Some(&Cell::Number(Decimal::new(-4555, 2)))
        );
    }

    #[test]
    fn test_missing_workbook_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = read_workbook(&dir.path().join("missing.xlsx")).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Io);
    }

    #[test]
    fn test_not_a_workbook_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("statement.xlsx");
        std::fs::write(&path, "this is not a zip file").unwrap();
        let err = read_workbook(&path).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Parse);
    }
}
