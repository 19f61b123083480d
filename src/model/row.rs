use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MappingError(String);

impl Display for MappingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl StdError for MappingError {}

/// The header line of a source table: column labels in file order and a lookup from label to
/// position. Blank labels are kept so positions line up but cannot be looked up.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct Mapping {
    headers: Vec<String>,
    header_map: HashMap<String, usize>,
}

impl Mapping {
    /// Create a new `Mapping` from a list of header labels. Labels are trimmed. Two non-blank
    /// labels that are equal after trimming are an error.
    pub fn new<S, I>(headers: I) -> Result<Self, MappingError>
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        let headers: Vec<String> = headers
            .into_iter()
            .map(|s| s.into().trim().to_string())
            .collect();

        let mut header_map = HashMap::new();
        for (idx, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            if header_map.insert(header.clone(), idx).is_some() {
                return Err(MappingError(format!(
                    "Encountered a duplicate header '{header}'"
                )));
            }
        }

        Ok(Self {
            headers,
            header_map,
        })
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn index(&self, label: &str) -> Option<usize> {
        self.header_map.get(label).copied()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.header_map.contains_key(label)
    }

    /// Returns the labels from `required` that are not in this mapping, in the order given.
    pub fn missing<'a, I, S>(&self, required: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a S>,
        S: AsRef<str> + ?Sized + 'a,
    {
        let mut missing: Vec<String> = Vec::new();
        for label in required {
            let label = label.as_ref();
            if !self.contains(label) && !missing.iter().any(|m| m == label) {
                missing.push(label.to_string());
            }
        }
        missing
    }
}

impl Serialize for Mapping {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.headers.serialize(serializer)
    }
}

/// One transaction-bearing row of a source table, as read from the file.
///
/// The row shares its table's `Mapping` so cells can be looked up by column label. `V` is the cell
/// type: `String` for CSV files, `Cell` for spreadsheets.
#[derive(Debug, Clone)]
pub struct RawRow<V> {
    row_number: usize,
    mapping: Rc<Mapping>,
    values: Vec<V>,
}

impl<V> RawRow<V> {
    pub fn new(row_number: usize, mapping: Rc<Mapping>, values: Vec<V>) -> Self {
        Self {
            row_number,
            mapping,
            values,
        }
    }

    /// The 1-based row (or line) number in the source file.
    pub fn row_number(&self) -> usize {
        self.row_number
    }

    pub fn get(&self, label: &str) -> Option<&V> {
        self.mapping
            .index(label)
            .and_then(|idx| self.values.get(idx))
    }

    pub fn values(&self) -> &[V] {
        &self.values
    }

    /// Label/value pairs in column order. Values beyond the header are not included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.mapping
            .headers()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl RawRow<String> {
    /// The trimmed text of the cell under `label`, or `""` if the column or cell is absent.
    pub fn text(&self, label: &str) -> &str {
        self.get(label).map(|s| s.trim()).unwrap_or_default()
    }
}
