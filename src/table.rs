//! Data tables attached to scenario steps.
//!
//! A table has a header row naming its columns and any number of data rows.
//! Cells are kept as strings; converting them into richer types is the job of
//! step argument transformations or [`Table::deserialize_rows`].

use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors raised while building or reading a [`Table`].
#[derive(Debug, Error)]
pub enum TableError {
    /// A header cell was repeated.
    #[error("duplicate table header '{header}'")]
    DuplicateHeader {
        /// The repeated header.
        header: String,
    },
    /// A row did not have one cell per header.
    #[error("table row has {actual} cells but the header declares {expected}")]
    RowWidth {
        /// Number of header cells.
        expected: usize,
        /// Number of cells supplied.
        actual: usize,
    },
    /// A row could not be deserialised into the requested type.
    #[error("failed to deserialise table row {row}")]
    Deserialize {
        /// Zero-based data row index.
        row: usize,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

/// One data row, addressable by column name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct TableRow {
    cells: IndexMap<String, String>,
}

impl TableRow {
    /// Cell value for `column`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    /// Iterate `(column, value)` pairs in header order.
    pub fn cells(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Cell values in header order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cells.values().map(String::as_str)
    }
}

/// A step data table.
///
/// # Examples
///
/// ```
/// use stepbind::table::Table;
///
/// let mut table = Table::new(["Name", "Age"]).expect("headers");
/// table.add_row(["Ada", "36"]).expect("row");
/// assert_eq!(table.row_count(), 1);
/// assert_eq!(table.rows()[0].get("Name"), Some("Ada"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<TableRow>,
}

impl Table {
    /// Create an empty table with the given header row.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::DuplicateHeader`] when a header repeats.
    pub fn new<I, S>(headers: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: Vec<String> = Vec::new();
        for header in headers {
            let name: String = header.into();
            if seen.contains(&name) {
                return Err(TableError::DuplicateHeader { header: name });
            }
            seen.push(name);
        }
        Ok(Self {
            headers: seen,
            rows: Vec::new(),
        })
    }

    /// Build a table from raw rows where the first row is the header.
    ///
    /// An empty input yields an empty table without columns.
    ///
    /// # Errors
    ///
    /// Returns an error when headers repeat or a row width differs from the
    /// header width.
    pub fn from_rows(rows: Vec<Vec<String>>) -> Result<Self, TableError> {
        let mut iter = rows.into_iter();
        let Some(header) = iter.next() else {
            return Ok(Self::default());
        };
        let mut table = Self::new(header)?;
        for row in iter {
            table.add_row(row)?;
        }
        Ok(table)
    }

    /// Append a data row.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::RowWidth`] when the cell count differs from the
    /// header count.
    pub fn add_row<I, S>(&mut self, cells: I) -> Result<(), TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = cells.into_iter().map(Into::into).collect();
        if values.len() != self.headers.len() {
            return Err(TableError::RowWidth {
                expected: self.headers.len(),
                actual: values.len(),
            });
        }
        let row = self.headers.iter().cloned().zip(values).collect();
        self.rows.push(TableRow { cells: row });
        Ok(())
    }

    /// Column names in order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows in order.
    #[must_use]
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Number of data rows (the header is not counted).
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Deserialise every row into `T`, treating each row as a map of column
    /// name to string value.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Deserialize`] naming the first row that fails.
    pub fn deserialize_rows<T: DeserializeOwned>(&self) -> Result<Vec<T>, TableError> {
        self.rows
            .iter()
            .enumerate()
            .map(|(row, cells)| {
                let object: serde_json::Map<String, serde_json::Value> = cells
                    .cells()
                    .map(|(k, v)| (k.to_owned(), serde_json::Value::from(v)))
                    .collect();
                serde_json::from_value(serde_json::Value::Object(object))
                    .map_err(|source| TableError::Deserialize { row, source })
            })
            .collect()
    }
}
