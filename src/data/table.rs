//! In-memory string tables loaded from CSV.

use std::io::Read;
use std::path::Path;

use crate::error::DataError;

/// A named table of string cells with a header row.
///
/// Row order is the file order and is what [`crate::evidence`] uses as the
/// row index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Creates a table from already-split rows.
    ///
    /// Rows shorter than the header are padded with empty cells; longer rows
    /// are truncated.
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    /// Loads a CSV file with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Csv`] if the file is missing or malformed.
    pub fn from_path(name: impl Into<String>, path: &Path) -> Result<Self, DataError> {
        let csv_err = |source| DataError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let reader = csv::Reader::from_path(path).map_err(csv_err)?;
        Self::read_all(name.into(), reader).map_err(csv_err)
    }

    /// Loads CSV from any reader.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Table`] on malformed input.
    pub fn from_reader(name: impl Into<String>, reader: impl Read) -> Result<Self, DataError> {
        let name = name.into();
        Self::read_all(name.clone(), csv::Reader::from_reader(reader))
            .map_err(|source| DataError::Table { table: name, source })
    }

    fn read_all<R: Read>(name: String, mut reader: csv::Reader<R>) -> Result<Self, csv::Error> {
        let columns = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let rows = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()?;
        Ok(Self { name, columns, rows })
    }

    /// Table name (used as the evidence source tag).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column names in header order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows in file order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no data rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, if present.
    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Position of a column that the caller requires.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MissingColumn`] if the column is absent.
    pub fn require_column(&self, column: &str) -> Result<usize, DataError> {
        self.column_index(column)
            .ok_or_else(|| DataError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Cell at `row` under `column`, if both exist.
    #[must_use]
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// Serializes the table back to CSV text (header + rows, `\n` endings).
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Table`] if the writer fails.
    pub fn to_csv(&self) -> Result<String, DataError> {
        let table_err = |source| DataError::Table {
            table: self.name.clone(),
            source,
        };
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(&self.columns).map_err(table_err)?;
        for row in &self.rows {
            writer.write_record(row).map_err(table_err)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| table_err(csv::Error::from(e.into_error())))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
