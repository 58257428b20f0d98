//! Row documents: one flat text document per table row.
//!
//! Each document's text starts with `SOURCE=<table> ROW=<index>` so a
//! retrieved hit carries its provenance without a separate lookup.

use serde::Serialize;

use crate::data::{Dataset, Table};

/// Separator between the provenance prefix and each `column=value` pair.
pub const FIELD_SEPARATOR: &str = " | ";

/// Row caps per source table, in the order documents are indexed.
pub const DEFAULT_ROW_LIMITS: [(&str, usize); 5] = [
    ("jobs", 2000),
    ("machines", 2000),
    ("operations", 5000),
    ("parts_suppliers", 2000),
    ("job_parts", 5000),
];

/// A flattened, immutable representation of one table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    source: String,
    row_index: usize,
    text: String,
}

impl Document {
    /// Source table name.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Zero-based row position in the source table.
    #[must_use]
    pub const fn row_index(&self) -> usize {
        self.row_index
    }

    /// Full document text, including the provenance prefix.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Builds a document from already-rendered text.
    ///
    /// Used where the text does not come from a [`Table`] row (tests, ad-hoc
    /// corpora). The caller is responsible for including provenance.
    #[must_use]
    pub fn from_text(source: impl Into<String>, row_index: usize, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            row_index,
            text: text.into(),
        }
    }
}

/// Converts the first `max_rows` rows of `table` into documents.
///
/// Output is byte-identical for identical input.
#[must_use]
pub fn row_documents(table: &Table, source: &str, max_rows: usize) -> Vec<Document> {
    table
        .rows()
        .iter()
        .take(max_rows)
        .enumerate()
        .map(|(row_index, cells)| {
            let mut text = format!("SOURCE={source} ROW={row_index}");
            for (column, value) in table.columns().iter().zip(cells) {
                text.push_str(FIELD_SEPARATOR);
                text.push_str(column);
                text.push('=');
                text.push_str(value);
            }
            Document {
                source: source.to_string(),
                row_index,
                text,
            }
        })
        .collect()
}

/// Documents for every table in the dataset, using [`DEFAULT_ROW_LIMITS`].
#[must_use]
pub fn dataset_documents(dataset: &Dataset) -> Vec<Document> {
    let tables = [
        &dataset.jobs,
        &dataset.machines,
        &dataset.operations,
        &dataset.parts,
        &dataset.job_parts,
    ];
    tables
        .into_iter()
        .zip(DEFAULT_ROW_LIMITS)
        .flat_map(|(table, (source, limit))| row_documents(table, source, limit))
        .collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn machines() -> Table {
        Table::from_reader(
            "machines",
            "machine_id,status\nM001,UP\nM004,DOWN\nM002,UP\n".as_bytes(),
        )
        .unwrap_or_else(|e| panic!("parse failed: {e}"))
    }

    #[test]
    fn test_row_documents_format() {
        let docs = row_documents(&machines(), "machines", 10);
        let texts: Vec<&str> = docs.iter().map(Document::text).collect();
        assert_eq!(
            texts,
            vec![
                "SOURCE=machines ROW=0 | machine_id=M001 | status=UP",
                "SOURCE=machines ROW=1 | machine_id=M004 | status=DOWN",
                "SOURCE=machines ROW=2 | machine_id=M002 | status=UP",
            ]
        );
        assert_eq!(docs[1].source(), "machines");
        assert_eq!(docs[1].row_index(), 1);
    }

    #[test]
    fn test_row_documents_truncates() {
        let docs = row_documents(&machines(), "machines", 2);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].row_index(), 1);
        assert!(row_documents(&machines(), "machines", 0).is_empty());
    }

    #[test]
    fn test_row_documents_deterministic() {
        let table = machines();
        assert_eq!(
            row_documents(&table, "machines", 3),
            row_documents(&table, "machines", 3)
        );
    }

    #[test]
    fn test_source_name_overrides_table_name() {
        let docs = row_documents(&machines(), "fleet", 1);
        assert!(docs[0].text().starts_with("SOURCE=fleet ROW=0 | "));
    }
}
