//! Output formatting for CLI commands.

use std::fmt::Write as FmtWrite;

use clap::ValueEnum;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::data::Table;
use crate::replan::RankedDocument;

/// Rendering mode selected with `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Serializes `value` as pretty JSON with a trailing newline.
    #[must_use]
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> String {
        let mut out = serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"));
        out.push('\n');
        out
    }
}

/// Table rows as JSON objects keyed by column name.
#[must_use]
pub fn table_json(table: &Table) -> Value {
    Value::Array(
        table
            .rows()
            .iter()
            .map(|cells| {
                let object: Map<String, Value> = table
                    .columns()
                    .iter()
                    .zip(cells)
                    .map(|(column, value)| (column.clone(), Value::String(value.clone())))
                    .collect();
                Value::Object(object)
            })
            .collect(),
    )
}

/// Renders a table with left-aligned, width-fitted columns.
#[must_use]
pub fn format_table(table: &Table) -> String {
    if table.is_empty() {
        return format!("({} is empty)\n", table.name());
    }

    let mut widths: Vec<usize> = table.columns().iter().map(|c| c.chars().count()).collect();
    for cells in table.rows() {
        for (width, value) in widths.iter_mut().zip(cells) {
            *width = (*width).max(value.chars().count());
        }
    }

    let render = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(value, &width)| format!("{value:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut output = String::new();
    let _ = writeln!(output, "{}", render(table.columns()));
    let rule = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    let _ = writeln!(output, "{}", "-".repeat(rule));
    for cells in table.rows() {
        let _ = writeln!(output, "{}", render(cells.as_slice()));
    }
    output
}

/// Renders search hits, one block per document.
#[must_use]
pub fn format_search_results(results: &[RankedDocument], query: &str) -> String {
    if results.is_empty() {
        return format!("No results found for query: \"{query}\"\n");
    }

    let mut output = String::new();
    let _ = writeln!(
        output,
        "Search results for \"{query}\" ({} results):\n",
        results.len()
    );
    for hit in results {
        let _ = writeln!(
            output,
            "{:<8.4} {}[{}]",
            hit.score,
            hit.document.source(),
            hit.document.row_index()
        );
        let _ = writeln!(output, "  {}", hit.document.text());
    }
    output
}
