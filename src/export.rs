//! Exported table serialization (CSV / Excel / JSON / preview)
//!
//! Pure serialization functions, no filesystem or clipboard I/O. The caller
//! writes the returned string wherever it goes.

use crate::table::RecordTable;
use serde_json::Value;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Export format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Delimited with the configured separator
    Csv,
    /// Tab-delimited, for pasting into spreadsheets
    Excel,
    Json,
}

impl ExportFormat {
    /// File extension for this format (without leading dot)
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "tsv",
            ExportFormat::Json => "json",
        }
    }

    /// Serialize `table` in this format. `csv_separator` only applies to
    /// [`ExportFormat::Csv`].
    pub fn serialize(&self, table: &RecordTable, csv_separator: char) -> String {
        match self {
            ExportFormat::Csv => to_delimited(table, csv_separator),
            ExportFormat::Excel => to_delimited(table, '\t'),
            ExportFormat::Json => to_json(table.records()),
        }
    }
}

/// Quoted delimiter-separated text of the visible table.
pub fn to_delimited(table: &RecordTable, delimiter: char) -> String {
    table.serialize(delimiter)
}

/// Raw records as pretty-printed JSON (two-space indent).
pub fn to_json(records: &[Value]) -> String {
    serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string())
}

const MIN_COLUMN_WIDTH: usize = 4;
const MAX_COLUMN_WIDTH: usize = 40;
/// Rows sampled to size columns
const WIDTH_SAMPLE_ROWS: usize = 100;

/// Aligned plain-text rendering of the visible rows and display columns.
pub fn to_preview(table: &RecordTable) -> String {
    if table.is_empty() {
        return String::new();
    }
    let header = table.header();
    let columns: Vec<usize> = (1..header.len())
        .filter(|c| table.is_column_visible(*c))
        .collect();
    let rows: Vec<&[Option<String>]> = table
        .row_visibility()
        .iter()
        .enumerate()
        .filter(|(_, visible)| **visible)
        .filter_map(|(i, _)| table.row(i))
        .collect();

    let widths = compute_column_widths(&header, &columns, &rows);
    let mut out = String::new();
    let header_cells: Vec<&str> = columns.iter().map(|c| header[*c]).collect();
    push_line(&mut out, &header_cells, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');
    for row in rows {
        let cells: Vec<&str> = columns
            .iter()
            .map(|c| row.get(*c).and_then(|v| v.as_deref()).unwrap_or(""))
            .collect();
        push_line(&mut out, &cells, &widths);
    }
    out
}

fn push_line(out: &mut String, cells: &[&str], widths: &[usize]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let text = truncate_str(&single_line(cell), *width);
            let pad = width.saturating_sub(text.width());
            format!("{text}{}", " ".repeat(pad))
        })
        .collect();
    out.push_str(padded.join(" | ").trim_end());
    out.push('\n');
}

fn compute_column_widths(
    header: &[&str],
    columns: &[usize],
    rows: &[&[Option<String>]],
) -> Vec<usize> {
    columns
        .iter()
        .map(|c| {
            let cells = rows
                .iter()
                .take(WIDTH_SAMPLE_ROWS)
                .filter_map(|row| row.get(*c).and_then(|v| v.as_deref()));
            cells
                .map(|cell| single_line(cell).width())
                .chain(std::iter::once(header[*c].width()))
                .max()
                .unwrap_or(0)
                .clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
        })
        .collect()
}

fn single_line(s: &str) -> String {
    s.replace(['\r', '\n', '\t'], " ")
}

/// Cut `s` to at most `max` display columns, marking the cut with `...`
fn truncate_str(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    let budget = max.saturating_sub(3);
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    if max > 3 {
        out.push_str("...");
    }
    out
}
