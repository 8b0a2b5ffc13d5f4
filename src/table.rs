//! Record table projector
//!
//! Flattens nested query records into one rectangular table. Columns are
//! discovered as records arrive: declared select-list fields first, in
//! select-list order, then any other key found in the data. Dotted paths
//! name nested values (`Owner.Name`, `Contacts.0.Id`). Column 0 holds the
//! record itself and the header is row 0.

use crate::query::{FieldNode, SelectList};
use indexmap::IndexSet;
use serde_json::{Map, Value};

/// Key holding per-record type and URL information
const ATTRIBUTES_KEY: &str = "attributes";

/// Header of the record column
const RECORD_COLUMN: &str = "_";

/// Largest record count that may be handed to the bulk delete flow
const MAX_DELETE_RECORDS: usize = 20_000;

/// Textual form of a cell value
pub fn render_cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(render_number(n)),
        Value::Object(map) => Some(
            match map
                .get(ATTRIBUTES_KEY)
                .and_then(|a| a.get("type"))
                .and_then(Value::as_str)
            {
                Some(type_name) => format!("[{type_name}]"),
                None => value.to_string(),
            },
        ),
        Value::Array(_) => Some(value.to_string()),
    }
}

/// Integral floats print without a fraction (`3.0` as `3`)
fn render_number(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
        _ => n.to_string(),
    }
}

/// Flattened, filterable view of exported records
#[derive(Debug, Clone)]
pub struct RecordTable {
    columns: IndexSet<String>,
    col_visible: Vec<bool>,
    /// Data rows, without the header
    rows: Vec<Vec<Option<String>>>,
    row_visible: Vec<bool>,
    records: Vec<Value>,
    declared: Vec<FieldNode>,
    filter: String,
    count_visible: Option<usize>,
    /// Total matching records reported by the endpoint, `-1` when unknown
    pub total_size: i64,
}

impl Default for RecordTable {
    fn default() -> Self {
        Self::new(SelectList::default())
    }
}

impl RecordTable {
    /// Empty table seeded with the query's select list
    pub fn new(select: SelectList) -> Self {
        let mut columns = IndexSet::new();
        columns.insert(RECORD_COLUMN.to_string());
        Self {
            columns,
            col_visible: vec![true],
            rows: Vec::new(),
            row_visible: Vec::new(),
            records: Vec::new(),
            declared: select.fields,
            filter: String::new(),
            count_visible: None,
            total_size: -1,
        }
    }

    /// Append a page of records
    pub fn add_batch(&mut self, records: &[Value]) {
        for record in records {
            let mut row = vec![None; self.columns.len()];
            row[0] = render_cell(record);
            if let Value::Object(fields) = record {
                self.seed_declared(fields, &mut row);
                self.discover_fields(fields, "", &mut row);
            }
            row.resize(self.columns.len(), None);
            self.row_visible.push(self.is_row_visible(&row));
            self.rows.push(row);
            self.records.push(record.clone());
        }
        if self.count_visible.is_some() {
            self.count_visible = Some(self.row_visible.iter().filter(|v| **v).count());
        }
        tracing::debug!(
            records = self.records.len(),
            columns = self.columns.len(),
            "merged batch"
        );
    }

    /// Slot of `column`, adding it (and padding every earlier row) when new
    fn column_slot(&mut self, column: &str, visible: bool, row: &mut Vec<Option<String>>) -> usize {
        if let Some(index) = self.columns.get_index_of(column) {
            return index;
        }
        let (index, _) = self.columns.insert_full(column.to_string());
        self.col_visible.push(visible);
        for existing in &mut self.rows {
            existing.push(None);
        }
        row.resize(self.columns.len(), None);
        index
    }

    /// Declared fields take the first columns, with their case corrected to
    /// the record's actual keys.
    fn seed_declared(&mut self, fields: &Map<String, Value>, row: &mut Vec<Option<String>>) {
        let mut declared = std::mem::take(&mut self.declared);
        for field in &mut declared {
            if field.name.is_empty() {
                continue;
            }
            if let Some(key) = fields.keys().find(|k| k.eq_ignore_ascii_case(&field.name)) {
                field.name = key.clone();
            }
            if self.columns.contains(&field.name) {
                continue;
            }
            // Subquery columns only anchor their nested columns
            self.column_slot(&field.name, !field.is_subquery(), row);
            // Parent objects of a dotted path are placeholders too
            let mut parent = String::new();
            let parts: Vec<&str> = field.name.split('.').collect();
            for part in &parts[..parts.len() - 1] {
                if !parent.is_empty() {
                    parent.push('.');
                }
                parent.push_str(part);
                if !self.columns.contains(&parent) {
                    self.column_slot(&parent, false, row);
                }
            }
        }
        self.declared = declared;
    }

    fn discover_fields(
        &mut self,
        fields: &Map<String, Value>,
        prefix: &str,
        row: &mut Vec<Option<String>>,
    ) {
        for (key, value) in fields {
            if key == ATTRIBUTES_KEY {
                continue;
            }
            self.discover_value(&format!("{prefix}{key}"), value, row);
        }
    }

    fn discover_value(&mut self, column: &str, value: &Value, row: &mut Vec<Option<String>>) {
        // Relationship query results wrap their records
        let value = match value {
            Value::Object(map) => map.get("records").filter(|r| !r.is_null()).unwrap_or(value),
            _ => value,
        };
        if let Value::Array(items) = value {
            for (i, item) in items.iter().enumerate() {
                self.discover_value(&format!("{column}.{i}"), item, row);
            }
            return;
        }
        let slot = self.column_slot(column, true, row);
        row[slot] = render_cell(value);
        if let Value::Object(nested) = value {
            self.discover_fields(nested, &format!("{column}."), row);
        }
    }

    fn is_row_visible(&self, row: &[Option<String>]) -> bool {
        if self.filter.is_empty() {
            return true;
        }
        let needle = self.filter.to_lowercase();
        row.iter()
            .flatten()
            .any(|cell| cell.to_lowercase().contains(&needle))
    }

    /// Recompute row visibility for `filter` (case-insensitive substring).
    pub fn set_filter(&mut self, filter: &str) {
        self.filter = filter.to_string();
        let visible: Vec<bool> = self.rows.iter().map(|row| self.is_row_visible(row)).collect();
        self.count_visible = Some(visible.iter().filter(|v| **v).count());
        self.row_visible = visible;
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn filter_status(&self) -> String {
        format!(
            "Filtered {} records out of {} records",
            self.count_visible.unwrap_or(self.rows.len()),
            self.records.len()
        )
    }

    /// Header names, `_` first
    pub fn header(&self) -> Vec<&str> {
        self.columns.iter().map(String::as_str).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.get_index_of(name)
    }

    pub fn is_column_visible(&self, index: usize) -> bool {
        self.col_visible.get(index).copied().unwrap_or(false)
    }

    /// Data row `index` (0 is the first record), padded to the header width
    pub fn row(&self, index: usize) -> Option<&[Option<String>]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn row_visibility(&self) -> &[bool] {
        &self.row_visible
    }

    pub fn records(&self) -> &[Value] {
        &self.records
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn visible_count(&self) -> usize {
        self.count_visible
            .unwrap_or_else(|| self.row_visible.iter().filter(|v| **v).count())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header plus data rows as text. With a filter set, hidden rows and
    /// placeholder columns are left out.
    pub fn visible_table(&self) -> Vec<Vec<String>> {
        if self.rows.is_empty() {
            return Vec::new();
        }
        let filtered = !self.filter.is_empty();
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|c| !filtered || self.col_visible[*c])
            .collect();
        let mut table = Vec::with_capacity(self.rows.len() + 1);
        table.push(keep.iter().map(|c| self.columns[*c].clone()).collect());
        for (row, visible) in self.rows.iter().zip(&self.row_visible) {
            if filtered && !visible {
                continue;
            }
            table.push(
                keep.iter()
                    .map(|c| row.get(*c).cloned().flatten().unwrap_or_default())
                    .collect(),
            );
        }
        table
    }

    /// Delimited text: every cell quoted, quotes doubled, rows joined by CRLF.
    pub fn serialize(&self, delimiter: char) -> String {
        let separator = delimiter.to_string();
        self.visible_table()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
                    .collect::<Vec<_>>()
                    .join(&separator)
            })
            .collect::<Vec<_>>()
            .join("\r\n")
    }

    /// Whether the rows may be handed to a bulk delete: an `Id` column,
    /// at least one visible row, a bounded record count, no export running.
    pub fn can_delete(&self, exporting: bool) -> bool {
        !exporting
            && !self.rows.is_empty()
            && self.count_visible.is_none_or(|n| n > 0)
            && self.records.len() <= MAX_DELETE_RECORDS
            && self.columns.iter().any(|c| c.eq_ignore_ascii_case("id"))
    }
}
