use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Number of leading rows kept aside for header inference.
pub const HEADER_SAMPLE_ROWS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Text(String),
    Number(f64),
    Boolean(bool),
}

impl Cell {
    pub fn from_field(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Null;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Cell::Boolean(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Cell::Boolean(false);
        }
        match parse_number(trimmed) {
            Some(number) => Cell::Number(number),
            None => Cell::Text(raw.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Cell::Text(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Renders the cell the way it is written to CSV output; nulls become empty.
    pub fn as_display(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
            Cell::Boolean(b) => b.to_string(),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Cell::Null => JsonValue::Null,
            Cell::Text(s) => JsonValue::String(s.clone()),
            Cell::Number(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Cell::Boolean(b) => JsonValue::Bool(*b),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

fn parse_number(value: &str) -> Option<f64> {
    // f64's parser also accepts "nan" and "inf"; those stay text.
    if !value.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

pub type Row = Vec<Cell>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    rows: Vec<Row>,
}

impl RawTable {
    pub fn from_rows(mut rows: Vec<Row>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, Cell::Null);
        }
        Self { rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn truncate(&mut self, max_rows: usize) {
        self.rows.truncate(max_rows);
    }

    pub fn header_sample(&self) -> HeaderSample<'_> {
        let end = self.rows.len().min(HEADER_SAMPLE_ROWS);
        HeaderSample(&self.rows[..end])
    }

    /// Splits the table at `header_index`: the header row and the rows after it.
    /// Rows above the header are dropped.
    pub fn split_at_header(mut self, header_index: usize) -> Option<(Row, Vec<Row>)> {
        if header_index >= self.rows.len() {
            return None;
        }
        let data = self.rows.split_off(header_index + 1);
        let header = self.rows.pop()?;
        Some((header, data))
    }
}

/// Leading rows of a [`RawTable`], used only for header inference.
#[derive(Debug, Clone, Copy)]
pub struct HeaderSample<'a>(pub &'a [Row]);

impl<'a> HeaderSample<'a> {
    pub fn rows(&self) -> &'a [Row] {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl CleanedTable {
    pub fn new(columns: Vec<String>, mut rows: Vec<Row>) -> Self {
        let width = columns.len();
        for row in &mut rows {
            row.resize(width, Cell::Null);
        }
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn column_cells(&self, index: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    pub fn truncate(&mut self, max_rows: usize) {
        self.rows.truncate(max_rows);
    }

    pub fn to_records(&self, limit: usize) -> Vec<Map<String, JsonValue>> {
        self.rows
            .iter()
            .take(limit)
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(column, cell)| (column.clone(), cell.to_json()))
                    .collect()
            })
            .collect()
    }
}
