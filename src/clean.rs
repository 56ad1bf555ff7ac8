use std::collections::HashSet;

use serde::Serialize;

use crate::data::{Cell, CleanedTable};

pub const LARGE_TABLE_ROWS: usize = 50_000;
pub const MEDIUM_TABLE_ROWS: usize = 10_000;
pub const MEDIUM_TABLE_COLUMN_LIMIT: usize = 5;
pub const SMALL_TABLE_COLUMN_LIMIT: usize = 10;
pub const LOW_CARDINALITY_LIMIT: usize = 20;
pub static MISSING_MARKERS: [&str; 3] = ["", "nan", "null"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningTier {
    LabelsOnly,
    EmptyStrings,
    CommonMarkers,
}

impl CleaningTier {
    pub fn for_row_count(rows: usize) -> Self {
        if rows > LARGE_TABLE_ROWS {
            CleaningTier::LabelsOnly
        } else if rows > MEDIUM_TABLE_ROWS {
            CleaningTier::EmptyStrings
        } else {
            CleaningTier::CommonMarkers
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub tier: CleaningTier,
    pub columns_inspected: usize,
    pub cells_nulled: usize,
}

pub fn clean_table(table: &mut CleanedTable) -> CleaningReport {
    for label in &mut table.columns {
        let trimmed = label.trim();
        if trimmed.len() != label.len() {
            *label = trimmed.to_string();
        }
    }

    let tier = CleaningTier::for_row_count(table.row_count());
    let markers: &[&str] = match tier {
        CleaningTier::LabelsOnly => {
            return CleaningReport {
                tier,
                columns_inspected: 0,
                cells_nulled: 0,
            };
        }
        CleaningTier::EmptyStrings => &MISSING_MARKERS[..1],
        CleaningTier::CommonMarkers => &MISSING_MARKERS[..],
    };
    let columns = columns_to_inspect(table, tier);

    let mut cells_nulled = 0usize;
    for &idx in &columns {
        cells_nulled += null_out_markers(table, idx, markers);
    }
    CleaningReport {
        tier,
        columns_inspected: columns.len(),
        cells_nulled,
    }
}

fn columns_to_inspect(table: &CleanedTable, tier: CleaningTier) -> Vec<usize> {
    match tier {
        CleaningTier::LabelsOnly => Vec::new(),
        CleaningTier::EmptyStrings => text_columns(table)
            .take(MEDIUM_TABLE_COLUMN_LIMIT)
            .collect(),
        CleaningTier::CommonMarkers => text_columns(table)
            .take(SMALL_TABLE_COLUMN_LIMIT)
            .filter(|&idx| distinct_values_below(table, idx, LOW_CARDINALITY_LIMIT))
            .collect(),
    }
}

/// Columns holding at least one text cell, in column order.
pub fn text_columns(table: &CleanedTable) -> impl Iterator<Item = usize> + '_ {
    (0..table.column_count()).filter(move |&idx| table.column_cells(idx).any(Cell::is_text))
}

/// Whether column `idx` has fewer than `limit` distinct non-null values.
fn distinct_values_below(table: &CleanedTable, idx: usize, limit: usize) -> bool {
    let mut seen: HashSet<DistinctKey<'_>> = HashSet::new();
    for cell in table.column_cells(idx) {
        if let Some(key) = DistinctKey::of(cell) {
            seen.insert(key);
            if seen.len() >= limit {
                return false;
            }
        }
    }
    true
}

#[derive(Debug, PartialEq, Eq, Hash)]
enum DistinctKey<'a> {
    Text(&'a str),
    Number(u64),
    Boolean(bool),
}

impl<'a> DistinctKey<'a> {
    fn of(cell: &'a Cell) -> Option<Self> {
        match cell {
            Cell::Null => None,
            Cell::Text(s) => Some(DistinctKey::Text(s)),
            // Normalise -0.0 so it counts as the same value as 0.0.
            Cell::Number(n) => Some(DistinctKey::Number((n + 0.0).to_bits())),
            Cell::Boolean(b) => Some(DistinctKey::Boolean(*b)),
        }
    }
}

fn null_out_markers(table: &mut CleanedTable, idx: usize, markers: &[&str]) -> usize {
    let mut nulled = 0usize;
    for row in &mut table.rows {
        if let Some(cell) = row.get_mut(idx)
            && cell.as_text().is_some_and(|text| markers.contains(&text))
        {
            *cell = Cell::Null;
            nulled += 1;
        }
    }
    nulled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    fn table_with_rows(columns: usize, rows: usize, fill: impl Fn(usize, usize) -> Cell) -> CleanedTable {
        let labels = (0..columns).map(|c| format!(" col{c} ")).collect();
        let data = (0..rows)
            .map(|r| (0..columns).map(|c| fill(r, c)).collect())
            .collect();
        CleanedTable::new(labels, data)
    }

    #[test]
    fn tier_boundaries_are_exact() {
        assert_eq!(CleaningTier::for_row_count(0), CleaningTier::CommonMarkers);
        assert_eq!(CleaningTier::for_row_count(10_000), CleaningTier::CommonMarkers);
        assert_eq!(CleaningTier::for_row_count(10_001), CleaningTier::EmptyStrings);
        assert_eq!(CleaningTier::for_row_count(50_000), CleaningTier::EmptyStrings);
        assert_eq!(CleaningTier::for_row_count(50_001), CleaningTier::LabelsOnly);
    }

    #[test]
    fn small_tables_null_common_markers_in_low_cardinality_columns() {
        let mut table = CleanedTable::new(
            vec![" status ".into(), "qty".into()],
            vec![
                vec![text("open"), Cell::Number(1.0)],
                vec![text("nan"), Cell::Number(2.0)],
                vec![text("null"), Cell::Null],
                vec![text(""), Cell::Number(3.0)],
                vec![text("NULL"), Cell::Number(4.0)],
            ],
        );
        let report = clean_table(&mut table);
        assert_eq!(report.tier, CleaningTier::CommonMarkers);
        assert_eq!(report.columns_inspected, 1);
        assert_eq!(report.cells_nulled, 3);
        assert_eq!(table.columns, vec!["status", "qty"]);
        assert_eq!(table.rows[1][0], Cell::Null);
        assert_eq!(table.rows[4][0], text("NULL"));
    }

    #[test]
    fn small_tables_skip_high_cardinality_columns() {
        let mut table = table_with_rows(1, 30, |r, _| {
            if r == 0 { text("null") } else { text(&format!("v{r}")) }
        });
        let report = clean_table(&mut table);
        assert_eq!(report.columns_inspected, 0);
        assert_eq!(table.rows[0][0], text("null"));
    }

    #[test]
    fn small_tables_inspect_at_most_ten_text_columns() {
        let mut table = table_with_rows(12, 3, |_, _| text("nan"));
        let report = clean_table(&mut table);
        assert_eq!(report.columns_inspected, SMALL_TABLE_COLUMN_LIMIT);
        assert_eq!(table.rows[0][9], Cell::Null);
        assert_eq!(table.rows[0][10], text("nan"));
    }

    #[test]
    fn medium_tables_only_null_empty_strings_in_five_columns() {
        let mut table = table_with_rows(7, 10_001, |r, _| {
            if r % 2 == 0 { text("") } else { text("nan") }
        });
        let report = clean_table(&mut table);
        assert_eq!(report.tier, CleaningTier::EmptyStrings);
        assert_eq!(report.columns_inspected, MEDIUM_TABLE_COLUMN_LIMIT);
        assert_eq!(table.rows[0][4], Cell::Null);
        assert_eq!(table.rows[0][5], text(""));
        assert_eq!(table.rows[1][0], text("nan"));
        assert_eq!(table.columns[0], "col0");
    }

    #[test]
    fn large_tables_only_trim_labels() {
        let mut table = table_with_rows(1, LARGE_TABLE_ROWS + 1, |_, _| text(""));
        let report = clean_table(&mut table);
        assert_eq!(report.tier, CleaningTier::LabelsOnly);
        assert_eq!(report.cells_nulled, 0);
        assert_eq!(table.columns, vec!["col0"]);
        assert_eq!(table.rows[0][0], text(""));
    }

    #[test]
    fn numeric_columns_are_not_text_columns() {
        let table = table_with_rows(2, 3, |_, c| {
            if c == 0 { Cell::Number(1.0) } else { text("x") }
        });
        assert_eq!(text_columns(&table).collect::<Vec<_>>(), vec![1]);
    }
}
