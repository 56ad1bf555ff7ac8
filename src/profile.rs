use std::collections::HashSet;

use itertools::Itertools;
use serde::Serialize;

use crate::{
    data::{Cell, CleanedTable, format_number},
    error::IngestError,
};

const SAMPLE_VALUES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Empty,
    Text,
    Number,
    Boolean,
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; absent with fewer than two values.
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub column: String,
    pub kind: ColumnKind,
    pub non_null_count: usize,
    pub null_count: usize,
    pub unique_values: usize,
    pub sample_values: Vec<String>,
    #[serde(flatten)]
    pub numeric: Option<NumericSummary>,
}

pub fn profile_column(table: &CleanedTable, column: &str) -> Result<ColumnProfile, IngestError> {
    let idx = table
        .column_index(column)
        .ok_or_else(|| IngestError::ColumnNotFound(column.to_string()))?;
    let present = table
        .column_cells(idx)
        .filter(|cell| !cell.is_null())
        .collect::<Vec<_>>();
    let non_null_count = present.len();
    let null_count = table.row_count() - non_null_count;
    let unique_values = present
        .iter()
        .map(|cell| distinct_key(cell))
        .collect::<HashSet<_>>()
        .len();
    let sample_values = present
        .iter()
        .take(SAMPLE_VALUES)
        .map(|cell| cell.as_display())
        .collect();
    let kind = column_kind(&present);
    let numeric = if kind == ColumnKind::Number {
        NumericAccumulator::from_values(present.iter().filter_map(|cell| cell.as_number()))
            .summary()
    } else {
        None
    };

    Ok(ColumnProfile {
        column: column.to_string(),
        kind,
        non_null_count,
        null_count,
        unique_values,
        sample_values,
        numeric,
    })
}

fn column_kind(present: &[&Cell]) -> ColumnKind {
    let kinds = present
        .iter()
        .map(|cell| match cell {
            Cell::Text(_) => ColumnKind::Text,
            Cell::Number(_) => ColumnKind::Number,
            Cell::Boolean(_) => ColumnKind::Boolean,
            Cell::Null => ColumnKind::Empty,
        })
        .unique()
        .collect::<Vec<_>>();
    match kinds.as_slice() {
        [] => ColumnKind::Empty,
        [single] => *single,
        _ => ColumnKind::Mixed,
    }
}

fn distinct_key(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => format!("t:{s}"),
        Cell::Number(n) => format!("n:{}", format_number(*n)),
        Cell::Boolean(b) => format!("b:{b}"),
        Cell::Null => String::new(),
    }
}

#[derive(Debug, Default)]
struct NumericAccumulator {
    values: Vec<f64>,
    sum: f64,
}

impl NumericAccumulator {
    fn from_values(values: impl Iterator<Item = f64>) -> Self {
        let mut acc = Self::default();
        for value in values {
            acc.sum += value;
            acc.values.push(value);
        }
        acc
    }

    fn count(&self) -> usize {
        self.values.len()
    }

    fn mean(&self) -> Option<f64> {
        (self.count() > 0).then(|| self.sum / self.count() as f64)
    }

    fn median(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }

    fn std_dev(&self) -> Option<f64> {
        if self.count() < 2 {
            return None;
        }
        let mean = self.mean()?;
        let squared_deviations = self
            .values
            .iter()
            .map(|value| (value - mean).powi(2))
            .sum::<f64>();
        Some((squared_deviations / (self.count() - 1) as f64).sqrt())
    }

    fn summary(&self) -> Option<NumericSummary> {
        let min = self.values.iter().copied().reduce(f64::min)?;
        let max = self.values.iter().copied().reduce(f64::max)?;
        Some(NumericSummary {
            mean: self.mean()?,
            median: self.median()?,
            std: self.std_dev(),
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CleanedTable {
        CleanedTable::new(
            vec!["qty".into(), "status".into()],
            vec![
                vec![Cell::Number(2.0), Cell::Text("open".into())],
                vec![Cell::Number(4.0), Cell::Null],
                vec![Cell::Null, Cell::Text("open".into())],
                vec![Cell::Number(9.0), Cell::Number(1.0)],
            ],
        )
    }

    #[test]
    fn numeric_columns_get_summary() {
        let profile = profile_column(&table(), "qty").expect("profile");
        assert_eq!(profile.kind, ColumnKind::Number);
        assert_eq!(profile.non_null_count, 3);
        assert_eq!(profile.null_count, 1);
        assert_eq!(profile.unique_values, 3);
        assert_eq!(profile.sample_values, vec!["2", "4", "9"]);
        let numeric = profile.numeric.expect("numeric");
        assert_eq!(numeric.mean, 5.0);
        assert_eq!(numeric.median, 4.0);
        assert_eq!(numeric.min, 2.0);
        assert_eq!(numeric.max, 9.0);
        let std = numeric.std.expect("std");
        assert!((std - 13f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn std_dev_holds_for_large_clustered_values() {
        let table = CleanedTable::new(
            vec!["reading".into()],
            vec![
                vec![Cell::Number(1e9 + 1.0)],
                vec![Cell::Number(1e9 + 2.0)],
                vec![Cell::Number(1e9 + 3.0)],
            ],
        );
        let numeric = profile_column(&table, "reading")
            .expect("profile")
            .numeric
            .expect("numeric");
        assert_eq!(numeric.mean, 1e9 + 2.0);
        let std = numeric.std.expect("std");
        assert!((std - 1.0).abs() < 1e-9, "std was {std}");
    }

    #[test]
    fn mixed_columns_have_no_numeric_summary() {
        let profile = profile_column(&table(), "status").expect("profile");
        assert_eq!(profile.kind, ColumnKind::Mixed);
        assert_eq!(profile.unique_values, 2);
        assert!(profile.numeric.is_none());
    }

    #[test]
    fn unknown_column_is_an_error() {
        let err = profile_column(&table(), "missing").unwrap_err();
        assert!(matches!(err, IngestError::ColumnNotFound(name) if name == "missing"));
    }
}
