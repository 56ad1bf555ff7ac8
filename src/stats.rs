use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{columns::ColumnResolution, data::CleanedTable, io_utils};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub initial_rows: usize,
    pub initial_cols: usize,
    pub final_rows: usize,
    pub final_cols: usize,
    pub empty_rows_removed: usize,
    pub empty_cols_removed: usize,
    pub duplicate_columns: BTreeMap<String, usize>,
    pub renamed_columns: BTreeMap<String, String>,
    pub file_type: String,
    pub encoding: Option<String>,
    pub processing_time_seconds: f64,
}

/// Stats for extra-large spreadsheets, where header and cleaning stages are skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastProcessingStats {
    pub fast_processing: bool,
    pub file_size_mb: f64,
    pub rows: usize,
    pub cols: usize,
    pub file_type: String,
    pub processing_time_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IngestReport {
    Full(ProcessingStats),
    Fast(FastProcessingStats),
}

impl IngestReport {
    pub fn is_fast_processing(&self) -> bool {
        matches!(self, IngestReport::Fast(_))
    }

    pub fn processing_time_seconds(&self) -> f64 {
        match self {
            IngestReport::Full(stats) => stats.processing_time_seconds,
            IngestReport::Fast(stats) => stats.processing_time_seconds,
        }
    }

    pub fn full(&self) -> Option<&ProcessingStats> {
        match self {
            IngestReport::Full(stats) => Some(stats),
            IngestReport::Fast(_) => None,
        }
    }
}

pub struct StatsInput<'a> {
    pub table: &'a CleanedTable,
    pub header_row_index: usize,
    pub header_cell_count: usize,
    pub resolution: &'a ColumnResolution,
    pub file_type: &'a str,
    pub encoding: Option<&'a str>,
    pub elapsed: Duration,
}

pub fn compute(input: StatsInput<'_>) -> ProcessingStats {
    let final_rows = input.table.row_count();
    let final_cols = input.table.column_count();
    let initial_rows = final_rows + input.header_row_index + 1;
    let initial_cols = input.header_cell_count;
    ProcessingStats {
        initial_rows,
        initial_cols,
        final_rows,
        final_cols,
        empty_rows_removed: initial_rows - final_rows,
        empty_cols_removed: initial_cols.saturating_sub(final_cols),
        duplicate_columns: input.resolution.duplicate_counts.clone(),
        renamed_columns: input.resolution.renamed_columns.clone(),
        file_type: input.file_type.to_string(),
        encoding: input.encoding.map(str::to_string),
        processing_time_seconds: input.elapsed.as_secs_f64(),
    }
}

pub fn compute_fast(
    table: &CleanedTable,
    size_bytes: u64,
    file_type: &str,
    elapsed: Duration,
) -> FastProcessingStats {
    FastProcessingStats {
        fast_processing: true,
        file_size_mb: io_utils::size_in_mib(size_bytes),
        rows: table.row_count(),
        cols: table.column_count(),
        file_type: file_type.to_string(),
        processing_time_seconds: elapsed.as_secs_f64(),
    }
}
