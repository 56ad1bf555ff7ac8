use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Could not decode {path:?} with any of the encodings tried ({})", .attempted.join(", "))]
    Decode {
        path: PathBuf,
        attempted: Vec<String>,
    },
    #[error(
        "Sheet index {index} is out of range. File has {sheet_count} sheet(s) (indices 0-{}). Available sheets: {sheet_names:?}",
        .sheet_count.saturating_sub(1)
    )]
    SheetIndexOutOfRange {
        index: usize,
        sheet_count: usize,
        sheet_names: Vec<String>,
    },
    #[error("Sheet '{name}' not found. File has {sheet_count} sheet(s): {sheet_names:?}")]
    SheetNotFound {
        name: String,
        sheet_count: usize,
        sheet_names: Vec<String>,
    },
    #[error("Could not detect header row")]
    HeaderUndetected,
    #[error("Unsupported file type '{extension}'")]
    UnsupportedFileType { extension: String },
    #[error("Column '{0}' not found in table")]
    ColumnNotFound(String),
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed CSV content: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to read workbook: {0}")]
    Workbook(String),
    #[error("{0}")]
    Processing(String),
}

impl IngestError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        IngestError::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Decode { .. } => "decode_error",
            IngestError::SheetIndexOutOfRange { .. } => "sheet_index_out_of_range",
            IngestError::SheetNotFound { .. } => "sheet_not_found",
            IngestError::HeaderUndetected => "header_undetected",
            IngestError::UnsupportedFileType { .. } => "unsupported_file_type",
            IngestError::ColumnNotFound(_) => "column_not_found",
            IngestError::Io { .. }
            | IngestError::Csv(_)
            | IngestError::Workbook(_)
            | IngestError::Processing(_) => "processing_error",
        }
    }
}
