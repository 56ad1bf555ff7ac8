//! Ingestion orchestrator.
//!
//! One [`Pipeline::process`] call walks a file through
//! `Uploaded → Reading → HeaderResolved → Cleaning → (Normal | TimeoutDegraded)
//! → StatsComputed → Done`. Any error along the way, including a failed header
//! detection, ends in `Failed` and is returned as an [`IngestFailure`]; callers
//! always get exactly one of [`IngestOutcome::Success`] or
//! [`IngestOutcome::Failure`].
//!
//! The timeout is cooperative: it is checked once, after cleaning. If the
//! budget is exceeded and more than [`DEGRADED_ROW_CAP`] rows remain, the
//! table is cut to that many rows and still returned as a success.

use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    clean,
    columns::{self, ColumnResolution},
    config::PipelineConfig,
    data::{CleanedTable, RawTable},
    error::IngestError,
    header, io_utils,
    loader::{self, CalamineWorkbook, FileKind, LoadedTable, SheetSelector, WorkbookSource},
    stats::{self, IngestReport, StatsInput},
    timing::{Stage, StageTimer},
};

pub const DEGRADED_ROW_CAP: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Uploaded,
    Reading,
    HeaderResolved,
    Cleaning,
    Normal,
    TimeoutDegraded,
    StatsComputed,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Uploaded => "uploaded",
            PipelineState::Reading => "reading",
            PipelineState::HeaderResolved => "header resolved",
            PipelineState::Cleaning => "cleaning",
            PipelineState::Normal => "normal",
            PipelineState::TimeoutDegraded => "timeout degraded",
            PipelineState::StatsComputed => "stats computed",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What the job dispatcher hands over for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRequest {
    pub path: PathBuf,
    /// Lower-case extension without the dot.
    pub extension: String,
    pub sheet: Option<SheetSelector>,
    pub size_bytes: u64,
}

impl IngestRequest {
    pub fn new(
        path: impl Into<PathBuf>,
        extension: impl Into<String>,
        sheet: Option<SheetSelector>,
        size_bytes: u64,
    ) -> Self {
        Self {
            path: path.into(),
            extension: extension.into(),
            sheet,
            size_bytes,
        }
    }

    /// Derives extension and size from the file on disk.
    pub fn for_file(path: &Path, sheet: Option<SheetSelector>) -> Result<Self, IngestError> {
        let size_bytes = io_utils::file_size(path)?;
        Ok(Self::new(
            path,
            io_utils::normalized_extension(path),
            sheet,
            size_bytes,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestSuccess {
    pub table: CleanedTable,
    pub report: IngestReport,
    /// Row index the header was taken from; absent on the fast path.
    pub header_row_index: Option<usize>,
    pub final_state: PipelineState,
    pub timeout_degraded: bool,
}

impl IngestSuccess {
    pub fn fast_processing(&self) -> bool {
        self.report.is_fast_processing()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestFailure {
    pub kind: String,
    #[serde(rename = "error")]
    pub message: String,
    pub file_path: PathBuf,
    pub file_extension: String,
    pub elapsed_time: f64,
}

impl IngestFailure {
    fn new(kind: &str, message: String, request: &IngestRequest, elapsed: Duration) -> Self {
        Self {
            kind: kind.to_string(),
            message,
            file_path: request.path.clone(),
            file_extension: request.extension.clone(),
            elapsed_time: elapsed.as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    Success(IngestSuccess),
    Failure(IngestFailure),
}

impl IngestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, IngestOutcome::Success(_))
    }

    pub fn success(&self) -> Option<&IngestSuccess> {
        match self {
            IngestOutcome::Success(success) => Some(success),
            IngestOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&IngestFailure> {
        match self {
            IngestOutcome::Success(_) => None,
            IngestOutcome::Failure(failure) => Some(failure),
        }
    }
}

pub enum TableSource<'a> {
    /// Open `request.path` according to its extension.
    File,
    /// Use an already-open workbook, whatever the extension says.
    Workbook(&'a mut dyn WorkbookSource),
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn process(&self, request: &IngestRequest) -> IngestOutcome {
        self.process_source(request, TableSource::File)
    }

    pub fn process_workbook(
        &self,
        request: &IngestRequest,
        workbook: &mut dyn WorkbookSource,
    ) -> IngestOutcome {
        self.process_source(request, TableSource::Workbook(workbook))
    }

    pub fn process_source(&self, request: &IngestRequest, source: TableSource<'_>) -> IngestOutcome {
        let started = Instant::now();
        debug!("{}: {:?}", PipelineState::Uploaded, request.path);
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run(request, source, started)));
        let failure = match result {
            Ok(Ok(success)) => {
                info!(
                    "Ingested {:?}: {} row(s) x {} column(s) in {:.2} seconds",
                    request.path,
                    success.table.row_count(),
                    success.table.column_count(),
                    success.report.processing_time_seconds()
                );
                return IngestOutcome::Success(success);
            }
            Ok(Err(err)) => IngestFailure::new(err.kind(), err.to_string(), request, started.elapsed()),
            Err(payload) => IngestFailure::new(
                "processing_error",
                panic_message(payload.as_ref()),
                request,
                started.elapsed(),
            ),
        };
        warn!(
            "{}: error processing {:?}: {}",
            PipelineState::Failed,
            request.path,
            failure.message
        );
        IngestOutcome::Failure(failure)
    }

    fn run(
        &self,
        request: &IngestRequest,
        source: TableSource<'_>,
        started: Instant,
    ) -> Result<IngestSuccess, IngestError> {
        debug!("{}: {:?}", PipelineState::Reading, request.path);
        let loaded = {
            let _timer = StageTimer::start(Stage::Reading);
            load(request, source)?
        };

        if loaded.fast_processing {
            info!(
                "Extra large file detected ({:.2} MB); header detection and cleaning skipped",
                io_utils::size_in_mib(request.size_bytes)
            );
            return Ok(fast_result(request, loaded.table, started));
        }

        let encoding = loaded.encoding.map(|encoding| encoding.label());
        let header_row_index = {
            let _timer = StageTimer::start(Stage::HeaderResolution);
            header::resolve_header_row(loaded.table.header_sample())?
        };
        debug!(
            "{}: header at row {}",
            PipelineState::HeaderResolved,
            header_row_index
        );

        let header_text = loaded.source_row(header_row_index).map(<[String]>::to_vec);
        let (header_row, data_rows) = loaded
            .table
            .split_at_header(header_row_index)
            .ok_or(IngestError::HeaderUndetected)?;
        let resolution = {
            let _timer = StageTimer::start(Stage::ColumnResolution);
            columns::deduplicate_with_source(&header_row, header_text.as_deref())
        };
        let mut table = CleanedTable::new(resolution.labels.clone(), data_rows);

        debug!("{}: {} row(s)", PipelineState::Cleaning, table.row_count());
        {
            let _timer = StageTimer::start(Stage::Cleaning);
            let report = clean::clean_table(&mut table);
            debug!(
                "Cleaning tier {:?} inspected {} column(s), nulled {} cell(s)",
                report.tier, report.columns_inspected, report.cells_nulled
            );
        }

        let timeout_degraded = self.apply_timeout(&mut table, started);
        let state = if timeout_degraded {
            PipelineState::TimeoutDegraded
        } else {
            PipelineState::Normal
        };
        debug!("{state}");

        let stats = {
            let _timer = StageTimer::start(Stage::Stats);
            stats::compute(StatsInput {
                table: &table,
                header_row_index,
                header_cell_count: header_row.len(),
                resolution: &resolution,
                file_type: &request.extension,
                encoding,
                elapsed: started.elapsed(),
            })
        };
        debug!("{}", PipelineState::StatsComputed);

        Ok(IngestSuccess {
            table,
            report: IngestReport::Full(stats),
            header_row_index: Some(header_row_index),
            final_state: PipelineState::Done,
            timeout_degraded,
        })
    }

    /// Truncates `table` when the budget is spent; returns whether it did.
    fn apply_timeout(&self, table: &mut CleanedTable, started: Instant) -> bool {
        let elapsed = started.elapsed();
        if elapsed <= self.config.timeout() {
            return false;
        }
        warn!(
            "Processing is taking too long ({:.2} seconds); returning results so far",
            elapsed.as_secs_f64()
        );
        if table.row_count() > DEGRADED_ROW_CAP {
            table.truncate(DEGRADED_ROW_CAP);
            return true;
        }
        false
    }
}

fn load(request: &IngestRequest, source: TableSource<'_>) -> Result<LoadedTable, IngestError> {
    match source {
        TableSource::Workbook(workbook) => {
            loader::load_spreadsheet(workbook, request.sheet.as_ref(), request.size_bytes)
        }
        TableSource::File => match FileKind::from_extension(&request.extension)? {
            FileKind::Csv => loader::load_csv(&request.path),
            FileKind::Spreadsheet => {
                let mut workbook = CalamineWorkbook::open(&request.path)?;
                loader::load_spreadsheet(&mut workbook, request.sheet.as_ref(), request.size_bytes)
            }
        },
    }
}

/// Extra-large spreadsheets: first row becomes the labels, no inference or cleaning.
fn fast_result(request: &IngestRequest, raw: RawTable, started: Instant) -> IngestSuccess {
    let (resolution, rows) = match raw.split_at_header(0) {
        Some((labels, rows)) => (columns::deduplicate(&labels), rows),
        None => (ColumnResolution::default(), Vec::new()),
    };
    let table = CleanedTable::new(resolution.labels, rows);
    let stats = stats::compute_fast(
        &table,
        request.size_bytes,
        &request.extension,
        started.elapsed(),
    );
    IngestSuccess {
        table,
        report: IngestReport::Fast(stats),
        header_row_index: None,
        final_state: PipelineState::Done,
        timeout_degraded: false,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unexpected failure while processing file".to_string()
    }
}
