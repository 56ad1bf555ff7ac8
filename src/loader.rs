//! Table loading: turns a CSV or spreadsheet file into a [`RawTable`].
//!
//! CSV bytes go through encoding detection and the fallback chain before they
//! are parsed. Spreadsheets branch on reported file size:
//!
//! - **Extra large** (> 100 MiB): tolerant read that stops after the label
//!   row and [`EXTRA_LARGE_ROW_CAP`] data rows. The result is flagged
//!   `fast_processing` and the pipeline skips header inference and cleaning.
//! - **Standard**: the requested sheet is read in full.
//!
//! Workbook access sits behind [`WorkbookSource`] so the sheet-selection rules
//! apply the same way to calamine-backed files and in-memory workbooks.

use std::{fmt, fs::File, io::BufReader, path::Path, str::FromStr};

use calamine::{Data, DataType, Reader, Sheets, open_workbook_auto};
use chrono::NaiveDateTime;

use crate::{
    data::{Cell, HEADER_SAMPLE_ROWS, RawTable, Row},
    encoding::{self, FALLBACK_ENCODINGS, TextEncoding},
    error::IngestError,
    io_utils,
};

pub const EXTRA_LARGE_BYTES: u64 = 100 * 1024 * 1024;
pub const EXTRA_LARGE_ROW_CAP: usize = 50_000;
/// The label row plus at most [`EXTRA_LARGE_ROW_CAP`] data rows.
const EXTRA_LARGE_RAW_ROWS: usize = EXTRA_LARGE_ROW_CAP + 1;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "xla", "xlam", "ods"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Spreadsheet,
}

impl FileKind {
    pub fn from_extension(extension: &str) -> Result<Self, IngestError> {
        let normalized = extension.trim().trim_start_matches('.').to_ascii_lowercase();
        if normalized == "csv" {
            Ok(FileKind::Csv)
        } else if SPREADSHEET_EXTENSIONS.contains(&normalized.as_str()) {
            Ok(FileKind::Spreadsheet)
        } else {
            Err(IngestError::UnsupportedFileType {
                extension: extension.to_string(),
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeTier {
    Standard,
    ExtraLarge,
}

impl SizeTier {
    pub fn for_spreadsheet(size_bytes: u64) -> Self {
        if size_bytes > EXTRA_LARGE_BYTES {
            SizeTier::ExtraLarge
        } else {
            SizeTier::Standard
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

impl FromStr for SheetSelector {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("Sheet selector cannot be empty".to_string());
        }
        Ok(match trimmed.parse::<usize>() {
            Ok(index) => SheetSelector::Index(index),
            Err(_) => SheetSelector::Name(trimmed.to_string()),
        })
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Index(index) => write!(f, "#{index}"),
            SheetSelector::Name(name) => write!(f, "'{name}'"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SheetReadOptions {
    pub row_limit: Option<usize>,
    /// Error cells become nulls instead of their error code text.
    pub tolerant: bool,
}

pub trait WorkbookSource {
    fn sheet_names(&self) -> Vec<String>;

    fn read_sheet(
        &mut self,
        index: usize,
        options: SheetReadOptions,
    ) -> Result<RawTable, IngestError>;
}

pub struct CalamineWorkbook {
    inner: Sheets<BufReader<File>>,
}

impl CalamineWorkbook {
    pub fn open(path: &Path) -> Result<Self, IngestError> {
        let inner = open_workbook_auto(path)
            .map_err(|err| IngestError::Workbook(format!("opening {path:?}: {err}")))?;
        Ok(Self { inner })
    }
}

impl WorkbookSource for CalamineWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.inner.sheet_names()
    }

    fn read_sheet(
        &mut self,
        index: usize,
        options: SheetReadOptions,
    ) -> Result<RawTable, IngestError> {
        let range = self
            .inner
            .worksheet_range_at(index)
            .ok_or_else(|| IngestError::Workbook(format!("sheet #{index} has no worksheet data")))?
            .map_err(|err| IngestError::Workbook(err.to_string()))?;
        let limit = options.row_limit.unwrap_or(usize::MAX);
        let rows = range
            .rows()
            .take(limit)
            .map(|row| {
                row.iter()
                    .map(|data| cell_from_data(data, options.tolerant))
                    .collect::<Row>()
            })
            .collect();
        Ok(RawTable::from_rows(rows))
    }
}

pub fn cell_from_data(data: &Data, tolerant: bool) -> Cell {
    match data {
        Data::Empty => Cell::Null,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Boolean(*b),
        Data::DateTime(dt) => match data.as_datetime() {
            Some(value) => Cell::Text(format_datetime(value)),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(err) => {
            if tolerant {
                Cell::Null
            } else {
                Cell::Text(err.to_string())
            }
        }
    }
}

pub fn format_datetime(value: NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: RawTable,
    /// Set for CSV input only.
    pub encoding: Option<TextEncoding>,
    /// Extra-large spreadsheet: header inference and cleaning are skipped.
    pub fast_processing: bool,
    /// Untyped field text of the header sample rows (CSV only), so labels keep
    /// their spelling (`001`, `TRUE`).
    pub header_source: Option<Vec<Vec<String>>>,
}

impl LoadedTable {
    pub fn source_row(&self, index: usize) -> Option<&[String]> {
        self.header_source
            .as_ref()
            .and_then(|rows| rows.get(index))
            .map(Vec::as_slice)
    }
}

pub fn load_csv(path: &Path) -> Result<LoadedTable, IngestError> {
    let bytes = io_utils::read_bytes(path)?;
    load_csv_bytes(path, &bytes)
}

pub fn load_csv_bytes(path: &Path, bytes: &[u8]) -> Result<LoadedTable, IngestError> {
    let (text, encoding) = decode_csv(path, bytes)?;
    let records = io_utils::read_csv_records(&text)?;
    let rows = records
        .iter()
        .map(|record| record.iter().map(|field| Cell::from_field(field)).collect())
        .collect();
    let header_source = records.into_iter().take(HEADER_SAMPLE_ROWS).collect();
    Ok(LoadedTable {
        table: RawTable::from_rows(rows),
        encoding: Some(encoding),
        fast_processing: false,
        header_source: Some(header_source),
    })
}

fn decode_csv(path: &Path, bytes: &[u8]) -> Result<(String, TextEncoding), IngestError> {
    let detected = encoding::resolve(bytes);
    if let Some(text) = detected.decode(bytes) {
        return Ok((text, detected));
    }
    for fallback in FALLBACK_ENCODINGS {
        if let Some(text) = fallback.decode(bytes) {
            return Ok((text, fallback));
        }
    }
    let mut attempted = vec![detected.label().to_string()];
    attempted.extend(
        FALLBACK_ENCODINGS
            .iter()
            .filter(|fallback| **fallback != detected)
            .map(|fallback| fallback.label().to_string()),
    );
    Err(IngestError::Decode {
        path: path.to_path_buf(),
        attempted,
    })
}

/// Maps a selector onto a sheet index; an absent selector means the first sheet.
pub fn resolve_sheet_index(
    sheet_names: &[String],
    selector: Option<&SheetSelector>,
) -> Result<usize, IngestError> {
    match selector {
        None => Ok(0),
        Some(SheetSelector::Index(index)) if *index < sheet_names.len() => Ok(*index),
        Some(SheetSelector::Index(index)) => Err(IngestError::SheetIndexOutOfRange {
            index: *index,
            sheet_count: sheet_names.len(),
            sheet_names: sheet_names.to_vec(),
        }),
        Some(SheetSelector::Name(name)) => sheet_names
            .iter()
            .position(|candidate| candidate == name)
            .ok_or_else(|| IngestError::SheetNotFound {
                name: name.clone(),
                sheet_count: sheet_names.len(),
                sheet_names: sheet_names.to_vec(),
            }),
    }
}

pub fn load_spreadsheet<W>(
    workbook: &mut W,
    selector: Option<&SheetSelector>,
    size_bytes: u64,
) -> Result<LoadedTable, IngestError>
where
    W: WorkbookSource + ?Sized,
{
    let sheet_names = workbook.sheet_names();
    let index = resolve_sheet_index(&sheet_names, selector)?;
    let tier = SizeTier::for_spreadsheet(size_bytes);
    let options = match tier {
        SizeTier::ExtraLarge => SheetReadOptions {
            row_limit: Some(EXTRA_LARGE_RAW_ROWS),
            tolerant: true,
        },
        SizeTier::Standard => SheetReadOptions::default(),
    };
    let mut table = workbook.read_sheet(index, options)?;
    if tier == SizeTier::ExtraLarge {
        table.truncate(EXTRA_LARGE_RAW_ROWS);
    }
    Ok(LoadedTable {
        table,
        encoding: None,
        fast_processing: tier == SizeTier::ExtraLarge,
        header_source: None,
    })
}

/// Workbook held in memory; sheets are pre-typed rows.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkbook {
    sheets: Vec<(String, Vec<Row>)>,
}

impl InMemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, name: impl Into<String>, rows: Vec<Row>) -> Self {
        self.sheets.push((name.into(), rows));
        self
    }
}

impl WorkbookSource for InMemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn read_sheet(
        &mut self,
        index: usize,
        options: SheetReadOptions,
    ) -> Result<RawTable, IngestError> {
        let (_, rows) = self
            .sheets
            .get(index)
            .ok_or_else(|| IngestError::Workbook(format!("sheet #{index} has no worksheet data")))?;
        let limit = options.row_limit.unwrap_or(usize::MAX);
        Ok(RawTable::from_rows(rows.iter().take(limit).cloned().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(values: &[&str]) -> Row {
        values.iter().map(|v| Cell::Text((*v).to_string())).collect()
    }

    fn three_sheet_workbook() -> InMemoryWorkbook {
        InMemoryWorkbook::new()
            .with_sheet("Summary", vec![text_row(&["a"])])
            .with_sheet("Ledger", vec![text_row(&["b"])])
            .with_sheet("Notes", vec![text_row(&["c"])])
    }

    #[test]
    fn spreadsheet_datetimes_render_as_text() {
        let value = chrono::NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(14, 5, 0))
            .expect("valid datetime");
        assert_eq!(format_datetime(value), "2024-03-09 14:05:00");
    }

    #[test]
    fn extension_maps_to_file_kind() {
        assert_eq!(FileKind::from_extension("csv").unwrap(), FileKind::Csv);
        assert_eq!(FileKind::from_extension(".XLSX").unwrap(), FileKind::Spreadsheet);
        let err = FileKind::from_extension("pdf").unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFileType { .. }));
    }

    #[test]
    fn size_tier_boundary_is_exclusive() {
        assert_eq!(SizeTier::for_spreadsheet(EXTRA_LARGE_BYTES), SizeTier::Standard);
        assert_eq!(
            SizeTier::for_spreadsheet(EXTRA_LARGE_BYTES + 1),
            SizeTier::ExtraLarge
        );
    }

    #[test]
    fn sheet_selector_parses_index_or_name() {
        assert_eq!("2".parse::<SheetSelector>().unwrap(), SheetSelector::Index(2));
        assert_eq!(
            "Ledger".parse::<SheetSelector>().unwrap(),
            SheetSelector::Name("Ledger".into())
        );
        assert!("  ".parse::<SheetSelector>().is_err());
    }

    #[test]
    fn out_of_range_index_reports_all_sheets() {
        let mut workbook = three_sheet_workbook();
        let err = load_spreadsheet(&mut workbook, Some(&SheetSelector::Index(5)), 1024)
            .unwrap_err();
        match err {
            IngestError::SheetIndexOutOfRange {
                index,
                sheet_count,
                sheet_names,
            } => {
                assert_eq!(index, 5);
                assert_eq!(sheet_count, 3);
                assert_eq!(sheet_names, vec!["Summary", "Ledger", "Notes"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unknown_sheet_name_is_reported() {
        let mut workbook = three_sheet_workbook();
        let err = load_spreadsheet(
            &mut workbook,
            Some(&SheetSelector::Name("Missing".into())),
            1024,
        )
        .unwrap_err();
        assert!(matches!(err, IngestError::SheetNotFound { sheet_count: 3, .. }));
    }

    #[test]
    fn sheet_is_selected_by_name_and_default() {
        let mut workbook = three_sheet_workbook();
        let loaded = load_spreadsheet(
            &mut workbook,
            Some(&SheetSelector::Name("Notes".into())),
            1024,
        )
        .expect("load");
        assert_eq!(loaded.table.rows()[0], text_row(&["c"]));
        let loaded = load_spreadsheet(&mut workbook, None, 1024).expect("load");
        assert_eq!(loaded.table.rows()[0], text_row(&["a"]));
        assert!(!loaded.fast_processing);
        assert!(loaded.encoding.is_none());
    }

    #[test]
    fn extra_large_spreadsheets_are_capped_and_flagged() {
        let rows = (0..EXTRA_LARGE_ROW_CAP + 25)
            .map(|i| vec![Cell::Number(i as f64)])
            .collect();
        let mut workbook = InMemoryWorkbook::new().with_sheet("Big", rows);
        let loaded =
            load_spreadsheet(&mut workbook, None, 150 * 1024 * 1024).expect("load");
        assert!(loaded.fast_processing);
        assert_eq!(loaded.table.height(), EXTRA_LARGE_ROW_CAP + 1);
    }

    #[test]
    fn csv_bytes_are_typed_per_cell() {
        let loaded = load_csv_bytes(Path::new("t.csv"), b"name,qty\nbolt,4\n,\n").expect("load");
        assert_eq!(loaded.encoding, Some(TextEncoding::Utf8));
        let rows = loaded.table.rows();
        assert_eq!(rows[1], vec![Cell::Text("bolt".into()), Cell::Number(4.0)]);
        assert_eq!(rows[2], vec![Cell::Null, Cell::Null]);
    }

    #[test]
    fn csv_keeps_source_text_of_sample_rows() {
        let loaded = load_csv_bytes(Path::new("t.csv"), b"001,TRUE\n1,2\n").expect("load");
        assert_eq!(loaded.table.rows()[0][0], Cell::Number(1.0));
        assert_eq!(
            loaded.source_row(0),
            Some(&["001".to_string(), "TRUE".to_string()][..])
        );
        assert_eq!(loaded.source_row(5), None);
    }

    #[test]
    fn cp1252_csv_is_decoded_via_fallback() {
        let loaded = load_csv_bytes(Path::new("t.csv"), b"city\nZ\xfcrich\n").expect("load");
        assert_eq!(loaded.encoding, Some(TextEncoding::Cp1252));
        assert_eq!(loaded.table.rows()[1][0], Cell::Text("Zürich".into()));
    }

    #[test]
    fn undecodable_csv_fails_with_decode_error() {
        let err = load_csv_bytes(Path::new("t.csv"), b"name\n\x81\x8d\x8f\n").unwrap_err();
        match err {
            IngestError::Decode { attempted, .. } => {
                assert!(attempted.contains(&"latin1".to_string()));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn error_cells_depend_on_tolerance() {
        let data = Data::Error(calamine::CellErrorType::Div0);
        assert_eq!(cell_from_data(&data, true), Cell::Null);
        assert_eq!(cell_from_data(&data, false), Cell::Text("#DIV/0!".into()));
        assert_eq!(cell_from_data(&Data::Int(7), false), Cell::Number(7.0));
    }
}
