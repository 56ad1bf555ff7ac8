use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use csv::QuoteStyle;

use crate::{
    data::{CleanedTable, Row},
    error::IngestError,
};

pub const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Extension of `path`, lower-cased and without the leading dot.
pub fn normalized_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>, IngestError> {
    fs::read(path).map_err(|err| IngestError::io(path, err))
}

pub fn file_size(path: &Path) -> Result<u64, IngestError> {
    fs::metadata(path)
        .map(|meta| meta.len())
        .map_err(|err| IngestError::io(path, err))
}

pub fn size_in_mib(size_bytes: u64) -> f64 {
    size_bytes as f64 / BYTES_PER_MIB
}

pub fn open_csv_reader(text: &str) -> csv::Reader<&[u8]> {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(text.as_bytes())
}

/// Parses decoded CSV text into rows of raw (untyped) fields.
pub fn read_csv_records(text: &str) -> Result<Vec<Vec<String>>, IngestError> {
    let mut reader = open_csv_reader(text);
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

pub fn open_csv_writer(path: &Path) -> Result<csv::Writer<Box<dyn Write>>> {
    let file = File::create(path).with_context(|| format!("Creating output file {path:?}"))?;
    let writer: Box<dyn Write> = Box::new(BufWriter::new(file));
    let mut builder = csv::WriterBuilder::new();
    builder
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    Ok(builder.from_writer(writer))
}

pub fn write_table<W: Write>(writer: &mut csv::Writer<W>, table: &CleanedTable) -> Result<()> {
    writer
        .write_record(&table.columns)
        .context("Writing output headers")?;
    for (idx, row) in table.rows.iter().enumerate() {
        writer
            .write_record(display_row(row))
            .with_context(|| format!("Writing output row {}", idx + 2))?;
    }
    writer.flush().context("Flushing output writer")?;
    Ok(())
}

pub fn write_table_to_path(path: &Path, table: &CleanedTable) -> Result<()> {
    let mut writer = open_csv_writer(path)?;
    write_table(&mut writer, table)
}

fn display_row(row: &Row) -> Vec<String> {
    row.iter().map(|cell| cell.as_display()).collect()
}
