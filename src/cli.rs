use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::loader::SheetSelector;

#[derive(Debug, Parser)]
#[command(author, version, about = "Ingest and normalize uploaded CSV and spreadsheet files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the ingestion pipeline on a file and report the cleaned table
    Ingest(IngestArgs),
    /// List the sheets of a spreadsheet with their 0-based indices
    Sheets(SheetsArgs),
    /// Ingest a file and profile one of its columns
    Profile(ProfileArgs),
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Input CSV or spreadsheet file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Sheet to load, as a 0-based index or a sheet name (spreadsheets only)
    #[arg(long, value_parser = parse_sheet_selector)]
    pub sheet: Option<SheetSelector>,
    /// Pipeline configuration file (YAML)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Write the cleaned table to this CSV file
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Write the processing stats to this JSON file
    #[arg(long)]
    pub stats: Option<PathBuf>,
    /// Save the cleaned table as processed_<NAME>.csv under the configured base folder
    #[arg(long = "save-processed", value_name = "NAME")]
    pub save_processed: Option<String>,
    /// Print the job result (preview and summary) as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct SheetsArgs {
    /// Spreadsheet file to inspect
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Input CSV or spreadsheet file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Column to profile (name after header detection and de-duplication)
    #[arg(short = 'c', long = "column")]
    pub column: String,
    /// Sheet to load, as a 0-based index or a sheet name (spreadsheets only)
    #[arg(long, value_parser = parse_sheet_selector)]
    pub sheet: Option<SheetSelector>,
    /// Pipeline configuration file (YAML)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn parse_sheet_selector(value: &str) -> Result<SheetSelector, String> {
    value.parse()
}
