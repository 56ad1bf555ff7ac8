pub mod clean;
pub mod cli;
pub mod columns;
pub mod config;
pub mod data;
pub mod encoding;
pub mod error;
pub mod header;
pub mod io_utils;
pub mod job;
pub mod loader;
pub mod pipeline;
pub mod profile;
pub mod stats;
pub mod table;
pub mod timing;
pub mod workspace;

use std::{env, fs, path::Path, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands},
    config::PipelineConfig,
    job::JobResult,
    loader::{CalamineWorkbook, SheetSelector, WorkbookSource},
    pipeline::{IngestOutcome, IngestRequest, IngestSuccess, Pipeline},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet_intake", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Ingest(args) => handle_ingest(&args),
        Commands::Sheets(args) => handle_sheets(&args),
        Commands::Profile(args) => handle_profile(&args),
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            PipelineConfig::load(path).with_context(|| format!("Loading config from {path:?}"))
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn build_request(input: &Path, sheet: Option<SheetSelector>) -> IngestRequest {
    // An unreadable file still goes through the pipeline so it is reported
    // in the uniform failure shape.
    IngestRequest::for_file(input, sheet.clone()).unwrap_or_else(|_| {
        IngestRequest::new(input, io_utils::normalized_extension(input), sheet, 0)
    })
}

fn ingest(
    pipeline: &Pipeline,
    input: &Path,
    sheet: Option<SheetSelector>,
) -> (IngestOutcome, JobResult) {
    let request = build_request(input, sheet);
    info!(
        "Processing file: {:?}, Size: {:.2} MB",
        request.path,
        io_utils::size_in_mib(request.size_bytes)
    );
    let outcome = pipeline.process(&request);
    let job = JobResult::from_outcome(&outcome, pipeline.config().preview_rows);
    (outcome, job)
}

fn into_success(outcome: IngestOutcome, job: &JobResult) -> Result<IngestSuccess> {
    match outcome {
        IngestOutcome::Success(success) => Ok(success),
        IngestOutcome::Failure(failure) => {
            println!("{}", job.to_json().context("Serializing failure payload")?);
            Err(anyhow!(failure.message))
        }
    }
}

fn handle_ingest(args: &cli::IngestArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let pipeline = Pipeline::new(config);
    let (outcome, job) = ingest(&pipeline, &args.input, args.sheet.clone());
    let success = into_success(outcome, &job)?;

    if let Some(output) = &args.output {
        io_utils::write_table_to_path(output, &success.table)
            .with_context(|| format!("Writing cleaned table to {output:?}"))?;
        info!("Cleaned table written to {:?}", output);
    }
    if let Some(stats_path) = &args.stats {
        let rendered = serde_json::to_string_pretty(&success.report)
            .context("Serializing processing stats")?;
        fs::write(stats_path, rendered)
            .with_context(|| format!("Writing stats to {stats_path:?}"))?;
        info!("Processing stats written to {:?}", stats_path);
    }
    if let Some(name) = &args.save_processed {
        let path = pipeline.config().layout().save_processed(&success.table, name)?;
        info!("Processed table saved to {:?}", path);
    }

    if args.json {
        println!("{}", job.to_json().context("Serializing job result")?);
    } else {
        table::print_table(&success.table, pipeline.config().preview_rows);
        info!(
            "{} row(s) x {} column(s){}{}",
            success.table.row_count(),
            success.table.column_count(),
            if success.fast_processing() {
                " (fast processing)"
            } else {
                ""
            },
            if success.timeout_degraded {
                " (truncated after timeout)"
            } else {
                ""
            }
        );
    }
    Ok(())
}

fn handle_sheets(args: &cli::SheetsArgs) -> Result<()> {
    let workbook = CalamineWorkbook::open(&args.input)
        .with_context(|| format!("Opening workbook {:?}", args.input))?;
    let rows = workbook
        .sheet_names()
        .into_iter()
        .enumerate()
        .map(|(idx, name)| vec![idx.to_string(), name])
        .collect::<Vec<_>>();
    print!(
        "{}",
        table::render_grid(&["index".to_string(), "sheet".to_string()], &rows)
    );
    info!("Listed {} sheet(s) from {:?}", rows.len(), args.input);
    Ok(())
}

fn handle_profile(args: &cli::ProfileArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let pipeline = Pipeline::new(config);
    let (outcome, job) = ingest(&pipeline, &args.input, args.sheet.clone());
    let success = into_success(outcome, &job)?;
    let profile = profile::profile_column(&success.table, &args.column)
        .with_context(|| format!("Profiling column '{}'", args.column))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&profile).context("Serializing column profile")?
    );
    Ok(())
}
