mod database;
mod error;
mod ingest;
mod media;
mod pipeline;
mod utils;

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use crate::pipeline::IngestionPipeline;
use crate::utils::config::IngestConfig;

/// Builds a catalog database from a delimited text file and its pictures.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Delimited input file, one catalog item per line
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Database file to create; must not exist yet
    #[arg(short, long)]
    db_path: Option<PathBuf>,

    #[arg(long)]
    schema_version: Option<u32>,

    /// Picture width after normalization
    #[arg(long)]
    width: Option<u32>,

    /// Picture height after normalization
    #[arg(long)]
    height: Option<u32>,

    #[arg(long)]
    jpeg_quality: Option<u8>,

    /// Keep a resized copy next to every source picture
    #[arg(long)]
    keep_resized: bool,

    #[arg(long)]
    delimiter: Option<char>,

    #[arg(long)]
    decimal_separator: Option<char>,

    /// KEY=VALUE configuration file, read when present
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Write a JSON summary of the run here
    #[arg(short, long)]
    report: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<(IngestConfig, Option<PathBuf>)> {
        let mut config = IngestConfig::load(&self.env_file)?;

        if let Some(input) = self.input {
            config.input_path = input;
        }
        if let Some(db_path) = self.db_path {
            config.store_path = db_path;
        }
        if let Some(version) = self.schema_version {
            config.schema_version = version;
        }
        if let Some(width) = self.width {
            config.image_width = width;
        }
        if let Some(height) = self.height {
            config.image_height = height;
        }
        if let Some(quality) = self.jpeg_quality {
            config.jpeg_quality = quality;
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = delimiter;
        }
        if let Some(separator) = self.decimal_separator {
            config.decimal_separator = separator;
        }
        config.keep_resized_copy |= self.keep_resized;

        config.validate()?;
        Ok((config, self.report))
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    if let Err(err) = run() {
        error!("Ingestion failed: {}", err);
        for cause in err.chain().skip(1) {
            error!("  caused by: {}", cause);
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let (config, report_path) = Args::parse().into_config()?;

    info!("Catalog ingestion starting...");
    info!("Input: {:?}", config.input_path);
    info!("DB: {:?}", config.store_path);

    let report = IngestionPipeline::new(config)
        .run()
        .context("Ingestion aborted; any store file from this run is invalid")?;

    if let Some(path) = report_path {
        let file = File::create(&path).with_context(|| format!("Failed to create report {:?}", path))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &report).context("Failed to write report")?;
        info!("Report written to {:?}", path);
    }

    info!("Ingestion completed: {} entries", report.entries);
    Ok(())
}
