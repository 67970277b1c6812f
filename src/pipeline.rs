use std::fs;
use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::database::repo::CatalogStore;
use crate::error::Result;
use crate::ingest::parser::{CatalogEntry, RecordParser};
use crate::ingest::reader::RecordReader;
use crate::media::normalizer::ImageNormalizer;
use crate::utils::config::IngestConfig;

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub store_path: PathBuf,
    pub schema_version: u32,
    pub entries: usize,
    pub pictures: usize,
    pub barcodes: usize,
    /// In input order.
    pub item_ids: Vec<i64>,
}

pub struct IngestionPipeline {
    config: IngestConfig,
    parser: RecordParser,
    normalizer: ImageNormalizer,
}

impl IngestionPipeline {
    pub fn new(config: IngestConfig) -> Self {
        let parser = RecordParser::new(config.delimiter, config.decimal_separator);
        let normalizer = ImageNormalizer::new(config.image_width, config.image_height)
            .with_quality(config.jpeg_quality)
            .keep_resized_copy(config.keep_resized_copy);
        Self {
            config,
            parser,
            normalizer,
        }
    }

    /// Reads every record, then writes them all into a fresh store.
    /// Nothing is written until the whole input has parsed.
    pub fn run(&self) -> Result<IngestReport> {
        let entries = self.read_entries()?;
        info!("Parsed {} entries from {:?}", entries.len(), self.config.input_path);
        self.write_entries(&entries)
    }

    pub fn read_entries(&self) -> Result<Vec<CatalogEntry>> {
        RecordReader::open(&self.config.input_path, self.parser)?
            .map(|entry| -> Result<CatalogEntry> {
                let mut entry = entry?;
                entry.normalized_image = self.normalizer.normalize(entry.image_path.as_deref())?;
                Ok(entry)
            })
            .collect()
    }

    pub fn write_entries(&self, entries: &[CatalogEntry]) -> Result<IngestReport> {
        let path = &self.config.store_path;
        let mut store = CatalogStore::create(path, self.config.schema_version)?;

        match Self::populate(&mut store, entries) {
            Ok(item_ids) => {
                store.close()?;
                let report = IngestReport {
                    store_path: path.clone(),
                    schema_version: self.config.schema_version,
                    entries: entries.len(),
                    pictures: entries.iter().filter(|e| e.normalized_image.is_some()).count(),
                    barcodes: entries.iter().filter(|e| e.barcode.is_some()).count(),
                    item_ids,
                };
                info!(
                    "Wrote {} entries ({} pictures, {} barcodes) to {:?}",
                    report.entries, report.pictures, report.barcodes, path
                );
                Ok(report)
            }
            Err(e) => {
                discard(store);
                Err(e)
            }
        }
    }

    fn populate(store: &mut CatalogStore, entries: &[CatalogEntry]) -> Result<Vec<i64>> {
        store.create_tables()?;

        let pb = ProgressBar::new(entries.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut item_ids = Vec::with_capacity(entries.len());
        for entry in entries {
            pb.set_message(entry.name.clone());
            let written = store.write_entry(entry)?;
            debug!(
                "Stored {:?} as item {} (picture {:?}, barcode {:?})",
                entry.name, written.item_id, written.picture_id, written.barcode_id
            );
            item_ids.push(written.item_id);
            pb.inc(1);
        }
        pb.finish_and_clear();

        Ok(item_ids)
    }
}

/// A partially written store is invalid; close it and remove the file.
fn discard(store: CatalogStore) {
    let path = store.path().to_path_buf();
    drop(store);
    if let Err(e) = fs::remove_file(&path) {
        warn!("Failed to remove incomplete store {:?}: {}", path, e);
    }
}
