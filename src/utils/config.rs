use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use anyhow::{Result, Context, anyhow};
use tracing::info;

use crate::media::normalizer::{DEFAULT_JPEG_QUALITY, DEFAULT_MAX_HEIGHT, DEFAULT_MAX_WIDTH};

pub const DEFAULT_INPUT: &str = "databaseValues.csv";
pub const DEFAULT_STORE_FILENAME: &str = "whiskyDataDB.db";
pub const DEFAULT_SCHEMA_VERSION: u32 = 3;

/// Everything one ingestion run needs to know.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    pub input_path: PathBuf,
    pub store_path: PathBuf,
    /// Recorded in the store, never enforced.
    pub schema_version: u32,
    pub delimiter: char,
    pub decimal_separator: char,
    pub image_width: u32,
    pub image_height: u32,
    pub jpeg_quality: u8,
    pub keep_resized_copy: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT),
            store_path: PathBuf::from(DEFAULT_STORE_FILENAME),
            schema_version: DEFAULT_SCHEMA_VERSION,
            delimiter: ';',
            decimal_separator: '.',
            image_width: DEFAULT_MAX_WIDTH,
            image_height: DEFAULT_MAX_HEIGHT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            keep_resized_copy: false,
        }
    }
}

impl IngestConfig {
    /// Defaults, overlaid with `env_path` when that file exists.
    pub fn load(env_path: &Path) -> Result<Self> {
        let mut config = Self::default();
        if env_path.exists() {
            config.apply_env_file(env_path)?;
            info!("Loaded configuration from {:?}", env_path);
        }
        Ok(config)
    }

    /// Applies `KEY=VALUE` lines; unknown keys, blank lines and `#` comments are skipped.
    pub fn apply_env_file(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path).with_context(|| format!("Failed to open config file: {:?}", path))?;
        let reader = BufReader::new(file);

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                self.apply(key.trim(), value.trim())
                    .with_context(|| format!("Invalid value for {} in {:?}", key.trim(), path))?;
            }
        }
        Ok(())
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "CATALOG_INPUT" => self.input_path = PathBuf::from(value),
            "CATALOG_STORE_FILENAME" => self.store_path = PathBuf::from(value),
            "CATALOG_SCHEMA_VERSION" => self.schema_version = parse(value)?,
            "CATALOG_DELIMITER" => self.delimiter = parse_char(value)?,
            "CATALOG_DECIMAL_SEPARATOR" => self.decimal_separator = parse_char(value)?,
            "CATALOG_IMAGE_WIDTH" => self.image_width = parse_dimension(value)?,
            "CATALOG_IMAGE_HEIGHT" => self.image_height = parse_dimension(value)?,
            "CATALOG_JPEG_QUALITY" => self.jpeg_quality = parse(value)?,
            "CATALOG_KEEP_RESIZED" => self.keep_resized_copy = parse(value)?,
            _ => {}
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(anyhow!("Image dimensions must be positive"));
        }
        if self.delimiter == self.decimal_separator {
            return Err(anyhow!(
                "Delimiter and decimal separator must differ (both '{}')",
                self.delimiter
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(anyhow!("JPEG quality must be within 1..=100, got {}", self.jpeg_quality));
        }
        Ok(())
    }
}

fn parse<T>(value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(value.parse::<T>()?)
}

fn parse_char(value: &str) -> Result<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(anyhow!("expected a single character, got {:?}", value)),
    }
}

fn parse_dimension(value: &str) -> Result<u32> {
    let dim: u32 = parse(value)?;
    if dim == 0 {
        return Err(anyhow!("dimension must be positive"));
    }
    Ok(dim)
}
