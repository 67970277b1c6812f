use std::path::PathBuf;
use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::error::{IngestError, Result};
use crate::media::normalizer::EncodedImage;

/// name; category; distillery; country; description; barcode; age; vol; <reserved>; image
pub const FIELD_COUNT: usize = 10;

const IMAGE_FIELD: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub category: String,
    pub distillery: String,
    pub country: String,
    pub description: String,
    pub barcode: Option<String>,
    pub age_in_years: Option<i64>,
    pub volume_percent: Option<f64>,
    pub creation_date: String,
    pub image_path: Option<PathBuf>,
    pub normalized_image: Option<EncodedImage>,
}

/// Splits one input line into a [`CatalogEntry`].
#[derive(Debug, Clone, Copy)]
pub struct RecordParser {
    delimiter: char,
    decimal_separator: char,
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new(';', '.')
    }
}

impl RecordParser {
    pub fn new(delimiter: char, decimal_separator: char) -> Self {
        Self {
            delimiter,
            decimal_separator,
        }
    }

    /// Parses `line` (1-based `line_no`, used for error reporting) and stamps it with the current UTC time.
    pub fn parse_line(&self, line: &str, line_no: usize) -> Result<CatalogEntry> {
        self.parse_line_at(line, line_no, Utc::now())
    }

    pub fn parse_line_at(&self, line: &str, line_no: usize, now: DateTime<Utc>) -> Result<CatalogEntry> {
        let values: Vec<&str> = line.split(self.delimiter).collect();
        if values.len() != FIELD_COUNT {
            return Err(IngestError::malformed(
                line_no,
                format!("expected {} fields, found {}", FIELD_COUNT, values.len()),
            ));
        }

        if values[0].is_empty() {
            return Err(IngestError::malformed(line_no, "name must not be empty"));
        }

        // Numbers tolerate surrounding whitespace; text fields stay verbatim.
        let age_in_years = match values[6].trim() {
            "" => None,
            raw => Some(raw.parse::<i64>().map_err(|e| {
                IngestError::malformed(line_no, format!("invalid age {:?}: {}", raw, e))
            })?),
        };

        let volume_percent = match values[7].trim() {
            "" => None,
            raw => Some(self.parse_decimal(raw).map_err(|reason| {
                IngestError::malformed(line_no, format!("invalid volume {:?}: {}", raw, reason))
            })?),
        };

        // values[8] used to carry a creation date; the timestamp is always generated now.
        Ok(CatalogEntry {
            name: values[0].to_string(),
            category: values[1].to_string(),
            distillery: values[2].to_string(),
            country: values[3].to_string(),
            description: values[4].to_string(),
            barcode: non_empty(values[5]).map(str::to_string),
            age_in_years,
            volume_percent,
            creation_date: format_creation_date(now),
            image_path: non_empty(values[IMAGE_FIELD]).map(PathBuf::from),
            normalized_image: None,
        })
    }

    fn parse_decimal(&self, raw: &str) -> std::result::Result<f64, String> {
        let normalized = if self.decimal_separator == '.' {
            raw.to_string()
        } else {
            if raw.contains('.') {
                return Err(format!("expected '{}' as decimal separator", self.decimal_separator));
            }
            raw.replace(self.decimal_separator, ".")
        };

        let value = normalized.parse::<f64>().map_err(|e| e.to_string())?;
        if !value.is_finite() {
            return Err("value is not finite".to_string());
        }
        Ok(value)
    }
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// `YYYY-M-D H:M UTC`, deliberately without zero padding.
pub fn format_creation_date(now: DateTime<Utc>) -> String {
    format!(
        "{}-{}-{} {}:{} UTC",
        now.year(),
        now.month(),
        now.day(),
        now.hour(),
        now.minute()
    )
}
