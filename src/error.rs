use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

/// Every failure aborts the whole run; nothing here is retried.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("Failed to decode image {path:?}: {reason}")]
    ImageDecode { path: PathBuf, reason: String },

    #[error("Image IO failed for {path:?}: {source}")]
    ImageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create store {path:?}: {source}")]
    StoreCreation {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Store write failed ({context}): {source}")]
    StoreWrite {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn store_write(context: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::StoreWrite { context, source }
    }
}
