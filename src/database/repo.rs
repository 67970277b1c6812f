use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use tracing::{debug, warn};

use crate::database::schema;
use crate::error::{IngestError, Result};
use crate::ingest::parser::CatalogEntry;

/// Written to `TypeDescriptionTable.picture_id`; picture rows are joined by `item_id` instead.
pub const PICTURE_ID_PLACEHOLDER: i64 = 0;

/// Row ids produced for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrittenEntry {
    pub item_id: i64,
    pub picture_id: Option<i64>,
    pub barcode_id: Option<i64>,
}

/// A freshly created catalog database.
pub struct CatalogStore {
    conn: Connection,
    path: PathBuf,
}

impl CatalogStore {
    /// Creates `path`, which must not exist yet, and opens it.
    /// The file is removed again if it cannot be opened as a database.
    pub fn create(path: &Path, schema_version: u32) -> Result<Self> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| IngestError::StoreCreation {
                path: path.to_path_buf(),
                source: Box::new(e),
            })?;

        let conn = match Self::open_created(path, schema_version) {
            Ok(conn) => conn,
            Err(source) => {
                if let Err(e) = fs::remove_file(path) {
                    warn!("Failed to remove unusable store {:?}: {}", path, e);
                }
                return Err(IngestError::StoreCreation {
                    path: path.to_path_buf(),
                    source: Box::new(source),
                });
            }
        };

        debug!("Created store {:?} (schema version {})", path, schema_version);
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    fn open_created(path: &Path, schema_version: u32) -> rusqlite::Result<Connection> {
        let conn = Connection::open(path)?;
        // Informational only; nothing reads it back. 0 is already SQLite's default.
        if schema_version != 0 {
            conn.pragma_update(None, "user_version", schema_version)?;
        }
        Ok(conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn create_tables(&self) -> Result<()> {
        schema::create_tables(&self.conn)
    }

    /// Writes the description row and, when present, its picture and barcode rows in one transaction.
    pub fn write_entry(&mut self, entry: &CatalogEntry) -> Result<WrittenEntry> {
        let tx = self
            .conn
            .transaction()
            .map_err(IngestError::store_write("begin transaction"))?;

        let written = {
            let mut stmt_description = tx
                .prepare_cached(
                    "INSERT INTO TypeDescriptionTable
                        (name, category, distillery, country, description, age, vol, picture_id, creationDate)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                     RETURNING item_id",
                )
                .map_err(IngestError::store_write("prepare description insert"))?;

            let item_id: i64 = stmt_description
                .query_row(
                    params![
                        entry.name,
                        entry.category,
                        entry.distillery,
                        entry.country,
                        entry.description,
                        entry.age_in_years,
                        entry.volume_percent.map(round_volume),
                        PICTURE_ID_PLACEHOLDER,
                        entry.creation_date,
                    ],
                    |row| row.get(0),
                )
                .map_err(IngestError::store_write("insert description"))?;

            let picture_id = match &entry.normalized_image {
                Some(image) => {
                    let mut stmt = tx
                        .prepare_cached(
                            "INSERT INTO PictureTable (item_id, pictureData, isPicturePrivate, pictureRating)
                             VALUES (?1, ?2, 0, 0)
                             RETURNING pictureId",
                        )
                        .map_err(IngestError::store_write("prepare picture insert"))?;
                    let id: i64 = stmt
                        .query_row(params![item_id, image.as_str()], |row| row.get(0))
                        .map_err(IngestError::store_write("insert picture"))?;
                    Some(id)
                }
                None => None,
            };

            let barcode_id = match &entry.barcode {
                Some(barcode) => {
                    let mut stmt = tx
                        .prepare_cached(
                            "INSERT INTO BarcodeTable (item_id, barcode) VALUES (?1, ?2) RETURNING barcode_id",
                        )
                        .map_err(IngestError::store_write("prepare barcode insert"))?;
                    let id: i64 = stmt
                        .query_row(params![item_id, barcode], |row| row.get(0))
                        .map_err(IngestError::store_write("insert barcode"))?;
                    Some(id)
                }
                None => None,
            };

            WrittenEntry {
                item_id,
                picture_id,
                barcode_id,
            }
        };

        tx.commit().map_err(IngestError::store_write("commit"))?;
        Ok(written)
    }

    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| IngestError::StoreWrite { context: "close", source: e })
    }
}

/// Volumes are kept to one decimal, as in `43.0`.
fn round_volume(vol: f64) -> f64 {
    (vol * 10.0).round() / 10.0
}
