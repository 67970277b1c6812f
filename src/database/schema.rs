use rusqlite::Connection;

use crate::error::{IngestError, Result};

pub const TYPE_DESCRIPTION_TABLE: &str = "
    CREATE TABLE TypeDescriptionTable (
        item_id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        category TEXT,
        distillery TEXT,
        country TEXT,
        description TEXT,
        age INTEGER,
        vol DECIMAL,
        picture_id INTEGER,
        creationDate TEXT,
        FOREIGN KEY(item_id) REFERENCES GlobalRatingTable(item_id)
    );
";

pub const PICTURE_TABLE: &str = "
    CREATE TABLE PictureTable (
        item_id INTEGER NOT NULL,
        pictureId INTEGER PRIMARY KEY AUTOINCREMENT,
        pictureData TEXT,
        isPicturePrivate INTEGER DEFAULT 0,
        pictureRating INTEGER DEFAULT 0,
        FOREIGN KEY(item_id) REFERENCES GlobalRatingTable(item_id)
    );
";

pub const BARCODE_TABLE: &str = "
    CREATE TABLE BarcodeTable (
        item_id INTEGER NOT NULL,
        barcode_id INTEGER PRIMARY KEY AUTOINCREMENT,
        barcode TEXT NOT NULL,
        FOREIGN KEY(item_id) REFERENCES GlobalRatingTable(item_id)
    );
";

/// Creates the three catalog tables. Fails if any of them already exists.
pub fn create_tables(conn: &Connection) -> Result<()> {
    // GlobalRatingTable belongs to the consuming application, so the references cannot be enforced here.
    conn.execute_batch("PRAGMA foreign_keys = OFF;")
        .map_err(IngestError::store_write("disable foreign keys"))?;

    for (context, sql) in [
        ("create TypeDescriptionTable", TYPE_DESCRIPTION_TABLE),
        ("create BarcodeTable", BARCODE_TABLE),
        ("create PictureTable", PICTURE_TABLE),
    ] {
        conn.execute_batch(sql).map_err(IngestError::store_write(context))?;
    }
    Ok(())
}
