use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::error::{IngestError, Result};
use crate::ingest::parser::{CatalogEntry, RecordParser};

/// Lazily parses one [`CatalogEntry`] per non-blank line, in input order.
pub struct RecordReader<R: BufRead> {
    lines: Lines<R>,
    parser: RecordParser,
    line_no: usize,
}

impl RecordReader<BufReader<File>> {
    pub fn open(path: &Path, parser: RecordParser) -> Result<Self> {
        let file = File::open(path).map_err(|source| IngestError::Io(std::io::Error::new(
            source.kind(),
            format!("Failed to open input file {:?}: {}", path, source),
        )))?;
        Ok(Self::new(BufReader::new(file), parser))
    }
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(reader: R, parser: RecordParser) -> Self {
        Self {
            lines: reader.lines(),
            parser,
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<CatalogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;

            if line.is_empty() {
                continue;
            }
            return Some(self.parser.parse_line(&line, self.line_no));
        }
    }
}
