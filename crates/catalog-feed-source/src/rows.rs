use std::fs::File;
use std::path::{Path, PathBuf};

use catalog_feed_core::{AttributeValue, ExportError, RawRow, Result, RowSource, Rows};
use csv::{StringRecord, StringRecordsIntoIter, Trim};

use crate::errors::SourceError;

/// Optional column restricting a row to one channel. Empty or `0` means every channel.
pub const CHANNEL_COLUMN: &str = "channel_id";

pub(crate) fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.trim(Trim::All);
    builder
}

pub(crate) fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|pos| pos.line()).unwrap_or_default()
}

/// [`RowSource`] over a headered CSV file. The file is re-opened for every pass and read
/// one record at a time.
#[derive(Debug, Clone)]
pub struct CsvRowSource {
    path: PathBuf,
    channel_id: u32,
}

impl CsvRowSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            channel_id: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RowSource for CsvRowSource {
    fn set_channel(&mut self, channel_id: u32) {
        self.channel_id = channel_id;
    }

    fn rows(&mut self) -> Rows<'_> {
        match CsvRows::open(&self.path, self.channel_id) {
            Ok(rows) => Box::new(rows),
            Err(err) => Box::new(std::iter::once(Err::<RawRow, ExportError>(err.into()))),
        }
    }
}

struct CsvRows {
    path: String,
    channel_id: u32,
    headers: StringRecord,
    channel_column: Option<usize>,
    records: StringRecordsIntoIter<File>,
    failed: bool,
}

impl CsvRows {
    fn open(path: &Path, channel_id: u32) -> std::result::Result<Self, SourceError> {
        let display = path.display().to_string();
        let mut reader = reader_builder()
            .from_path(path)
            .map_err(|source| SourceError::Open {
                path: display.clone(),
                source,
            })?;
        let headers = reader
            .headers()
            .map_err(|source| SourceError::Open {
                path: display.clone(),
                source,
            })?
            .clone();
        let channel_column = headers.iter().position(|name| name == CHANNEL_COLUMN);

        Ok(Self {
            path: display,
            channel_id,
            headers,
            channel_column,
            records: reader.into_records(),
            failed: false,
        })
    }

    fn record_channel(&self, record: &StringRecord) -> std::result::Result<u32, SourceError> {
        let value = match self.channel_column.and_then(|index| record.get(index)) {
            None | Some("") => return Ok(0),
            Some(value) => value,
        };
        value.parse().map_err(|_| SourceError::InvalidChannel {
            path: self.path.clone(),
            line: line_of(record),
            value: value.to_string(),
        })
    }

    fn to_row(&self, record: &StringRecord) -> RawRow {
        self.headers
            .iter()
            .zip(record.iter())
            .enumerate()
            .filter(|(index, (_, value))| {
                Some(*index) != self.channel_column && !value.is_empty()
            })
            .map(|(_, (name, value))| (name.to_string(), AttributeValue::from(value)))
            .collect()
    }
}

impl Iterator for CsvRows {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(source) => {
                    self.failed = true;
                    let line = source.position().map(|pos| pos.line()).unwrap_or_default();
                    return Some(Err(SourceError::Csv {
                        path: self.path.clone(),
                        line,
                        source,
                    }
                    .into()));
                }
            };

            match self.record_channel(&record) {
                Ok(channel) if channel == 0 || channel == self.channel_id => {
                    return Some(Ok(self.to_row(&record)))
                }
                Ok(_) => continue,
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err.into()));
                }
            }
        }
    }
}
