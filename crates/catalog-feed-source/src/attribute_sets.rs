use std::path::{Path, PathBuf};

use catalog_feed_core::{AttributeSetRepository, Result};
use csv::StringRecord;

use crate::errors::SourceError;
use crate::rows::{line_of, reader_builder};

const ID_COLUMN: &str = "attribute_set_id";
const NAME_COLUMN: &str = "name";

/// Attribute set names read from a CSV file with `attribute_set_id,name` columns.
#[derive(Debug, Clone)]
pub struct CsvAttributeSetRepository {
    path: PathBuf,
}

impl CsvAttributeSetRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> std::result::Result<Vec<(i64, String)>, SourceError> {
        let path = self.path.display().to_string();
        let open_error = |source| SourceError::Open {
            path: path.clone(),
            source,
        };

        let mut reader = reader_builder().from_path(&self.path).map_err(open_error)?;
        let headers = reader.headers().map_err(open_error)?.clone();
        let id_index = column(&headers, ID_COLUMN, &path)?;
        let name_index = column(&headers, NAME_COLUMN, &path)?;

        let mut sets = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| SourceError::Csv {
                path: path.clone(),
                line: source.position().map(|pos| pos.line()).unwrap_or_default(),
                source,
            })?;
            let raw_id = record.get(id_index).unwrap_or_default();
            let id = raw_id
                .parse::<i64>()
                .map_err(|_| SourceError::InvalidAttributeSet {
                    path: path.clone(),
                    line: line_of(&record),
                    value: raw_id.to_string(),
                })?;
            let name = record.get(name_index).unwrap_or_default().to_string();
            sets.push((id, name));
        }
        Ok(sets)
    }
}

fn column(
    headers: &StringRecord,
    name: &'static str,
    path: &str,
) -> std::result::Result<usize, SourceError> {
    headers
        .iter()
        .position(|header| header == name)
        .ok_or_else(|| SourceError::MissingColumn {
            path: path.to_string(),
            column: name,
        })
}

impl AttributeSetRepository for CsvAttributeSetRepository {
    fn attribute_sets(&self) -> Result<Vec<(i64, String)>> {
        Ok(self.read()?)
    }
}
