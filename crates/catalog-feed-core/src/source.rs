use std::collections::BTreeMap;

use crate::attributes::AttributeValue;
use crate::error::{ExportError, Result};

/// One row from the catalog data source: ordered `(field, value)` observations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    fields: Vec<(String, AttributeValue)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, value: impl Into<AttributeValue>) {
        self.fields.push((field.into(), value.into()));
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.push(field, value);
        self
    }

    /// First value observed for `field`.
    pub fn get(&self, field: &str) -> Option<&AttributeValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, AttributeValue)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (String, AttributeValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

pub type Rows<'a> = Box<dyn Iterator<Item = Result<RawRow>> + 'a>;

/// Lazy, restartable supplier of raw rows, scoped to one channel at a time.
pub trait RowSource {
    fn set_channel(&mut self, channel_id: u32);

    /// Rows for the current channel, in the order the source defines. Every call starts
    /// from the beginning.
    fn rows(&mut self) -> Rows<'_>;
}

/// In-memory [`RowSource`]. Rows registered for channel `0` are visible to every channel.
#[derive(Debug, Clone, Default)]
pub struct MemoryRowSource {
    rows: BTreeMap<u32, Vec<RawRow>>,
    channel_id: u32,
}

impl MemoryRowSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, channel_id: u32, row: RawRow) {
        self.rows.entry(channel_id).or_default().push(row);
    }

    pub fn with_rows(mut self, channel_id: u32, rows: impl IntoIterator<Item = RawRow>) -> Self {
        self.rows.entry(channel_id).or_default().extend(rows);
        self
    }
}

impl RowSource for MemoryRowSource {
    fn set_channel(&mut self, channel_id: u32) {
        self.channel_id = channel_id;
    }

    fn rows(&mut self) -> Rows<'_> {
        let shared = self.rows.get(&0).into_iter().flatten();
        let scoped = if self.channel_id == 0 {
            None
        } else {
            self.rows.get(&self.channel_id)
        };
        Box::new(
            shared
                .chain(scoped.into_iter().flatten())
                .cloned()
                .map(Ok::<RawRow, ExportError>),
        )
    }
}
