use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::config::DateFieldMode;
use crate::error::{ExportError, Result};

/// Synthetic pair leading every exported attribute list.
pub const ITEM_TYPE_ATTRIBUTE: &str = "item_type";
pub const ITEM_TYPE_PRODUCT: &str = "product";

/// A raw attribute observation as supplied by the row source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl AttributeValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(value) => Some(*value),
            AttributeValue::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            AttributeValue::Float(_) => None,
            AttributeValue::Text(text) => text.trim().parse().ok(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Integer(value) => Some(*value as f64),
            AttributeValue::Float(value) => Some(*value),
            AttributeValue::Text(text) => text.trim().parse().ok(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Integer(value) => Some(*value != 0),
            AttributeValue::Float(value) => Some(*value != 0.0),
            AttributeValue::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => Some(true),
                "0" | "false" | "no" | "" => Some(false),
                _ => None,
            },
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Integer(value) => write!(f, "{value}"),
            AttributeValue::Float(value) => write!(f, "{value}"),
            AttributeValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

/// Result of [`AttributeSet::get`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeLookup<'a> {
    Single(&'a AttributeValue),
    Many(&'a [AttributeValue]),
}

impl<'a> AttributeLookup<'a> {
    pub fn values(&self) -> &'a [AttributeValue] {
        match self {
            AttributeLookup::Single(value) => std::slice::from_ref(*value),
            AttributeLookup::Many(values) => values,
        }
    }
}

/// One `(attribute, value)` pair of the flattened export view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportPair {
    pub attribute: String,
    pub value: String,
}

impl ExportPair {
    fn new(attribute: &str, value: impl ToString) -> Self {
        Self {
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }
}

/// Named, possibly repeated attribute values for one entity.
///
/// Attribute names keep first-seen order and values keep arrival order, so the export
/// view is deterministic for a deterministic row stream. Names listed as date attributes
/// collapse to a single retained value unless the mode is [`DateFieldMode::All`].
#[derive(Debug, Clone, Default)]
pub struct AttributeSet {
    entries: Vec<(String, Vec<AttributeValue>)>,
    positions: HashMap<String, usize>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        name: &str,
        value: AttributeValue,
        date_mode: DateFieldMode,
        is_date_attribute: bool,
    ) -> Result<()> {
        if is_date_attribute && date_mode != DateFieldMode::All {
            return self.add_date(name, value, date_mode);
        }

        self.values_mut(name).push(value);
        Ok(())
    }

    fn add_date(&mut self, name: &str, value: AttributeValue, mode: DateFieldMode) -> Result<()> {
        let incoming = parse_date(name, &value)?;

        let replace = match self.get_optional(name).and_then(|values| values.first()) {
            None => true,
            Some(retained) => {
                let retained = parse_date(name, retained)?;
                match mode {
                    DateFieldMode::Min => incoming < retained,
                    DateFieldMode::Max => incoming > retained,
                    DateFieldMode::All => false,
                }
            }
        };

        if replace {
            let values = self.values_mut(name);
            values.clear();
            values.push(value);
        }
        Ok(())
    }

    fn values_mut(&mut self, name: &str) -> &mut Vec<AttributeValue> {
        let index = match self.positions.get(name) {
            Some(&index) => index,
            None => {
                self.entries.push((name.to_string(), Vec::new()));
                let index = self.entries.len() - 1;
                self.positions.insert(name.to_string(), index);
                index
            }
        };
        &mut self.entries[index].1
    }

    /// Stored values for `name`, or a [`ExportError::MissingAttribute`] when it was never
    /// populated. A single value is returned as [`AttributeLookup::Single`] unless
    /// `as_array` is set.
    pub fn get(&self, name: &str, as_array: bool) -> Result<AttributeLookup<'_>> {
        let values = self
            .get_optional(name)
            .ok_or_else(|| ExportError::MissingAttribute {
                attribute: name.to_string(),
            })?;

        match values {
            [single] if !as_array => Ok(AttributeLookup::Single(single)),
            _ => Ok(AttributeLookup::Many(values)),
        }
    }

    pub fn get_optional(&self, name: &str) -> Option<&[AttributeValue]> {
        self.positions
            .get(name)
            .map(|&index| self.entries[index].1.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn value_count(&self) -> usize {
        self.entries.iter().map(|(_, values)| values.len()).sum()
    }

    /// Flattened `(attribute, value)` pairs, one per stored value, led by
    /// `item_type = product`.
    pub fn export_pairs(&self) -> Vec<ExportPair> {
        let mut pairs = Vec::with_capacity(self.value_count() + 1);
        pairs.push(ExportPair::new(ITEM_TYPE_ATTRIBUTE, ITEM_TYPE_PRODUCT));
        for (name, values) in &self.entries {
            pairs.extend(values.iter().map(|value| ExportPair::new(name, value)));
        }
        pairs
    }
}

fn parse_date(attribute: &str, value: &AttributeValue) -> Result<i64> {
    static FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

    let invalid = || ExportError::InvalidDate {
        attribute: attribute.to_string(),
        value: value.to_string(),
    };

    let AttributeValue::Text(text) = value else {
        return Err(invalid());
    };
    let trimmed = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.timestamp_micros());
    }
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt.and_utc().timestamp_micros());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc().timestamp_micros());
        }
    }
    Err(invalid())
}
