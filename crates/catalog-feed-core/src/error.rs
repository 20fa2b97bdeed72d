// crates/catalog-feed-core/src/error.rs

use thiserror::Error;

use crate::config::ConfigError;
use crate::markup::SinkError;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Could not find attribute {attribute}")]
    MissingAttribute { attribute: String },

    #[error("Malformed row: field '{field}' {reason}")]
    MalformedRow { field: String, reason: String },

    #[error("Attribute '{attribute}' has unparseable date value '{value}'")]
    InvalidDate { attribute: String, value: String },

    #[error("Channel id {channel_id} exceeds the identifier channel field (max {max})")]
    IdentifierRange { channel_id: u32, max: u32 },

    #[error("Malformed external identifier '{0}'")]
    MalformedIdentifier(String),

    #[error("Markup sink failed: {0}")]
    Sink(#[from] SinkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Row source failed")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ExportError {
    pub(crate) fn missing_field(field: &str) -> Self {
        ExportError::MalformedRow {
            field: field.to_string(),
            reason: "is missing".to_string(),
        }
    }

    pub(crate) fn invalid_field(field: &str, value: impl std::fmt::Display) -> Self {
        ExportError::MalformedRow {
            field: field.to_string(),
            reason: format!("has invalid value '{value}'"),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
