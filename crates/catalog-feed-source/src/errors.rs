use catalog_feed_core::ExportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("{path} line {line}: CSV error: {source}")]
    Csv {
        path: String,
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("{path} is missing required column '{column}'")]
    MissingColumn { path: String, column: &'static str },

    #[error("{path} line {line}: invalid channel id '{value}'")]
    InvalidChannel {
        path: String,
        line: u64,
        value: String,
    },

    #[error("{path} line {line}: invalid attribute set id '{value}'")]
    InvalidAttributeSet {
        path: String,
        line: u64,
        value: String,
    },
}

impl From<SourceError> for ExportError {
    fn from(err: SourceError) -> Self {
        ExportError::Source(Box::new(err))
    }
}
