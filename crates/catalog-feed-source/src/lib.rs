pub mod attribute_sets;
pub mod errors;
pub mod rows;

pub use attribute_sets::CsvAttributeSetRepository;
pub use errors::SourceError;
pub use rows::{CsvRowSource, CHANNEL_COLUMN};
