pub mod attribute_sets;
pub mod attributes;
pub mod config;
pub mod eligibility;
pub mod entity;
pub mod error;
pub mod feed;
pub mod identifiers;
pub mod markup;
pub mod source;
pub mod writer;

pub use attribute_sets::{AttributeSetNames, AttributeSetRepository};
pub use attributes::{AttributeLookup, AttributeSet, AttributeValue, ExportPair};
pub use config::{
    Channel, ChannelContext, ChannelRegistry, ConfigError, DateFieldMode, ExportConfig,
};
pub use entity::{ExportEntity, StockItem};
pub use error::{ExportError, Result};
pub use feed::{ChannelSummary, FeedExporter, FeedSummary};
pub use identifiers::{decode_channel, decode_entity, encode, ExternalId};
pub use markup::{MarkupSink, SinkError, XmlSink};
pub use source::{MemoryRowSource, RawRow, RowSource, Rows};
pub use writer::{
    CategoryDecision, CategoryPass, CategoryPassStats, CategoryRow, CategoryWriter,
    EntityAssembler, ProductPassStats, ProductWriter,
};
