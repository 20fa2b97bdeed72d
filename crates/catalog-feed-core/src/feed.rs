use serde::Serialize;
use tracing::{info, warn};

use crate::attribute_sets::AttributeSetNames;
use crate::config::{ChannelRegistry, ExportConfig};
use crate::error::{ExportError, Result};
use crate::markup::MarkupSink;
use crate::source::RowSource;
use crate::writer::{CategoryPassStats, CategoryWriter, ProductPassStats, ProductWriter};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChannelSummary {
    pub channel_id: u32,
    pub channel_name: String,
    pub products: ProductPassStats,
    pub categories: CategoryPassStats,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedSummary {
    pub channels: Vec<ChannelSummary>,
    pub disabled_channels: Vec<u32>,
}

impl FeedSummary {
    pub fn exported_products(&self) -> usize {
        self.channels.iter().map(|c| c.products.exported).sum()
    }

    pub fn accepted_categories(&self) -> usize {
        self.channels.iter().map(|c| c.categories.accepted).sum()
    }
}

/// Writes the complete feed: every enabled channel's items, then the shared category
/// tree, inside one `feed` document.
pub struct FeedExporter<'a> {
    config: &'a ExportConfig,
    attribute_sets: &'a AttributeSetNames,
}

impl<'a> FeedExporter<'a> {
    pub fn new(config: &'a ExportConfig, attribute_sets: &'a AttributeSetNames) -> Self {
        Self {
            config,
            attribute_sets,
        }
    }

    pub fn export<S: MarkupSink>(
        &self,
        sink: &mut S,
        products: &mut dyn RowSource,
        categories: &mut dyn RowSource,
    ) -> Result<FeedSummary> {
        self.config.validate()?;

        let mut summary = FeedSummary::default();
        for channel in self.config.channels().iter().filter(|c| !c.enabled) {
            warn!(
                channel_id = channel.id,
                channel = %channel.name,
                "channel export disabled, skipping"
            );
            summary.disabled_channels.push(channel.id);
        }

        let mut product_stats = Vec::new();
        let mut category_stats = Vec::new();

        sink.begin_document()?;
        sink.scoped::<ExportError, _>("feed", |sink| {
            product_stats =
                ProductWriter::new(self.config, self.attribute_sets).write(sink, products)?;
            category_stats = CategoryWriter::new(self.config).write(sink, categories)?;
            Ok(())
        })?;
        sink.flush()?;

        for channel in self.config.enabled_channels() {
            let products = lookup(&product_stats, channel.id);
            let categories = lookup(&category_stats, channel.id);
            info!(
                channel_id = channel.id,
                channel = %channel.name,
                products_seen = products.seen,
                products_exported = products.exported,
                products_skipped = products.skipped_process + products.skipped_export,
                categories_accepted = categories.accepted,
                categories_rejected = categories.rejected_inactive + categories.rejected_orphan,
                "channel exported"
            );
            summary.channels.push(ChannelSummary {
                channel_id: channel.id,
                channel_name: channel.name.clone(),
                products,
                categories,
            });
        }

        Ok(summary)
    }
}

fn lookup<T: Copy + Default>(stats: &[(u32, T)], channel_id: u32) -> T {
    stats
        .iter()
        .find(|(id, _)| *id == channel_id)
        .map(|(_, value)| *value)
        .unwrap_or_default()
}
