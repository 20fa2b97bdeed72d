use serde::Serialize;

use crate::attribute_sets::{AttributeSetNames, ATTRIBUTE_SET_ID, ATTRIBUTE_SET_NAME};
use crate::attributes::AttributeValue;
use crate::config::{ChannelContext, ChannelRegistry, ExportConfig};
use crate::entity::{parse_entity_id, parse_u64, ExportEntity};
use crate::error::{ExportError, Result};
use crate::identifiers::encode;
use crate::markup::MarkupSink;
use crate::source::{RawRow, RowSource};

use super::category_reference;

pub const FIELD_CATEGORY_ID: &str = "category_id";
pub const FIELD_WEBSITE_ID: &str = "website_id";
pub const FIELD_GROUP_CODE: &str = "group_code";
pub const FIELD_STOCK_QTY: &str = "stock_qty";
pub const FIELD_IS_IN_STOCK: &str = "is_in_stock";

/// Groups consecutive rows sharing an `entity_id` into one [`ExportEntity`].
///
/// Only the entity under construction is held in memory.
pub struct EntityAssembler<'a, I> {
    context: &'a ChannelContext,
    rows: I,
    pending: Option<ExportEntity<'a>>,
    failed: bool,
}

impl<'a, I> EntityAssembler<'a, I>
where
    I: Iterator<Item = Result<RawRow>>,
{
    pub fn new(context: &'a ChannelContext, rows: I) -> Self {
        Self {
            context,
            rows,
            pending: None,
            failed: false,
        }
    }

    fn fail(&mut self, err: ExportError) -> Option<Result<ExportEntity<'a>>> {
        self.failed = true;
        self.pending = None;
        Some(Err(err))
    }
}

impl<'a, I> Iterator for EntityAssembler<'a, I>
where
    I: Iterator<Item = Result<RawRow>>,
{
    type Item = Result<ExportEntity<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let row = match self.rows.next() {
                None => return self.pending.take().map(Ok),
                Some(Err(err)) => return self.fail(err),
                Some(Ok(row)) => row,
            };

            let id = match parse_entity_id(&row) {
                Ok(id) => id,
                Err(err) => return self.fail(err),
            };

            let (mut entity, finished) = match self.pending.take() {
                Some(entity) if entity.id() == id => (entity, None),
                finished => (ExportEntity::new(self.context, id), finished),
            };

            if let Err(err) = apply_product_row(&mut entity, &row) {
                return self.fail(err);
            }
            self.pending = Some(entity);

            if let Some(done) = finished {
                return Some(Ok(done));
            }
        }
    }
}

/// Routes link fields to their setters and aggregates everything else as attributes.
pub fn apply_product_row(entity: &mut ExportEntity<'_>, row: &RawRow) -> Result<()> {
    let mut attributes = RawRow::new();
    let mut stock = None;

    for (key, value) in row.iter() {
        match key {
            FIELD_CATEGORY_ID => entity.add_category_id(parse_u64(key, value)?),
            FIELD_WEBSITE_ID => {
                let website_id = u32::try_from(parse_u64(key, value)?)
                    .map_err(|_| ExportError::invalid_field(key, value))?;
                entity.add_linked_channel_id(website_id);
            }
            FIELD_GROUP_CODE => entity.set_group_code(parse_u64(key, value)?),
            FIELD_STOCK_QTY => {
                let snapshot = stock
                    .get_or_insert_with(|| entity.stock_item().copied().unwrap_or_default());
                snapshot.qty = value
                    .as_f64()
                    .ok_or_else(|| ExportError::invalid_field(key, value))?;
            }
            FIELD_IS_IN_STOCK => {
                let snapshot = stock
                    .get_or_insert_with(|| entity.stock_item().copied().unwrap_or_default());
                snapshot.is_in_stock = value
                    .as_bool()
                    .ok_or_else(|| ExportError::invalid_field(key, value))?;
            }
            _ => attributes.push(key, value.clone()),
        }
    }

    if let Some(snapshot) = stock {
        entity.set_stock_item(snapshot);
    }
    entity.set_from_row(&attributes)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProductPassStats {
    pub seen: usize,
    pub skipped_process: usize,
    pub skipped_export: usize,
    pub exported: usize,
}

/// Streams eligible entities of every enabled channel into an `items` container.
pub struct ProductWriter<'a> {
    config: &'a ExportConfig,
    attribute_sets: &'a AttributeSetNames,
}

impl<'a> ProductWriter<'a> {
    pub fn new(config: &'a ExportConfig, attribute_sets: &'a AttributeSetNames) -> Self {
        Self {
            config,
            attribute_sets,
        }
    }

    pub fn write<S: MarkupSink>(
        &self,
        sink: &mut S,
        source: &mut dyn RowSource,
    ) -> Result<Vec<(u32, ProductPassStats)>> {
        let mut stats = Vec::new();

        sink.scoped::<ExportError, _>("items", |sink| {
            sink.flush()?;
            for channel in self.config.enabled_channels() {
                let context = self.config.channel_context(channel);
                let channel_stats = self.write_channel(sink, source, &context)?;
                stats.push((channel.id, channel_stats));
            }
            Ok(())
        })?;
        sink.flush()?;

        Ok(stats)
    }

    pub fn write_channel<S: MarkupSink>(
        &self,
        sink: &mut S,
        source: &mut dyn RowSource,
        context: &ChannelContext,
    ) -> Result<ProductPassStats> {
        let mut stats = ProductPassStats::default();

        source.set_channel(context.channel_id());
        for entity in EntityAssembler::new(context, source.rows()) {
            let mut entity = entity?;
            stats.seen += 1;

            if !entity.should_process() {
                stats.skipped_process += 1;
                continue;
            }
            self.attach_attribute_set_name(&mut entity)?;

            if !entity.should_export() {
                stats.skipped_export += 1;
                continue;
            }

            write_item(sink, &entity)?;
            sink.flush()?;
            stats.exported += 1;
        }

        Ok(stats)
    }

    fn attach_attribute_set_name(&self, entity: &mut ExportEntity<'_>) -> Result<()> {
        if entity.attribute(ATTRIBUTE_SET_NAME).is_some() {
            return Ok(());
        }
        let name = entity
            .attribute(ATTRIBUTE_SET_ID)
            .and_then(|values| values.first())
            .and_then(AttributeValue::as_i64)
            .and_then(|id| self.attribute_sets.name_of(id))
            .map(str::to_string);

        match name {
            Some(name) => entity.add_attribute(ATTRIBUTE_SET_NAME, AttributeValue::Text(name)),
            None => Ok(()),
        }
    }
}

fn write_item<S: MarkupSink>(sink: &mut S, entity: &ExportEntity<'_>) -> Result<()> {
    let channel_id = entity.channel_id();
    let external_id = encode(channel_id, entity.id())?;
    let group_code = entity.group_code()?;

    sink.scoped::<ExportError, _>("item", |sink| {
        sink.write_element("id", &external_id)?;
        sink.write_element("name", entity.name())?;
        sink.write_element("price", &AttributeValue::Float(entity.price()).to_string())?;
        sink.write_element("stock", &AttributeValue::Float(entity.stock_qty()).to_string())?;
        sink.write_element("groupcode", &group_code)?;

        sink.scoped::<ExportError, _>("categories", |sink| {
            for &category_id in entity.categories() {
                sink.write_element("categoryid", &category_reference(channel_id, category_id)?)?;
            }
            Ok(())
        })?;

        sink.scoped::<ExportError, _>("attributes", |sink| {
            for pair in entity.export_attributes() {
                sink.scoped::<ExportError, _>("attribute", |sink| {
                    sink.write_element("name", &pair.attribute)?;
                    sink.write_element("value", &pair.value)?;
                    Ok(())
                })?;
            }
            Ok(())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Channel, DateFieldMode};
    use crate::source::MemoryRowSource;

    fn channel(id: u32, website_id: u32) -> Channel {
        Channel {
            id,
            name: format!("Channel {id}"),
            website_id,
            enabled: true,
            grouped_export: false,
            show_out_of_stock: false,
        }
    }

    fn product(id: i64) -> RawRow {
        RawRow::new()
            .with("entity_id", id)
            .with("type_id", "simple")
            .with("status", 1i64)
            .with("visibility", 4i64)
            .with("name", format!("Product {id}"))
            .with("price", "9.95")
            .with("website_id", 1i64)
            .with("stock_qty", 5i64)
            .with("is_in_stock", 1i64)
    }

    #[test]
    fn assembler_merges_consecutive_rows() {
        let context = ChannelContext::new(channel(1, 1));
        let rows = vec![
            Ok(product(1)),
            Ok(RawRow::new().with("entity_id", 1i64).with("category_id", 10i64)),
            Ok(RawRow::new().with("entity_id", 1i64).with("category_id", 11i64)),
            Ok(product(2)),
        ];

        let entities: Vec<ExportEntity<'_>> = EntityAssembler::new(&context, rows.into_iter())
            .collect::<Result<_>>()
            .expect("assemble");

        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].id(), 1);
        assert_eq!(entities[0].categories(), &[10, 11]);
        assert_eq!(entities[1].id(), 2);
        assert!(entities[1].categories().is_empty());
        assert!(entities[0].attribute("category_id").is_none());
        assert!(entities[0].attribute("website_id").is_none());
    }

    #[test]
    fn assembler_stops_after_malformed_row() {
        let context = ChannelContext::new(channel(1, 1));
        let rows = vec![
            Ok(product(1)),
            Ok(RawRow::new().with("name", "no id")),
            Ok(product(2)),
        ];

        let mut assembler = EntityAssembler::new(&context, rows.into_iter());
        assert!(matches!(
            assembler.next(),
            Some(Err(ExportError::MalformedRow { .. }))
        ));
        assert!(assembler.next().is_none());
    }

    #[test]
    fn stock_fields_merge_across_rows() {
        let context = ChannelContext::new(channel(1, 1));
        let mut entity = ExportEntity::new(&context, 3);
        apply_product_row(
            &mut entity,
            &RawRow::new().with("entity_id", 3i64).with("stock_qty", "2.5"),
        )
        .expect("qty row");
        apply_product_row(
            &mut entity,
            &RawRow::new().with("entity_id", 3i64).with("is_in_stock", "1"),
        )
        .expect("flag row");

        let stock = entity.stock_item().expect("stock snapshot");
        assert_eq!(stock.qty, 2.5);
        assert!(stock.is_in_stock);
    }

    #[test]
    fn writes_only_eligible_items() {
        let config = ExportConfig {
            channels: vec![channel(2, 1)],
            ..ExportConfig::default()
        };
        let mut out_of_stock = product(3);
        out_of_stock.push("is_in_stock", 0i64);
        let mut disabled = product(4);
        disabled.push("status", 2i64);
        let mut source = MemoryRowSource::new().with_rows(
            2,
            [
                product(1)
                    .with("category_id", 1i64)
                    .with("category_id", 12i64)
                    .with("color", "red & blue"),
                out_of_stock,
                disabled,
            ],
        );

        let attribute_sets = AttributeSetNames::default();
        let mut sink = crate::markup::XmlSink::new(Vec::new());
        let stats = ProductWriter::new(&config, &attribute_sets)
            .write(&mut sink, &mut source)
            .expect("write items");
        let xml = String::from_utf8(sink.into_inner()).expect("utf8");

        assert_eq!(
            stats,
            vec![(
                2,
                ProductPassStats {
                    seen: 3,
                    skipped_process: 1,
                    skipped_export: 1,
                    exported: 1,
                }
            )]
        );
        assert!(xml.starts_with("<items><item><id>100021</id><name>Product 1</name>"));
        assert!(xml.contains("<price>9.95</price><stock>5</stock><groupcode>100021</groupcode>"));
        assert!(xml.contains(
            "<categories><categoryid>1</categoryid><categoryid>1000212</categoryid></categories>"
        ));
        assert!(xml.contains(
            "<attributes><attribute><name>item_type</name><value>product</value></attribute>"
        ));
        assert!(xml.contains("<value>red &amp; blue</value>"));
        assert!(!xml.contains("Product 3"));
        assert!(!xml.contains("Product 4"));
        assert!(xml.ends_with("</item></items>"));
    }

    #[test]
    fn attribute_set_name_is_attached_from_cache() {
        let config = ExportConfig {
            date_field: DateFieldMode::All,
            channels: vec![channel(1, 1)],
            ..ExportConfig::default()
        };
        let attribute_sets = AttributeSetNames::from_pairs([(4, "Default".to_string())]);
        let mut source = MemoryRowSource::new()
            .with_rows(1, [product(1).with("attribute_set_id", 4i64)]);

        let mut sink = crate::markup::XmlSink::new(Vec::new());
        ProductWriter::new(&config, &attribute_sets)
            .write(&mut sink, &mut source)
            .expect("write items");
        let xml = String::from_utf8(sink.into_inner()).expect("utf8");

        assert!(xml.contains(
            "<attribute><name>attribute_set_name</name><value>Default</value></attribute>"
        ));
    }
}
