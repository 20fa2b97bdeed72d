use std::collections::HashSet;

use serde::Serialize;

use crate::config::{Channel, ChannelRegistry};
use crate::entity::{parse_u64, FIELD_ENTITY_ID};
use crate::error::{ExportError, Result};
use crate::markup::MarkupSink;
use crate::source::{RawRow, RowSource};

use super::{category_reference, ROOT_CATEGORY_ID, ROOT_CATEGORY_NAME};

pub const FIELD_PARENT_ID: &str = "parent_id";
pub const FIELD_CATEGORY_NAME: &str = "name";
pub const FIELD_POSITION: &str = "position";
pub const FIELD_IS_ACTIVE: &str = "is_active";

/// One category node as read from the channel's category stream.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRow {
    pub entity_id: u64,
    /// `0` means "no parent" and only occurs for the synthesized root.
    pub parent_id: u64,
    pub name: String,
    pub position: i64,
    pub is_active: bool,
}

impl CategoryRow {
    pub fn root() -> Self {
        Self {
            entity_id: ROOT_CATEGORY_ID,
            parent_id: 0,
            name: ROOT_CATEGORY_NAME.to_string(),
            position: 0,
            is_active: true,
        }
    }

    /// A row without `entity_id` or `parent_id` is malformed; the other fields default.
    pub fn from_raw(row: &RawRow) -> Result<Self> {
        let required = |field: &str| {
            row.get(field)
                .ok_or_else(|| ExportError::missing_field(field))
                .and_then(|value| parse_u64(field, value))
        };

        let entity_id = required(FIELD_ENTITY_ID)?;
        let parent_id = required(FIELD_PARENT_ID)?;
        let name = row
            .get(FIELD_CATEGORY_NAME)
            .map(|value| value.to_string())
            .unwrap_or_default();
        let position = match row.get(FIELD_POSITION) {
            Some(value) => value
                .as_i64()
                .ok_or_else(|| ExportError::invalid_field(FIELD_POSITION, value))?,
            None => 0,
        };
        // Any non-zero flag counts as active.
        let is_active = match row.get(FIELD_IS_ACTIVE) {
            Some(value) => match value.as_i64() {
                Some(flag) => flag != 0,
                None => value
                    .as_bool()
                    .ok_or_else(|| ExportError::invalid_field(FIELD_IS_ACTIVE, value))?,
            },
            None => false,
        };

        Ok(Self {
            entity_id,
            parent_id,
            name,
            position,
            is_active,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CategoryDecision {
    Accept(CategoryRow),
    RejectInactive,
    RejectOrphan,
}

/// Acceptance state of one channel pass: the ids already emitted, seeded with the root.
///
/// A node is accepted only once its parent has been emitted, so the output never
/// references an ancestor that is missing from the feed, whatever order the stream
/// delivers nodes in.
#[derive(Debug)]
pub struct CategoryPass<'a> {
    channel: &'a Channel,
    emitted: HashSet<u64>,
}

impl<'a> CategoryPass<'a> {
    pub fn new(channel: &'a Channel) -> Self {
        Self {
            channel,
            emitted: HashSet::from([ROOT_CATEGORY_ID]),
        }
    }

    pub fn decide(&mut self, mut row: CategoryRow) -> CategoryDecision {
        // Channel root categories are always exported, prefixed so they are distinct in
        // the shared tree.
        if row.parent_id == ROOT_CATEGORY_ID {
            row.name = format!("{} - {}", self.channel.name, row.name);
        } else if !row.is_active {
            return CategoryDecision::RejectInactive;
        }

        if !self.emitted.contains(&row.parent_id) {
            return CategoryDecision::RejectOrphan;
        }

        self.emitted.insert(row.entity_id);
        CategoryDecision::Accept(row)
    }

    pub fn is_emitted(&self, category_id: u64) -> bool {
        self.emitted.contains(&category_id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryPassStats {
    pub accepted: usize,
    pub rejected_inactive: usize,
    pub rejected_orphan: usize,
}

/// Streams the category tree of every enabled channel into a `categories` container.
pub struct CategoryWriter<'a, R: ChannelRegistry + ?Sized> {
    registry: &'a R,
}

impl<'a, R: ChannelRegistry + ?Sized> CategoryWriter<'a, R> {
    pub fn new(registry: &'a R) -> Self {
        Self { registry }
    }

    pub fn write<S: MarkupSink>(
        &self,
        sink: &mut S,
        source: &mut dyn RowSource,
    ) -> Result<Vec<(u32, CategoryPassStats)>> {
        let mut stats = Vec::new();

        sink.scoped::<ExportError, _>("categories", |sink| {
            sink.flush()?;
            write_category(sink, 0, &CategoryRow::root())?;

            for channel in self.registry.enabled_channels() {
                let channel_stats = self.write_channel(sink, source, channel)?;
                stats.push((channel.id, channel_stats));
            }
            Ok(())
        })?;
        sink.flush()?;

        Ok(stats)
    }

    /// One channel pass. A malformed row aborts the pass.
    pub fn write_channel<S: MarkupSink>(
        &self,
        sink: &mut S,
        source: &mut dyn RowSource,
        channel: &Channel,
    ) -> Result<CategoryPassStats> {
        let mut pass = CategoryPass::new(channel);
        let mut stats = CategoryPassStats::default();

        source.set_channel(channel.id);
        for row in source.rows() {
            let row = CategoryRow::from_raw(&row?)?;
            match pass.decide(row) {
                CategoryDecision::Accept(row) => {
                    write_category(sink, channel.id, &row)?;
                    sink.flush()?;
                    stats.accepted += 1;
                }
                CategoryDecision::RejectInactive => stats.rejected_inactive += 1,
                CategoryDecision::RejectOrphan => stats.rejected_orphan += 1,
            }
        }

        Ok(stats)
    }
}

fn write_category<S: MarkupSink>(sink: &mut S, channel_id: u32, row: &CategoryRow) -> Result<()> {
    let external_id = category_reference(channel_id, row.entity_id)?;

    sink.scoped::<ExportError, _>("category", |sink| {
        sink.write_element("categoryid", &external_id)?;
        sink.write_element("rank", &row.position.to_string())?;
        sink.write_element("name", &row.name)?;

        if row.parent_id != 0 {
            let parent = category_reference(channel_id, row.parent_id)?;
            sink.scoped::<ExportError, _>("parents", |sink| {
                sink.write_element("categoryid", &parent)?;
                Ok(())
            })?;
        }
        Ok(())
    })
}
