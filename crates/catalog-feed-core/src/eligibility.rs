//! Inclusion rules deciding whether an [`ExportEntity`] reaches the feed.
//!
//! Every predicate reads the entity's current state; nothing is cached. `should_process`
//! is the cheap early filter applied right after aggregation, `should_export` the final
//! gate before emission. Status belongs only to the former.

use crate::entity::{ExportEntity, STATUS_ENABLED, TYPE_SIMPLE, VISIBLE_IN_SITE};

/// Attribute whose presence marks a simple entity as a child of a composite parent.
pub const PARENT_ATTRIBUTE: &str = "parent_id";

impl ExportEntity<'_> {
    pub fn should_process(&self) -> bool {
        self.should_export_by_status()
            && self.should_export_by_visibility()
            && self.should_export_by_name()
    }

    pub fn should_export(&self) -> bool {
        self.should_export_by_website()
            && self.should_export_by_visibility()
            && self.should_export_by_stock()
    }

    pub fn should_export_by_status(&self) -> bool {
        self.status() == STATUS_ENABLED
    }

    /// With grouped export, a simple entity that belongs to a composite parent is reached
    /// through the parent and is visible whatever its own visibility code says.
    pub fn should_export_by_visibility(&self) -> bool {
        let channel = &self.context().channel;
        if channel.grouped_export
            && self.type_id() == TYPE_SIMPLE
            && self.attribute(PARENT_ATTRIBUTE).is_some()
        {
            return true;
        }

        VISIBLE_IN_SITE.contains(&self.visibility())
    }

    pub fn should_export_by_website(&self) -> bool {
        let context = self.context();
        if context.single_channel_mode {
            return true;
        }

        self.linked_channel_ids()
            .contains(&context.channel.website_id)
    }

    pub fn should_export_by_stock(&self) -> bool {
        if self.context().channel.show_out_of_stock {
            return true;
        }

        self.is_in_stock()
    }

    pub fn should_export_by_name(&self) -> bool {
        !self.name().is_empty()
    }

    /// A missing stock snapshot counts as out of stock.
    pub fn is_in_stock(&self) -> bool {
        self.stock_item().is_some_and(|stock| stock.is_in_stock)
    }
}
