use std::collections::BTreeSet;

use serde::Serialize;

use crate::attributes::{AttributeLookup, AttributeSet, AttributeValue, ExportPair};
use crate::config::ChannelContext;
use crate::error::{ExportError, Result};
use crate::identifiers::encode;
use crate::source::RawRow;

pub const STATUS_ENABLED: i64 = 1;
pub const STATUS_DISABLED: i64 = 2;

pub const VISIBILITY_NOT_VISIBLE: i64 = 1;
pub const VISIBILITY_IN_CATALOG: i64 = 2;
pub const VISIBILITY_IN_SEARCH: i64 = 3;
pub const VISIBILITY_BOTH: i64 = 4;

/// Visibility codes that make an entity reachable in the storefront.
pub const VISIBLE_IN_SITE: [i64; 3] = [VISIBILITY_IN_CATALOG, VISIBILITY_IN_SEARCH, VISIBILITY_BOTH];

pub const TYPE_SIMPLE: &str = "simple";

pub const FIELD_ENTITY_ID: &str = "entity_id";
pub const FIELD_TYPE_ID: &str = "type_id";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_VISIBILITY: &str = "visibility";
pub const FIELD_NAME: &str = "name";
pub const FIELD_PRICE: &str = "price";

/// Quantity and availability of an entity on the channel's stock.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct StockItem {
    pub qty: f64,
    pub is_in_stock: bool,
}

impl StockItem {
    pub fn new(qty: f64, is_in_stock: bool) -> Self {
        Self { qty, is_in_stock }
    }
}

/// One entity projected onto one channel, built from its raw rows.
#[derive(Debug, Clone)]
pub struct ExportEntity<'a> {
    context: &'a ChannelContext,
    id: u64,
    status: i64,
    visibility: i64,
    name: String,
    price: f64,
    type_id: String,
    group_code: u64,
    categories: Vec<u64>,
    linked_channel_ids: BTreeSet<u32>,
    stock: Option<StockItem>,
    attributes: AttributeSet,
}

impl<'a> ExportEntity<'a> {
    pub fn new(context: &'a ChannelContext, id: u64) -> Self {
        Self {
            context,
            id,
            status: STATUS_DISABLED,
            visibility: VISIBILITY_NOT_VISIBLE,
            name: String::new(),
            price: 0.0,
            type_id: String::new(),
            group_code: 0,
            categories: Vec::new(),
            linked_channel_ids: BTreeSet::new(),
            stock: None,
            attributes: AttributeSet::new(),
        }
    }

    /// Builds an entity from a raw row. The row must carry `entity_id`.
    pub fn from_row(context: &'a ChannelContext, row: &RawRow) -> Result<Self> {
        let id = parse_entity_id(row)?;
        let mut entity = Self::new(context, id);
        entity.set_from_row(row)?;
        Ok(entity)
    }

    /// Applies every field of `row`: reserved fields update the scalar and are mirrored
    /// into the attributes, everything else is aggregated as an attribute.
    pub fn set_from_row(&mut self, row: &RawRow) -> Result<()> {
        for (key, value) in row.iter() {
            match key {
                FIELD_ENTITY_ID => {
                    let id = parse_u64(FIELD_ENTITY_ID, value)?;
                    if id != self.id {
                        return Err(ExportError::MalformedRow {
                            field: FIELD_ENTITY_ID.to_string(),
                            reason: format!("changed from {} to {id} within one entity", self.id),
                        });
                    }
                }
                FIELD_TYPE_ID => {
                    let type_id = value.to_string();
                    self.set_type_id(&type_id);
                    self.add_attribute(key, AttributeValue::Text(type_id))?;
                }
                FIELD_STATUS => {
                    let status = parse_i64(key, value)?;
                    self.set_status(status);
                    self.add_attribute(key, AttributeValue::Integer(status))?;
                }
                FIELD_VISIBILITY => {
                    let visibility = parse_i64(key, value)?;
                    self.set_visibility(visibility);
                    self.add_attribute(key, AttributeValue::Integer(visibility))?;
                }
                FIELD_NAME => {
                    let name = value.to_string();
                    self.set_name(&name);
                    self.add_attribute(key, AttributeValue::Text(name))?;
                }
                FIELD_PRICE => {
                    let price = value
                        .as_f64()
                        .ok_or_else(|| ExportError::invalid_field(key, value))?;
                    self.set_price(price);
                    self.add_attribute(key, AttributeValue::Float(price))?;
                }
                _ => self.add_attribute(key, value.clone())?,
            }
        }
        Ok(())
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn context(&self) -> &'a ChannelContext {
        self.context
    }

    pub fn channel_id(&self) -> u32 {
        self.context.channel_id()
    }

    pub fn status(&self) -> i64 {
        self.status
    }

    pub fn set_status(&mut self, status: i64) {
        self.status = status;
    }

    pub fn visibility(&self) -> i64 {
        self.visibility
    }

    pub fn set_visibility(&mut self, visibility: i64) {
        self.visibility = visibility;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn set_price(&mut self, price: f64) {
        self.price = price;
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn set_type_id(&mut self, type_id: &str) {
        self.type_id = type_id.to_string();
    }

    pub fn set_group_code(&mut self, group_code: u64) {
        self.group_code = group_code;
    }

    /// Channel-scoped group code; an unset group code groups the entity on its own id.
    pub fn group_code(&self) -> Result<String> {
        let code = if self.group_code != 0 {
            self.group_code
        } else {
            self.id
        };
        encode(self.channel_id(), code)
    }

    pub fn add_category_id(&mut self, category_id: u64) {
        self.categories.push(category_id);
    }

    pub fn categories(&self) -> &[u64] {
        &self.categories
    }

    pub fn add_linked_channel_id(&mut self, channel_id: u32) {
        self.linked_channel_ids.insert(channel_id);
    }

    pub fn linked_channel_ids(&self) -> &BTreeSet<u32> {
        &self.linked_channel_ids
    }

    pub fn stock_item(&self) -> Option<&StockItem> {
        self.stock.as_ref()
    }

    pub fn set_stock_item(&mut self, stock: StockItem) {
        self.stock = Some(stock);
    }

    pub fn stock_qty(&self) -> f64 {
        self.stock.map(|stock| stock.qty).unwrap_or(0.0)
    }

    pub fn add_attribute(&mut self, name: &str, value: AttributeValue) -> Result<()> {
        let is_date = self.context.is_date_attribute(name);
        self.attributes
            .add(name, value, self.context.date_field, is_date)
    }

    /// Strict lookup; fails with [`ExportError::MissingAttribute`] when `name` was never
    /// populated.
    pub fn get_attribute(&self, name: &str, as_array: bool) -> Result<AttributeLookup<'_>> {
        self.attributes.get(name, as_array)
    }

    pub fn attribute(&self, name: &str) -> Option<&[AttributeValue]> {
        self.attributes.get_optional(name)
    }

    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    pub fn export_attributes(&self) -> Vec<ExportPair> {
        self.attributes.export_pairs()
    }
}

pub(crate) fn parse_entity_id(row: &RawRow) -> Result<u64> {
    let value = row
        .get(FIELD_ENTITY_ID)
        .ok_or_else(|| ExportError::missing_field(FIELD_ENTITY_ID))?;
    parse_u64(FIELD_ENTITY_ID, value)
}

pub(crate) fn parse_u64(field: &str, value: &AttributeValue) -> Result<u64> {
    value
        .as_i64()
        .and_then(|v| u64::try_from(v).ok())
        .ok_or_else(|| ExportError::invalid_field(field, value))
}

pub(crate) fn parse_i64(field: &str, value: &AttributeValue) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| ExportError::invalid_field(field, value))
}
