pub mod categories;
pub mod products;

pub use categories::{CategoryDecision, CategoryPass, CategoryPassStats, CategoryRow, CategoryWriter};
pub use products::{EntityAssembler, ProductPassStats, ProductWriter};

use crate::error::Result;
use crate::identifiers::encode;

/// Id of the catalog root shared by every channel.
pub const ROOT_CATEGORY_ID: u64 = 1;
pub const ROOT_CATEGORY_NAME: &str = "Root";

/// External id of a referenced category. The shared root is referenced unscoped.
pub(crate) fn category_reference(channel_id: u32, category_id: u64) -> Result<String> {
    if category_id == ROOT_CATEGORY_ID {
        return Ok(ROOT_CATEGORY_ID.to_string());
    }
    encode(channel_id, category_id)
}
