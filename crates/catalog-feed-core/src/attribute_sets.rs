use std::collections::HashMap;

use crate::error::Result;

/// Attribute carrying the numeric attribute set of a product.
pub const ATTRIBUTE_SET_ID: &str = "attribute_set_id";
/// Attribute added to exported products when their attribute set name is known.
pub const ATTRIBUTE_SET_NAME: &str = "attribute_set_name";

/// Supplies the attribute set names of the catalog.
pub trait AttributeSetRepository {
    fn attribute_sets(&self) -> Result<Vec<(i64, String)>>;
}

/// Attribute set names loaded once per export run and shared by reference with the
/// product writer. Dropped with the run, so nothing leaks into the next one.
#[derive(Debug, Clone, Default)]
pub struct AttributeSetNames {
    names: HashMap<i64, String>,
}

impl AttributeSetNames {
    pub fn load<R: AttributeSetRepository + ?Sized>(repository: &R) -> Result<Self> {
        Ok(Self::from_pairs(repository.attribute_sets()?))
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (i64, String)>) -> Self {
        Self {
            names: pairs.into_iter().collect(),
        }
    }

    pub fn name_of(&self, attribute_set_id: i64) -> Option<&str> {
        self.names.get(&attribute_set_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
