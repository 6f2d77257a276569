use aws_sdk_dynamodb::types::AttributeValue;

use crate::error::Error;
use crate::schema::{AttributeMap, TableMetadata};

/// A primary or index key value: a partition value plus an optional sort value
///
/// A `Key` carries values only; attribute names are resolved against a
/// [`TableMetadata`] when the key is turned into its wire representation.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    partition_value: AttributeValue,
    sort_value: Option<AttributeValue>,
}

impl Key {
    /// Key with a partition value only
    pub fn new(partition_value: AttributeValue) -> Self {
        Self {
            partition_value,
            sort_value: None,
        }
    }

    /// Attach a sort value to the key
    pub fn with_sort_value(mut self, sort_value: AttributeValue) -> Self {
        self.sort_value = Some(sort_value);
        self
    }

    /// The partition value
    pub fn partition_value(&self) -> &AttributeValue {
        &self.partition_value
    }

    /// The sort value, if present
    pub fn sort_value(&self) -> Option<&AttributeValue> {
        self.sort_value.as_ref()
    }

    /// Resolve the key into its wire attribute map against the given index
    ///
    /// The sort value is emitted only when the index declares a sort key; a
    /// sort value supplied against a sort-key-less index fails with
    /// [`Error::NoIndexSortKey`].
    pub fn key_map(
        &self,
        metadata: &TableMetadata,
        index_name: &str,
    ) -> Result<AttributeMap, Error> {
        let index = metadata.index(index_name)?;
        let mut map = AttributeMap::new();
        let _ = map.insert(
            index.partition_key().name().to_string(),
            self.partition_value.clone(),
        );

        if let Some(sort_value) = &self.sort_value {
            let sort_key = index.sort_key().ok_or_else(|| Error::NoIndexSortKey {
                index: index_name.to_string(),
            })?;
            let _ = map.insert(sort_key.name().to_string(), sort_value.clone());
        }

        Ok(map)
    }
}
