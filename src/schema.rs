use aws_sdk_dynamodb::types::{AttributeValue, ScalarAttributeType};
use serde::{Serialize, de::DeserializeOwned};
use serde_dynamo::{from_item, to_item};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use crate::error::Error;

/// The wire-level representation of an item: attribute name to attribute value
pub type AttributeMap = HashMap<String, AttributeValue>;

/// Sentinel index name identifying a table's primary index
pub const PRIMARY_INDEX: &str = "$PRIMARY_INDEX";

/// A single key attribute: its name and its declared scalar type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    name: String,
    attribute_type: ScalarAttributeType,
}

impl KeyAttribute {
    fn new(name: impl Into<String>, attribute_type: ScalarAttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
        }
    }

    /// Attribute name as stored in the table
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared scalar type of the attribute
    pub fn attribute_type(&self) -> &ScalarAttributeType {
        &self.attribute_type
    }
}

/// Key attributes of one secondary index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMetadata {
    partition_key: KeyAttribute,
    sort_key: Option<KeyAttribute>,
}

impl IndexMetadata {
    /// Partition key of the index
    pub fn partition_key(&self) -> &KeyAttribute {
        &self.partition_key
    }

    /// Optional sort key of the index
    pub fn sort_key(&self) -> Option<&KeyAttribute> {
        self.sort_key.as_ref()
    }
}

/// Immutable key layout of a table: primary key plus named secondary indexes
///
/// Derived once per schema and shared by every operation touching the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMetadata {
    table_name: String,
    primary: IndexMetadata,
    indexes: HashMap<String, IndexMetadata>,
}

impl TableMetadata {
    /// Start declaring the key layout of a table
    pub fn builder(table_name: impl Into<String>) -> TableMetadataBuilder {
        TableMetadataBuilder {
            table_name: table_name.into(),
            partition_key: None,
            sort_key: None,
            indexes: HashMap::new(),
        }
    }

    /// Name of the physical table
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Primary partition key
    pub fn partition_key(&self) -> &KeyAttribute {
        &self.primary.partition_key
    }

    /// Primary sort key, if the table has one
    pub fn sort_key(&self) -> Option<&KeyAttribute> {
        self.primary.sort_key.as_ref()
    }

    /// Key attributes of the given index
    ///
    /// [`PRIMARY_INDEX`] resolves to the primary key; any other name must be
    /// a declared secondary index.
    pub fn index(&self, index_name: &str) -> Result<&IndexMetadata, Error> {
        if index_name == PRIMARY_INDEX {
            return Ok(&self.primary);
        }
        self.indexes.get(index_name).ok_or_else(|| Error::UnknownIndex {
            index: index_name.to_string(),
        })
    }

    /// Names of the primary key attributes
    pub fn primary_key_names(&self) -> Vec<&str> {
        let mut names = vec![self.primary.partition_key.name()];
        if let Some(sort) = &self.primary.sort_key {
            names.push(sort.name());
        }
        names
    }

    /// Names of the key attributes required to resume iteration on an index:
    /// the union of the primary key and the index key
    pub fn index_key_names(&self, index_name: &str) -> Result<Vec<&str>, Error> {
        let mut names = self.primary_key_names();
        let index = self.index(index_name)?;
        for name in [Some(index.partition_key.name()), index.sort_key().map(KeyAttribute::name)]
            .into_iter()
            .flatten()
        {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Build an exclusive-start-key for resuming a query or scan on an index
    ///
    /// DynamoDB requires the start key of an index query to carry every key
    /// attribute of both the primary index and the queried index. Fails with
    /// [`Error::MissingKeyAttribute`] when the item lacks one of them.
    pub fn index_start_key(
        &self,
        item: &AttributeMap,
        index_name: &str,
    ) -> Result<AttributeMap, Error> {
        let mut key = AttributeMap::new();
        for name in self.index_key_names(index_name)? {
            let value = item.get(name).ok_or_else(|| Error::MissingKeyAttribute {
                attribute: name.to_string(),
            })?;
            let _ = key.insert(name.to_string(), value.clone());
        }
        Ok(key)
    }
}

/// Builder for [`TableMetadata`]
#[derive(Debug)]
pub struct TableMetadataBuilder {
    table_name: String,
    partition_key: Option<KeyAttribute>,
    sort_key: Option<KeyAttribute>,
    indexes: HashMap<String, IndexMetadata>,
}

impl TableMetadataBuilder {
    /// Declare the primary partition key
    pub fn partition_key(
        mut self,
        name: impl Into<String>,
        attribute_type: ScalarAttributeType,
    ) -> Self {
        self.partition_key = Some(KeyAttribute::new(name, attribute_type));
        self
    }

    /// Declare the primary sort key
    pub fn sort_key(
        mut self,
        name: impl Into<String>,
        attribute_type: ScalarAttributeType,
    ) -> Self {
        self.sort_key = Some(KeyAttribute::new(name, attribute_type));
        self
    }

    /// Declare a named secondary index by its partition key and optional
    /// sort key
    pub fn secondary_index(
        mut self,
        index_name: impl Into<String>,
        partition_key: (&str, ScalarAttributeType),
        sort_key: Option<(&str, ScalarAttributeType)>,
    ) -> Self {
        let _ = self.indexes.insert(
            index_name.into(),
            IndexMetadata {
                partition_key: KeyAttribute::new(partition_key.0, partition_key.1),
                sort_key: sort_key.map(|(name, ty)| KeyAttribute::new(name, ty)),
            },
        );
        self
    }

    /// Finish the declaration
    ///
    /// Fails with [`Error::UndefinedPartitionKey`] when no partition key was
    /// declared.
    pub fn build(self) -> Result<TableMetadata, Error> {
        let partition_key = self.partition_key.ok_or(Error::UndefinedPartitionKey {
            table: self.table_name.clone(),
        })?;
        Ok(TableMetadata {
            table_name: self.table_name,
            primary: IndexMetadata {
                partition_key,
                sort_key: self.sort_key,
            },
            indexes: self.indexes,
        })
    }
}

/// Which attributes [`TableSchema::item_to_map`] should emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection<'a> {
    /// Every attribute of the item
    All,
    /// Exactly the primary-key attributes and nothing else
    KeysOnly,
    /// Exactly the named attributes
    Named(&'a [&'a str]),
}

/// Bidirectional mapping between a typed item and its attribute map
///
/// The mapping layer never retains items; conversion happens once per
/// operation at the request/response boundary.
pub trait TableSchema: Send + Sync {
    /// The application-level item type
    type Item;

    /// Convert a typed item into its attribute map
    fn item_to_map(&self, item: &Self::Item, projection: Projection<'_>)
    -> Result<AttributeMap, Error>;

    /// Convert an attribute map back into a typed item
    ///
    /// An absent or empty map yields `Ok(None)`, modelling "item not found";
    /// it is never an error.
    fn map_to_item(&self, map: Option<AttributeMap>) -> Result<Option<Self::Item>, Error>;

    /// Key layout of the table backing this schema
    fn metadata(&self) -> &TableMetadata;
}

/// The standard serde-backed [`TableSchema`] implementation
///
/// Items are any `Serialize + DeserializeOwned` type; conversion goes through
/// `serde_dynamo`, key layout comes from a [`TableMetadata`] declaration.
pub struct ItemSchema<T> {
    metadata: TableMetadata,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ItemSchema<T> {
    /// Create a schema from a table's key layout
    pub fn new(metadata: TableMetadata) -> Self {
        Self {
            metadata,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ItemSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemSchema")
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl<T> TableSchema for ItemSchema<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    type Item = T;

    fn item_to_map(
        &self,
        item: &Self::Item,
        projection: Projection<'_>,
    ) -> Result<AttributeMap, Error> {
        let mut map: AttributeMap = to_item(item)?;
        match projection {
            Projection::All => Ok(map),
            Projection::KeysOnly => {
                let names = self.metadata.primary_key_names();
                let mut key = AttributeMap::new();
                for name in names {
                    let value = map.remove(name).ok_or_else(|| Error::MissingKeyAttribute {
                        attribute: name.to_string(),
                    })?;
                    let _ = key.insert(name.to_string(), value);
                }
                Ok(key)
            }
            Projection::Named(names) => {
                map.retain(|name, _| names.contains(&name.as_str()));
                Ok(map)
            }
        }
    }

    fn map_to_item(&self, map: Option<AttributeMap>) -> Result<Option<Self::Item>, Error> {
        match map {
            None => Ok(None),
            Some(map) if map.is_empty() => Ok(None),
            Some(map) => Ok(Some(from_item(map)?)),
        }
    }

    fn metadata(&self) -> &TableMetadata {
        &self.metadata
    }
}
